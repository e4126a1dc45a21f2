//! Data structures for labelled datasets and their class composition.
//!
//! `Dataset` owns a feature matrix, a label per row and a side table marking
//! nominal attributes. Algorithms never mutate their input; every selection
//! returns a new `Dataset`. `ClassPartition` is the derived label → count
//! mapping that defines the untouchable (minority) class.
use std::collections::BTreeMap;

use ndarray::{Array2, ArrayView1, Axis};
use rand::seq::SliceRandom;
use rand::Rng;

use crate::error::{ResampleError, Result};

/// Class label. Loaders encode string labels to these integer codes.
pub type Label = i32;

#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub x: Array2<f64>,
    pub y: Vec<Label>,
    /// `nominal[j]` is true when attribute `j` is categorical.
    pub nominal: Vec<bool>,
}

impl Dataset {
    pub fn new(x: Array2<f64>, y: Vec<Label>, nominal: Vec<bool>) -> Result<Self> {
        if x.nrows() != y.len() {
            return Err(ResampleError::DegenerateInput(format!(
                "feature matrix has {} rows but {} labels were given",
                x.nrows(),
                y.len()
            )));
        }
        if x.ncols() != nominal.len() {
            return Err(ResampleError::DegenerateInput(format!(
                "feature matrix has {} columns but the nominal table has {} entries",
                x.ncols(),
                nominal.len()
            )));
        }
        Ok(Dataset { x, y, nominal })
    }

    /// Dataset whose attributes are all continuous.
    pub fn continuous(x: Array2<f64>, y: Vec<Label>) -> Result<Self> {
        let n_features = x.ncols();
        Dataset::new(x, y, vec![false; n_features])
    }

    /// Build from row vectors. Fails when rows disagree in length.
    pub fn from_rows(rows: &[Vec<f64>], y: Vec<Label>, nominal: Vec<bool>) -> Result<Self> {
        let n_features = nominal.len();
        if let Some(bad) = rows.iter().find(|r| r.len() != n_features) {
            return Err(ResampleError::DegenerateInput(format!(
                "row of length {} in a dataset with {} attributes",
                bad.len(),
                n_features
            )));
        }
        let x = Array2::from_shape_vec(
            (rows.len(), n_features),
            rows.iter().flatten().copied().collect(),
        )?;
        Dataset::new(x, y, nominal)
    }

    pub fn n_samples(&self) -> usize {
        self.x.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.x.ncols()
    }

    pub fn is_empty(&self) -> bool {
        self.y.is_empty()
    }

    pub fn row(&self, i: usize) -> ArrayView1<'_, f64> {
        self.x.row(i)
    }

    pub fn row_vec(&self, i: usize) -> Vec<f64> {
        self.x.row(i).to_vec()
    }

    pub fn class_partition(&self) -> ClassPartition {
        ClassPartition::from_labels(&self.y)
    }

    /// Indices of the rows carrying `label`, in row order.
    pub fn indices_of(&self, label: Label) -> Vec<usize> {
        self.y
            .iter()
            .enumerate()
            .filter_map(|(i, &l)| if l == label { Some(i) } else { None })
            .collect()
    }

    /// New dataset holding the given rows in the given order.
    pub fn select(&self, indices: &[usize]) -> Dataset {
        Dataset {
            x: self.x.select(Axis(0), indices),
            y: indices.iter().map(|&i| self.y[i]).collect(),
            nominal: self.nominal.clone(),
        }
    }

    /// Shuffled copy together with the permutation (new position → old index).
    pub fn shuffled<R: Rng + ?Sized>(&self, rng: &mut R) -> (Dataset, Vec<usize>) {
        let mut order: Vec<usize> = (0..self.n_samples()).collect();
        order.shuffle(rng);
        (self.select(&order), order)
    }

    pub fn log_input_data_summary(&self) {
        let partition = self.class_partition();
        log::info!("----- Input Data Summary -----");
        log::info!(
            "{} instances, {} attributes ({} nominal)",
            self.n_samples(),
            self.n_features(),
            self.nominal.iter().filter(|&&n| n).count()
        );
        for (label, count) in partition.iter() {
            log::info!("class {}: {} instances", label, count);
        }
        log::info!("imbalance ratio: {:.3}", partition.imbalance_ratio());
        log::info!("-------------------------------");
    }
}

/// Label → count mapping, ordered by label.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ClassPartition {
    counts: BTreeMap<Label, usize>,
}

impl ClassPartition {
    pub fn from_labels(labels: &[Label]) -> Self {
        let mut counts = BTreeMap::new();
        for &label in labels {
            *counts.entry(label).or_insert(0) += 1;
        }
        ClassPartition { counts }
    }

    pub fn count(&self, label: Label) -> usize {
        self.counts.get(&label).copied().unwrap_or(0)
    }

    pub fn n_classes(&self) -> usize {
        self.counts.len()
    }

    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    /// Labels in ascending order.
    pub fn labels(&self) -> Vec<Label> {
        self.counts.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Label, usize)> + '_ {
        self.counts.iter().map(|(&l, &c)| (l, c))
    }

    /// The label with the fewest instances; ties go to the smallest label.
    pub fn untouchable(&self) -> Option<Label> {
        self.counts
            .iter()
            .min_by(|a, b| a.1.cmp(b.1).then(a.0.cmp(b.0)))
            .map(|(&label, _)| label)
    }

    /// Every label except the untouchable one.
    pub fn majority_labels(&self) -> Vec<Label> {
        let untouchable = self.untouchable();
        self.counts
            .keys()
            .copied()
            .filter(|&l| Some(l) != untouchable)
            .collect()
    }

    /// Largest class count divided by the smallest; 0 for an empty partition.
    pub fn imbalance_ratio(&self) -> f64 {
        let max = self.counts.values().copied().max().unwrap_or(0);
        let min = self.counts.values().copied().min().unwrap_or(0);
        if min == 0 {
            0.0
        } else {
            max as f64 / min as f64
        }
    }
}
