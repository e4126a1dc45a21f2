//! Resampling algorithms and the preparation steps they share.
//!
//! Every algorithm follows the same shape: compute the class partition and the
//! untouchable class, optionally min-max scale and shuffle a working copy,
//! run its rule on the working copy, then map the result back to the input.
use std::time::Instant;

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::config::SamplerConfig;
use crate::data_handling::{ClassPartition, Dataset, Label};
use crate::error::{ResampleError, Result};
use crate::preprocessing::{fit_transform, MinMaxScaler};
use crate::report::ResampleSummary;

pub mod enn;
pub mod ipade;
pub mod ncl;
pub mod near_miss;

pub use enn::EditedNearestNeighbours;
pub use ipade::Ipade;
pub use ncl::NeighbourhoodCleaningRule;
pub use near_miss::NearMiss;

/// Output of a resampling run.
#[derive(Debug, Clone, PartialEq)]
pub struct Resampled {
    pub dataset: Dataset,
    /// Input position of every output row; `None` when rows are synthesised.
    pub indices: Option<Vec<usize>>,
}

pub trait Resampler {
    fn name(&self) -> &str;

    fn common(&self) -> &SamplerConfig;

    /// Run the algorithm without reporting.
    fn resample(&self, data: &Dataset) -> Result<Resampled>;

    /// Run the algorithm, logging a before/after summary when `verbose` is set.
    fn fit_resample(&self, data: &Dataset) -> Result<Resampled> {
        let start = Instant::now();
        let result = self.resample(data)?;
        if self.common().verbose {
            ResampleSummary::new(self.name(), data, &result.dataset, start.elapsed()).log();
        }
        Ok(result)
    }
}

/// Working copy of the input plus everything needed to map results back.
pub(crate) struct Prepared {
    pub working: Dataset,
    /// `order[i]` is the input position of working row `i`.
    pub order: Vec<usize>,
    pub scaler: Option<MinMaxScaler>,
    pub partition: ClassPartition,
    pub untouchable: Label,
    pub rng: StdRng,
}

impl Prepared {
    /// Rows of `original` behind the given working rows, in input order.
    pub fn select_original(&self, original: &Dataset, working_ids: &[usize]) -> Resampled {
        let mut indices: Vec<usize> = working_ids.iter().map(|&i| self.order[i]).collect();
        indices.sort_unstable();
        indices.dedup();
        Resampled {
            dataset: original.select(&indices),
            indices: Some(indices),
        }
    }

    /// Working rows of `label`.
    pub fn ids_of(&self, label: Label) -> Vec<usize> {
        self.working.indices_of(label)
    }

    /// Working rows of every label except the untouchable one.
    pub fn majority_ids(&self) -> Vec<usize> {
        self.working
            .y
            .iter()
            .enumerate()
            .filter_map(|(i, &l)| if l != self.untouchable { Some(i) } else { None })
            .collect()
    }
}

/// Validate the input and build the working copy for one run.
pub(crate) fn prepare(data: &Dataset, common: &SamplerConfig) -> Result<Prepared> {
    let partition = data.class_partition();
    if partition.n_classes() < 2 {
        return Err(ResampleError::DegenerateInput(format!(
            "at least 2 classes are required, found {}",
            partition.n_classes()
        )));
    }
    let untouchable = partition
        .untouchable()
        .ok_or_else(|| ResampleError::DegenerateInput("empty dataset".to_string()))?;

    let seed = common.resolve_seed();
    log::info!("resampling run seeded with {}", seed);
    let mut rng = StdRng::seed_from_u64(seed);

    let (scaler, working) = if common.normalize {
        let (scaler, scaled) = fit_transform(data);
        (Some(scaler), scaled)
    } else {
        (None, data.clone())
    };

    let (working, order) = if common.randomize_order {
        working.shuffled(&mut rng)
    } else {
        let n = working.n_samples();
        (working, (0..n).collect())
    };

    Ok(Prepared {
        working,
        order,
        scaler,
        partition,
        untouchable,
        rng,
    })
}

pub(crate) fn check_positive(name: &'static str, value: usize) -> Result<()> {
    if value == 0 {
        return Err(ResampleError::invalid(name, value, "must be a positive integer"));
    }
    Ok(())
}

pub(crate) fn check_non_negative(name: &'static str, value: f64) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(ResampleError::invalid(name, value, "must be a finite non-negative number"));
    }
    Ok(())
}
