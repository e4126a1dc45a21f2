//! Distance engine: Euclidean and HVDM-style heterogeneous distances.
//!
//! The heterogeneous metric needs per-attribute statistics. They are gathered
//! once into a `DistanceContext` and shared read-only by every query.
use std::collections::HashMap;

use statrs::statistics::Statistics;

use crate::config::{DistanceMetric, NominalWeighting};
use crate::data_handling::{Dataset, Label};

/// Plain Euclidean distance. Both slices must have the same length.
pub fn euclidean(a: &[f64], b: &[f64]) -> f64 {
    debug_assert_eq!(a.len(), b.len(), "euclidean: vectors of unequal length");
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}

/// Sum of absolute differences.
pub fn manhattan(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y).abs()).sum()
}

/// Per-class occurrence counts of one nominal value.
#[derive(Debug, Clone, Default)]
struct ValueCounts {
    total: usize,
    by_class: HashMap<Label, usize>,
}

/// Precomputed statistics backing the heterogeneous metric.
#[derive(Debug, Clone)]
pub struct DistanceContext {
    metric: DistanceMetric,
    weighting: NominalWeighting,
    nominal: Vec<bool>,
    std_dev: Vec<f64>,
    /// attribute → value bits → class counts; empty for continuous attributes.
    value_counts: Vec<HashMap<u64, ValueCounts>>,
    labels: Vec<Label>,
}

impl DistanceContext {
    pub fn from_dataset(data: &Dataset, metric: DistanceMetric, weighting: NominalWeighting) -> Self {
        let n_features = data.n_features();
        let mut std_dev = vec![0.0; n_features];
        let mut value_counts = vec![HashMap::new(); n_features];

        for j in 0..n_features {
            let column = data.x.column(j);
            if data.nominal[j] {
                let table: &mut HashMap<u64, ValueCounts> = &mut value_counts[j];
                for (&v, &label) in column.iter().zip(data.y.iter()) {
                    let entry = table.entry(v.to_bits()).or_default();
                    entry.total += 1;
                    *entry.by_class.entry(label).or_insert(0) += 1;
                }
            } else if column.len() > 1 {
                let sd = column.iter().population_std_dev();
                std_dev[j] = if sd.is_finite() { sd } else { 0.0 };
            }
        }

        DistanceContext {
            metric,
            weighting,
            nominal: data.nominal.clone(),
            std_dev,
            value_counts,
            labels: data.class_partition().labels(),
        }
    }

    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    pub fn std_dev(&self) -> &[f64] {
        &self.std_dev
    }

    pub fn distance(&self, a: &[f64], b: &[f64]) -> f64 {
        match self.metric {
            DistanceMetric::Euclidean => euclidean(a, b),
            DistanceMetric::Heterogeneous => self.heterogeneous(a, b),
        }
    }

    fn heterogeneous(&self, a: &[f64], b: &[f64]) -> f64 {
        debug_assert_eq!(a.len(), b.len(), "heterogeneous: vectors of unequal length");
        let mut sum = 0.0;
        for j in 0..a.len() {
            let d = if self.nominal[j] {
                self.nominal_term(j, a[j], b[j])
            } else if self.std_dev[j] > 0.0 {
                (a[j] - b[j]).abs() / (4.0 * self.std_dev[j])
            } else {
                0.0
            };
            sum += d * d;
        }
        sum.sqrt()
    }

    fn nominal_term(&self, attr: usize, a: f64, b: f64) -> f64 {
        if a.to_bits() == b.to_bits() {
            return 0.0;
        }
        match self.weighting {
            NominalWeighting::Overlap => 1.0,
            NominalWeighting::ValueDifference => {
                let table = &self.value_counts[attr];
                match (table.get(&a.to_bits()), table.get(&b.to_bits())) {
                    (Some(ca), Some(cb)) => {
                        let diff: f64 = self
                            .labels
                            .iter()
                            .map(|label| {
                                let pa = ca.by_class.get(label).copied().unwrap_or(0) as f64
                                    / ca.total as f64;
                                let pb = cb.by_class.get(label).copied().unwrap_or(0) as f64
                                    / cb.total as f64;
                                (pa - pb).abs()
                            })
                            .sum();
                        diff.min(1.0)
                    }
                    _ => 1.0,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn mixed() -> Dataset {
        Dataset::new(
            array![[0.0, 1.0], [2.0, 0.0], [4.0, 1.0], [6.0, 2.0]],
            vec![0, 0, 1, 1],
            vec![false, true],
        )
        .unwrap()
    }

    #[test]
    fn test_euclidean() {
        assert!((euclidean(&[0.0, 0.0], &[3.0, 4.0]) - 5.0).abs() < 1e-12);
        assert_eq!(manhattan(&[0.0, 0.0], &[3.0, -4.0]), 7.0);
    }

    #[test]
    fn test_heterogeneous_combines_scaled_and_nominal_terms() {
        let ctx = DistanceContext::from_dataset(
            &mixed(),
            DistanceMetric::Heterogeneous,
            NominalWeighting::Overlap,
        );
        let sd = ctx.std_dev()[0];
        assert!((sd - 5.0f64.sqrt()).abs() < 1e-9);

        let d = ctx.distance(&[0.0, 1.0], &[2.0, 0.0]);
        let numeric = 2.0 / (4.0 * sd);
        assert!((d - (numeric * numeric + 1.0).sqrt()).abs() < 1e-12);
        assert_eq!(ctx.distance(&[2.0, 1.0], &[2.0, 1.0]), 0.0);
    }

    #[test]
    fn test_zero_std_attribute_contributes_nothing() {
        let data = Dataset::continuous(array![[1.0, 0.0], [1.0, 3.0]], vec![0, 1]).unwrap();
        let ctx = DistanceContext::from_dataset(
            &data,
            DistanceMetric::Heterogeneous,
            NominalWeighting::Overlap,
        );
        assert_eq!(ctx.distance(&[1.0, 0.0], &[5.0, 0.0]), 0.0);
    }

    #[test]
    fn test_value_difference_weighting() {
        let ctx = DistanceContext::from_dataset(
            &mixed(),
            DistanceMetric::Heterogeneous,
            NominalWeighting::ValueDifference,
        );
        // value 0 is only class 0, value 2 only class 1: |1-0| + |0-1| clamps to 1
        assert!((ctx.distance(&[0.0, 0.0], &[0.0, 2.0]) - 1.0).abs() < 1e-12);
        // value 1 is half/half, value 0 all class 0: 0.5 + 0.5
        assert!((ctx.distance(&[0.0, 1.0], &[0.0, 0.0]) - 1.0).abs() < 1e-12);
    }
}
