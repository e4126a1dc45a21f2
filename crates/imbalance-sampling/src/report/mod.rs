//! Before/after summaries of a resampling run.
use std::collections::BTreeMap;
use std::time::Duration;

use serde::Serialize;

use crate::data_handling::{Dataset, Label};

/// Class counts and sizes of one dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassBalance {
    pub n_samples: usize,
    pub counts: BTreeMap<Label, usize>,
    pub imbalance_ratio: f64,
}

impl ClassBalance {
    pub fn of(data: &Dataset) -> Self {
        let partition = data.class_partition();
        ClassBalance {
            n_samples: data.n_samples(),
            counts: partition.iter().collect(),
            imbalance_ratio: partition.imbalance_ratio(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResampleSummary {
    pub algorithm: String,
    pub before: ClassBalance,
    pub after: ClassBalance,
    pub elapsed_ms: u128,
}

impl ResampleSummary {
    pub fn new(algorithm: &str, before: &Dataset, after: &Dataset, elapsed: Duration) -> Self {
        ResampleSummary {
            algorithm: algorithm.to_string(),
            before: ClassBalance::of(before),
            after: ClassBalance::of(after),
            elapsed_ms: elapsed.as_millis(),
        }
    }

    /// Fraction of input rows absent from the output; negative when the output is larger.
    pub fn reduction(&self) -> f64 {
        if self.before.n_samples == 0 {
            return 0.0;
        }
        1.0 - self.after.n_samples as f64 / self.before.n_samples as f64
    }

    pub fn log(&self) {
        log::info!("----- {} Resampling Summary -----", self.algorithm);
        log::info!(
            "instances: {} -> {} ({:.1}% reduction)",
            self.before.n_samples,
            self.after.n_samples,
            self.reduction() * 100.0
        );
        for (label, before) in &self.before.counts {
            let after = self.after.counts.get(label).copied().unwrap_or(0);
            log::info!("class {}: {} -> {}", label, before, after);
        }
        log::info!(
            "imbalance ratio: {:.3} -> {:.3}",
            self.before.imbalance_ratio,
            self.after.imbalance_ratio
        );
        log::info!("elapsed: {} ms", self.elapsed_ms);
        log::info!("---------------------------------");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_summary_counts() {
        let before = Dataset::continuous(array![[0.0], [1.0], [2.0], [3.0]], vec![0, 0, 0, 1]).unwrap();
        let after = before.select(&[2, 3]);
        let summary = ResampleSummary::new("ENN", &before, &after, Duration::from_millis(5));
        assert_eq!(summary.before.counts.get(&0), Some(&3));
        assert_eq!(summary.after.counts.get(&0), Some(&1));
        assert!((summary.reduction() - 0.5).abs() < 1e-12);
        summary.log();
    }
}
