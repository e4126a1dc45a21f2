//! Neighbourhood Cleaning Rule.
//!
//! Removes the union of two sets of majority instances:
//! * A1, the instances an ENN pass would edit out (only with 3 or more classes);
//! * A2, the neighbours of misclassified minority instances that belong to a
//!   class holding more than `threshold * n_samples` instances.
use std::collections::BTreeSet;

use rayon::prelude::*;

use crate::config::{NclConfig, SamplerConfig};
use crate::data_handling::Dataset;
use crate::distance::DistanceContext;
use crate::error::Result;
use crate::neighbours::{classify, NeighbourPool};
use crate::sampling::enn::enn_removals;
use crate::sampling::{check_non_negative, check_positive, prepare, Resampled, Resampler};
use crate::spatial::QueryMode;

pub struct NeighbourhoodCleaningRule {
    config: NclConfig,
}

impl NeighbourhoodCleaningRule {
    pub fn new(config: NclConfig) -> Self {
        NeighbourhoodCleaningRule { config }
    }
}

impl Resampler for NeighbourhoodCleaningRule {
    fn name(&self) -> &str {
        "NCL"
    }

    fn common(&self) -> &SamplerConfig {
        &self.config.common
    }

    fn resample(&self, data: &Dataset) -> Result<Resampled> {
        check_positive("k", self.config.k)?;
        check_non_negative("threshold", self.config.threshold)?;

        let prepared = prepare(data, &self.config.common)?;
        let working = &prepared.working;
        let untouchable = prepared.untouchable;
        let context = DistanceContext::from_dataset(
            working,
            self.config.common.distance,
            self.config.common.nominal_weighting,
        );

        let a1: Vec<usize> = if prepared.partition.n_classes() >= 3 {
            enn_removals(working, &context, self.config.k, untouchable)?
        } else {
            Vec::new()
        };

        let min_class_size = working.n_samples() as f64 * self.config.threshold;
        let cleanable: BTreeSet<_> = prepared
            .partition
            .iter()
            .filter(|&(label, count)| label != untouchable && count as f64 > min_class_size)
            .map(|(label, _)| label)
            .collect();

        let pool = NeighbourPool::full(working, &context)?;
        let minority = prepared.ids_of(untouchable);
        let a2: Vec<Vec<usize>> = minority
            .par_iter()
            .map(|&i| {
                let verdict = classify(&pool, &working.row_vec(i), self.config.k, QueryMode::Nearest, Some(i))?;
                if verdict.label == working.y[i] {
                    return Ok(Vec::new());
                }
                Ok(verdict
                    .indices
                    .into_iter()
                    .filter(|&n| cleanable.contains(&working.y[n]))
                    .collect())
            })
            .collect::<Result<Vec<_>>>()?;

        let removed: BTreeSet<usize> = a1.iter().copied().chain(a2.into_iter().flatten()).collect();
        log::debug!(
            "NCL: removing {} instances ({} edited by ENN)",
            removed.len(),
            a1.len()
        );

        let kept: Vec<usize> = (0..working.n_samples())
            .filter(|i| !removed.contains(i))
            .collect();
        Ok(prepared.select_original(data, &kept))
    }
}
