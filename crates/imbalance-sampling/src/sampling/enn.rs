//! Edited Nearest Neighbour undersampling.
//!
//! A majority instance survives only when the k-NN rule over the majority
//! pool (the untouchable class excluded) predicts its own label. Minority
//! instances are always kept.
use rayon::prelude::*;

use crate::config::{EnnConfig, SamplerConfig};
use crate::data_handling::{Dataset, Label};
use crate::distance::DistanceContext;
use crate::error::Result;
use crate::neighbours::{classify, NeighbourPool};
use crate::sampling::{check_positive, prepare, Resampled, Resampler};
use crate::spatial::QueryMode;

pub struct EditedNearestNeighbours {
    config: EnnConfig,
}

impl EditedNearestNeighbours {
    pub fn new(config: EnnConfig) -> Self {
        EditedNearestNeighbours { config }
    }
}

/// Working rows of the majority classes whose k-NN prediction disagrees with their label.
pub(crate) fn enn_removals(
    working: &Dataset,
    context: &DistanceContext,
    k: usize,
    untouchable: Label,
) -> Result<Vec<usize>> {
    let majority: Vec<usize> = (0..working.n_samples())
        .filter(|&i| working.y[i] != untouchable)
        .collect();
    if majority.len() < 2 {
        // a lone majority row has no neighbour to vote on it
        log::debug!("ENN: majority pool of {} rows, nothing to edit", majority.len());
        return Ok(Vec::new());
    }
    let pool = NeighbourPool::new(working, majority.clone(), context)?;

    let verdicts: Vec<Option<usize>> = majority
        .par_iter()
        .map(|&i| {
            let row = working.row_vec(i);
            let predicted = classify(&pool, &row, k, QueryMode::Nearest, Some(i))?;
            Ok(if predicted.label == working.y[i] { None } else { Some(i) })
        })
        .collect::<Result<Vec<_>>>()?;

    let removed: Vec<usize> = verdicts.into_iter().flatten().collect();
    log::debug!(
        "ENN: {} of {} majority instances disagree with their neighbourhood",
        removed.len(),
        majority.len()
    );
    Ok(removed)
}

impl Resampler for EditedNearestNeighbours {
    fn name(&self) -> &str {
        "ENN"
    }

    fn common(&self) -> &SamplerConfig {
        &self.config.common
    }

    fn resample(&self, data: &Dataset) -> Result<Resampled> {
        check_positive("k", self.config.k)?;
        let prepared = prepare(data, &self.config.common)?;
        let context = DistanceContext::from_dataset(
            &prepared.working,
            self.config.common.distance,
            self.config.common.nominal_weighting,
        );

        let removed = enn_removals(&prepared.working, &context, self.config.k, prepared.untouchable)?;
        let mut keep = vec![true; prepared.working.n_samples()];
        for i in removed {
            keep[i] = false;
        }
        let kept: Vec<usize> = (0..keep.len()).filter(|&i| keep[i]).collect();
        Ok(prepared.select_original(data, &kept))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_enn_drops_majority_points_inside_another_majority_class() {
        // class 2 point sitting among class 0 points gets removed
        let data = Dataset::continuous(
            array![
                [0.0, 0.0],
                [0.1, 0.0],
                [0.0, 0.1],
                [0.05, 0.05],
                [5.0, 5.0],
                [5.1, 5.0],
                [5.0, 5.1],
                [0.02, 0.02],
                [9.0, 0.0],
            ],
            vec![0, 0, 0, 0, 2, 2, 2, 2, 1],
        )
        .unwrap();
        let enn = EditedNearestNeighbours::new(EnnConfig {
            common: SamplerConfig::default().with_seed(1),
            k: 3,
        });
        let result = enn.fit_resample(&data).unwrap();
        assert_eq!(result.indices, Some(vec![0, 1, 2, 3, 4, 5, 6, 8]));
    }

    #[test]
    fn test_enn_keeps_a_lone_majority_row() {
        let data = Dataset::continuous(array![[0.0, 0.0], [1.0, 1.0]], vec![0, 1]).unwrap();
        let enn = EditedNearestNeighbours::new(EnnConfig {
            common: SamplerConfig::default().with_seed(1),
            k: 3,
        });
        let result = enn.fit_resample(&data).unwrap();
        assert_eq!(result.indices, Some(vec![0, 1]));
        assert_eq!(result.dataset, data);
    }

    #[test]
    fn test_enn_rejects_zero_k() {
        let data = Dataset::continuous(array![[0.0], [1.0]], vec![0, 1]).unwrap();
        let enn = EditedNearestNeighbours::new(EnnConfig {
            common: SamplerConfig::default().with_seed(1),
            k: 0,
        });
        assert!(enn.fit_resample(&data).unwrap_err().is_invalid_parameter());
    }
}
