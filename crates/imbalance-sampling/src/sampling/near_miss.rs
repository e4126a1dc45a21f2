//! Near-Miss undersampling.
//!
//! Majority instances are ranked by their distance to the untouchable class
//! and the best `floor(minority * ratio)` are kept next to every minority
//! instance.
use std::collections::HashSet;
use std::convert::TryFrom;

use rand::seq::SliceRandom;
use rayon::prelude::*;

use crate::config::{NearMissConfig, SamplerConfig};
use crate::data_handling::Dataset;
use crate::distance::DistanceContext;
use crate::error::{ResampleError, Result};
use crate::neighbours::NeighbourPool;
use crate::sampling::{check_non_negative, check_positive, prepare, Resampled, Resampler};
use crate::spatial::QueryMode;

/// Minority neighbours averaged by versions 1 and 2.
const AVERAGED_NEIGHBOURS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NearMissVersion {
    /// Smallest mean distance to the 3 nearest minority instances.
    NearestMinority,
    /// Smallest mean distance to the 3 farthest minority instances.
    FarthestMinority,
    /// Nearest majority neighbours of every minority instance.
    MinorityNeighbourhood,
}

impl TryFrom<u8> for NearMissVersion {
    type Error = ResampleError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            1 => Ok(NearMissVersion::NearestMinority),
            2 => Ok(NearMissVersion::FarthestMinority),
            3 => Ok(NearMissVersion::MinorityNeighbourhood),
            _ => Err(ResampleError::invalid("version", value, "Near-Miss version must be 1, 2 or 3")),
        }
    }
}

pub struct NearMiss {
    config: NearMissConfig,
}

impl NearMiss {
    pub fn new(config: NearMissConfig) -> Self {
        NearMiss { config }
    }

    /// Majority rows ordered by ascending mean distance to `n` minority rows in `mode`.
    fn rank_by_mean_distance(
        working: &Dataset,
        majority: &[usize],
        minority_pool: &NeighbourPool,
        mode: QueryMode,
    ) -> Result<Vec<usize>> {
        let mut scored: Vec<(f64, usize)> = majority
            .par_iter()
            .map(|&i| {
                let found = minority_pool.query(&working.row_vec(i), AVERAGED_NEIGHBOURS, mode)?;
                let mean = found.iter().map(|n| n.distance).sum::<f64>() / found.len() as f64;
                Ok((mean, i))
            })
            .collect::<Result<Vec<_>>>()?;
        scored.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        Ok(scored.into_iter().map(|(_, i)| i).collect())
    }

    /// Union of the `n` nearest majority rows of every minority row, each row once.
    fn minority_neighbourhoods(
        working: &Dataset,
        minority: &[usize],
        majority_pool: &NeighbourPool,
        n: usize,
    ) -> Result<Vec<usize>> {
        let per_minority: Vec<Vec<usize>> = minority
            .par_iter()
            .map(|&i| {
                let found = majority_pool.query(&working.row_vec(i), n, QueryMode::Nearest)?;
                Ok(found.into_iter().map(|n| n.index).collect())
            })
            .collect::<Result<Vec<_>>>()?;

        let mut seen = HashSet::new();
        Ok(per_minority
            .into_iter()
            .flatten()
            .filter(|i| seen.insert(*i))
            .collect())
    }
}

impl Resampler for NearMiss {
    fn name(&self) -> &str {
        "NearMiss"
    }

    fn common(&self) -> &SamplerConfig {
        &self.config.common
    }

    fn resample(&self, data: &Dataset) -> Result<Resampled> {
        let version = NearMissVersion::try_from(self.config.version)?;
        check_positive("n_neighbours", self.config.n_neighbours)?;
        check_non_negative("ratio", self.config.ratio)?;

        let mut prepared = prepare(data, &self.config.common)?;
        let context = DistanceContext::from_dataset(
            &prepared.working,
            self.config.common.distance,
            self.config.common.nominal_weighting,
        );
        let minority = prepared.ids_of(prepared.untouchable);
        let majority = prepared.majority_ids();

        let mut selected = match version {
            NearMissVersion::NearestMinority | NearMissVersion::FarthestMinority => {
                let mode = if version == NearMissVersion::NearestMinority {
                    QueryMode::Nearest
                } else {
                    QueryMode::Farthest
                };
                let pool = NeighbourPool::new(&prepared.working, minority.clone(), &context)?;
                Self::rank_by_mean_distance(&prepared.working, &majority, &pool, mode)?
            }
            NearMissVersion::MinorityNeighbourhood => {
                let pool = NeighbourPool::new(&prepared.working, majority.clone(), &context)?;
                let mut pooled = Self::minority_neighbourhoods(
                    &prepared.working,
                    &minority,
                    &pool,
                    self.config.n_neighbours,
                )?;
                pooled.shuffle(&mut prepared.rng);
                pooled
            }
        };

        let budget = (minority.len() as f64 * self.config.ratio).floor() as usize;
        selected.truncate(budget);
        log::debug!(
            "NearMiss {:?}: keeping {} of {} majority instances",
            version,
            selected.len(),
            majority.len()
        );

        let kept: Vec<usize> = minority.iter().chain(selected.iter()).copied().collect();
        Ok(prepared.select_original(data, &kept))
    }
}
