//! Differential evolution over a labelled prototype population.
//!
//! One call to [`DifferentialEvolution::run`] evolves a whole population for a
//! fixed number of iterations. Every tenth iteration refines the scaling factor
//! with a local search and mutates with the configured strategy; the others
//! mutate with `RandOne` under a freshly drawn factor. A challenger replaces
//! the incumbent only when the oracle scores it strictly higher.
use std::collections::BTreeMap;
use std::convert::TryFrom;

use ndarray::Array2;
use rand::seq::index::sample;
use rand::Rng;

use crate::data_handling::{Dataset, Label};
use crate::distance::DistanceContext;
use crate::error::{ResampleError, Result};
use crate::neighbours::{nearest_distinct_same_class, NeighbourPool};
use crate::oracle::FitnessOracle;
use crate::stats::class_accuracy;
use crate::sampling::ipade::local_search::{
    choose_move, golden_section, hill_climb, LocalSearchMove, FACTOR_MAX, FACTOR_MIN,
};

const LOCAL_SEARCH_PERIOD: usize = 10;
const INITIAL_FACTOR: f64 = 0.5;
const JITTER: f64 = 0.01;

/// Labelled prototypes in the normalised feature space.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Population {
    pub x: Vec<Vec<f64>>,
    pub y: Vec<Label>,
}

impl Population {
    /// Copy the rows `ids` of `data`.
    pub fn from_rows(data: &Dataset, ids: &[usize]) -> Self {
        Population {
            x: ids.iter().map(|&i| data.row_vec(i)).collect(),
            y: ids.iter().map(|&i| data.y[i]).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.y.len()
    }

    pub fn push(&mut self, row: Vec<f64>, label: Label) {
        self.x.push(row);
        self.y.push(label);
    }

    pub fn count(&self, label: Label) -> usize {
        self.y.iter().filter(|&&l| l == label).count()
    }

    pub fn to_matrix(&self, n_features: usize) -> Result<Array2<f64>> {
        Ok(Array2::from_shape_vec(
            (self.len(), n_features),
            self.x.iter().flatten().copied().collect(),
        )?)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationStrategy {
    /// `r1 + F (r2 - r3)`
    RandOne,
    /// `x + F (r1 - r2) + F (nearest - x)`
    CurrentToNearest,
    /// `F u ((r2 - r3) + (r1 - x))` with `u` uniform in [0, 1)
    ScaledDifference,
    /// `F (r2 - r3) + F (r4 - r5)`
    TwoDifferences,
}

impl MutationStrategy {
    /// Distinct same-class donors the strategy reads.
    pub fn donors(self) -> usize {
        match self {
            MutationStrategy::RandOne => 3,
            MutationStrategy::CurrentToNearest => 2,
            MutationStrategy::ScaledDifference => 3,
            MutationStrategy::TwoDifferences => 5,
        }
    }
}

impl TryFrom<u8> for MutationStrategy {
    type Error = ResampleError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            1 => Ok(MutationStrategy::RandOne),
            2 => Ok(MutationStrategy::CurrentToNearest),
            3 => Ok(MutationStrategy::ScaledDifference),
            4 => Ok(MutationStrategy::TwoDifferences),
            _ => Err(ResampleError::invalid("strategy", value, "mutation strategy must be 1, 2, 3 or 4")),
        }
    }
}

pub(crate) struct DifferentialEvolution<'a> {
    oracle: &'a dyn FitnessOracle,
    working: &'a Dataset,
    /// Working rows of each class, for the nearest same-class lookup.
    class_pools: BTreeMap<Label, NeighbourPool<'a>>,
    strategy: MutationStrategy,
    iterations: usize,
}

impl<'a> DifferentialEvolution<'a> {
    pub fn new(
        oracle: &'a dyn FitnessOracle,
        working: &'a Dataset,
        context: &'a DistanceContext,
        strategy: u8,
        iterations: usize,
    ) -> Result<Self> {
        let strategy = MutationStrategy::try_from(strategy)?;
        let mut class_pools = BTreeMap::new();
        for label in working.class_partition().labels() {
            let pool = NeighbourPool::new(working, working.indices_of(label), context)?;
            class_pools.insert(label, pool);
        }
        Ok(DifferentialEvolution {
            oracle,
            working,
            class_pools,
            strategy,
            iterations,
        })
    }

    /// Score `population` as a training set against the whole working set.
    pub fn fitness(&self, population: &Population) -> Result<f64> {
        let x = population.to_matrix(self.working.n_features())?;
        self.oracle
            .fitness(&x, &population.y, &self.working.x, &self.working.y)
    }

    /// Train on `population` and score each class's working rows separately.
    pub fn class_accuracies(&self, population: &Population) -> Result<BTreeMap<Label, Option<f64>>> {
        let x = population.to_matrix(self.working.n_features())?;
        let model = self.oracle.train(&x, &population.y)?;
        let predicted = model.predict(&self.working.x)?;
        Ok(self
            .class_pools
            .keys()
            .map(|&label| (label, class_accuracy(&self.working.y, &predicted, label)))
            .collect())
    }

    pub fn run<R: Rng + ?Sized>(&self, initial: Population, rng: &mut R) -> Result<(Population, f64)> {
        let mut population = initial;
        let mut fitness = self.fitness(&population)?;
        let tau: (f64, f64) = (rng.gen(), rng.gen());
        let mut factor = INITIAL_FACTOR;

        for iteration in 0..self.iterations {
            let challenger = if iteration % LOCAL_SEARCH_PERIOD == 0 {
                let strategy = self.strategy;
                match choose_move(tau, rng) {
                    LocalSearchMove::GoldenSection => {
                        let best = golden_section(|f| self.challenge(&population, strategy, f, &mut *rng))?;
                        factor = best.factor;
                        Some((best.population, best.fitness))
                    }
                    LocalSearchMove::HillClimb => {
                        let best = hill_climb(factor, |f| self.challenge(&population, strategy, f, &mut *rng))?;
                        factor = best.factor;
                        Some((best.population, best.fitness))
                    }
                    LocalSearchMove::Keep => None,
                }
            } else {
                let f = rng.gen_range(FACTOR_MIN..FACTOR_MAX);
                Some(self.challenge(&population, MutationStrategy::RandOne, f, rng)?)
            };

            if let Some((candidate, score)) = challenger {
                if score > fitness {
                    log::trace!("DE iteration {}: fitness {:.4} -> {:.4}", iteration, fitness, score);
                    population = candidate;
                    fitness = score;
                }
            }
        }
        Ok((population, fitness))
    }

    /// Mutate every member of `population` and score the result.
    fn challenge<R: Rng + ?Sized>(
        &self,
        population: &Population,
        strategy: MutationStrategy,
        factor: f64,
        rng: &mut R,
    ) -> Result<(Population, f64)> {
        let mut mutated = Population::default();
        for i in 0..population.len() {
            let row = self.mutant(population, i, strategy, factor, rng)?;
            mutated.push(row, population.y[i]);
        }
        let fitness = self.fitness(&mutated)?;
        Ok((mutated, fitness))
    }

    /// Trial vector for member `i`. Nominal attributes keep the member's value.
    pub fn mutant<R: Rng + ?Sized>(
        &self,
        population: &Population,
        i: usize,
        strategy: MutationStrategy,
        factor: f64,
        rng: &mut R,
    ) -> Result<Vec<f64>> {
        let current = &population.x[i];
        let label = population.y[i];
        let needed = strategy.donors();

        let mut donors: Vec<Vec<f64>> = (0..population.len())
            .filter(|&j| j != i && population.y[j] == label)
            .map(|j| population.x[j].clone())
            .collect();
        while donors.len() < needed {
            donors.push(jitter(current, rng));
        }
        let picks = sample(rng, donors.len(), needed).into_vec();
        let r = |n: usize| &donors[picks[n]];

        let raw: Vec<f64> = match strategy {
            MutationStrategy::RandOne => (0..current.len())
                .map(|f| r(0)[f] + (r(1)[f] - r(2)[f]) * factor)
                .collect(),
            MutationStrategy::CurrentToNearest => {
                let nearest = self.nearest_same_class(label, current)?;
                (0..current.len())
                    .map(|f| {
                        current[f] + (r(0)[f] - r(1)[f]) * factor + (nearest[f] - current[f]) * factor
                    })
                    .collect()
            }
            MutationStrategy::ScaledDifference => {
                let u: f64 = rng.gen();
                (0..current.len())
                    .map(|f| ((r(1)[f] - r(2)[f]) + (r(0)[f] - current[f])) * factor * u)
                    .collect()
            }
            MutationStrategy::TwoDifferences => (0..current.len())
                .map(|f| (r(1)[f] - r(2)[f]) * factor + (r(3)[f] - r(4)[f]) * factor)
                .collect(),
        };

        Ok(raw
            .into_iter()
            .enumerate()
            .map(|(f, v)| {
                if self.working.nominal[f] {
                    current[f]
                } else {
                    v.clamp(0.0, 1.0)
                }
            })
            .collect())
    }

    fn nearest_same_class(&self, label: Label, current: &[f64]) -> Result<Vec<f64>> {
        let pool = match self.class_pools.get(&label) {
            Some(pool) => pool,
            None => return Ok(current.to_vec()),
        };
        Ok(match nearest_distinct_same_class(pool, current)? {
            Some(hit) => self.working.row_vec(hit.index),
            None => current.to_vec(),
        })
    }
}

fn jitter<R: Rng + ?Sized>(row: &[f64], rng: &mut R) -> Vec<f64> {
    row.iter()
        .map(|&v| (v + rng.gen_range(-JITTER..JITTER)).clamp(0.0, 1.0))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DistanceMetric, FitnessMeasure, ModelConfig, NominalWeighting};
    use crate::oracle::ClassifierOracle;
    use ndarray::array;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn working() -> Dataset {
        Dataset::continuous(
            array![
                [0.0, 0.1],
                [0.1, 0.0],
                [0.2, 0.2],
                [0.15, 0.05],
                [0.9, 1.0],
                [1.0, 0.9],
                [0.8, 0.85]
            ],
            vec![0, 0, 0, 0, 1, 1, 1],
        )
        .unwrap()
    }

    fn oracle() -> ClassifierOracle {
        ClassifierOracle::new(ModelConfig::default(), FitnessMeasure::Auc)
    }

    #[test]
    fn test_invalid_strategy_is_rejected_up_front() {
        let data = working();
        let context = DistanceContext::from_dataset(&data, DistanceMetric::Euclidean, NominalWeighting::Overlap);
        let oracle = oracle();
        let err = DifferentialEvolution::new(&oracle, &data, &context, 5, 10).err().unwrap();
        assert!(err.is_invalid_parameter());
    }

    #[test]
    fn test_every_strategy_stays_in_unit_box() {
        let data = working();
        let context = DistanceContext::from_dataset(&data, DistanceMetric::Euclidean, NominalWeighting::Overlap);
        let oracle = oracle();
        let population = Population::from_rows(&data, &[0, 2, 4, 5]);
        let mut rng = StdRng::seed_from_u64(9);

        for strategy in 1..=4u8 {
            let de = DifferentialEvolution::new(&oracle, &data, &context, strategy, 1).unwrap();
            for i in 0..population.len() {
                for &factor in &[0.1, 0.5, 1.0] {
                    let row = de.mutant(&population, i, de.strategy, factor, &mut rng).unwrap();
                    assert_eq!(row.len(), 2);
                    assert!(row.iter().all(|&v| (0.0..=1.0).contains(&v)), "strategy {}: {:?}", strategy, row);
                }
            }
        }
    }

    #[test]
    fn test_run_never_lowers_fitness_and_is_seeded() {
        let data = working();
        let context = DistanceContext::from_dataset(&data, DistanceMetric::Euclidean, NominalWeighting::Overlap);
        let oracle = oracle();
        let de = DifferentialEvolution::new(&oracle, &data, &context, 2, 12).unwrap();
        let initial = Population::from_rows(&data, &[0, 4]);
        let start = de.fitness(&initial).unwrap();

        let (first, fitness) = de.run(initial.clone(), &mut StdRng::seed_from_u64(3)).unwrap();
        let (second, _) = de.run(initial, &mut StdRng::seed_from_u64(3)).unwrap();
        assert!(fitness >= start);
        assert_eq!(first, second);
        assert_eq!(first.y, vec![0, 1]);
    }
}
