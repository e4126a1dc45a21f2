//! IPADE: iterative prototype adjustment based on differential evolution.
//!
//! The controller starts from one prototype per decision-tree leaf, evolves
//! the population once, then repeatedly grows the class the current
//! population serves worst. A class stops being a target ("converges") when
//! a grown and re-evolved population fails to beat the incumbent; the
//! untouchable class gets extra attempts before it converges.
use std::collections::BTreeMap;

use rand::seq::SliceRandom;
use rand::Rng;

use crate::config::{IpadeConfig, SamplerConfig};
use crate::data_handling::{Dataset, Label};
use crate::distance::{manhattan, DistanceContext};
use crate::error::{ResampleError, Result};
use crate::oracle::{ClassifierOracle, FitnessOracle};
use crate::sampling::{prepare, Prepared, Resampled, Resampler};

mod de;
mod init;
mod local_search;

use de::{DifferentialEvolution, Population};
pub use de::MutationStrategy;

/// Non-improving attempts tolerated for the untouchable class.
const STAGNATION_LIMIT: usize = 10;
/// Non-improving challengers accepted anyway for the untouchable class.
const FORCED_ACCEPTANCE_LIMIT: usize = 10;

/// Per-class bookkeeping of one controller run.
#[derive(Debug, Clone, Default)]
struct ClassState {
    marked: bool,
    stagnation: usize,
    optimized_iterations: usize,
    accuracy: f64,
}

/// What the controller did with one challenger.
#[derive(Debug)]
enum Verdict {
    /// Strictly fitter than the incumbent.
    Improved(Population),
    /// Not fitter, but the untouchable class still has forced acceptances left.
    Forced(Population),
    /// Untouchable challenger kept aside as the next seed.
    Stashed,
    Converged,
}

/// Convergence state of every class plus the stashed untouchable challenger.
struct Controller {
    states: BTreeMap<Label, ClassState>,
    untouchable: Label,
    alternative: Option<Population>,
}

impl Controller {
    fn new(labels: Vec<Label>, untouchable: Label) -> Self {
        Controller {
            states: labels.into_iter().map(|label| (label, ClassState::default())).collect(),
            untouchable,
            alternative: None,
        }
    }

    fn active(&self) -> bool {
        self.states.values().any(|s| !s.marked)
    }

    /// Stashed challenger to re-evolve, only ever handed to the untouchable class.
    fn take_alternative(&mut self, target: Label) -> Option<Population> {
        if target == self.untouchable {
            self.alternative.take()
        } else {
            None
        }
    }

    fn judge(&mut self, target: Label, challenger: Population, improved: bool) -> Result<Verdict> {
        let untouchable = self.untouchable;
        let state = self
            .states
            .get_mut(&target)
            .ok_or_else(|| ResampleError::DegenerateInput(format!("unknown class {}", target)))?;
        if improved {
            state.optimized_iterations += 1;
            if let Some(minority) = self.states.get_mut(&untouchable) {
                minority.stagnation = 0;
            }
            return Ok(Verdict::Improved(challenger));
        }
        if target != untouchable {
            log::debug!("IPADE: class {} converged at accuracy {:.4}", target, state.accuracy);
            state.marked = true;
            return Ok(Verdict::Converged);
        }
        if state.optimized_iterations < FORCED_ACCEPTANCE_LIMIT {
            state.optimized_iterations += 1;
            return Ok(Verdict::Forced(challenger));
        }
        state.stagnation += 1;
        if state.stagnation >= STAGNATION_LIMIT {
            log::debug!("IPADE: untouchable class {} stagnated", target);
            state.marked = true;
        }
        self.alternative = Some(challenger);
        Ok(Verdict::Stashed)
    }
}

pub struct Ipade {
    config: IpadeConfig,
    oracle: Box<dyn FitnessOracle>,
}

impl Ipade {
    pub fn new(config: IpadeConfig) -> Self {
        let oracle = Box::new(ClassifierOracle::new(config.oracle.clone(), config.measure));
        Ipade { config, oracle }
    }

    /// Use a custom fitness oracle instead of the configured classifier.
    pub fn with_oracle(config: IpadeConfig, oracle: Box<dyn FitnessOracle>) -> Self {
        Ipade { config, oracle }
    }

    /// Lowest-accuracy unmarked class; classes with fewer than 2 rows are marked on the way.
    fn select_target(
        &self,
        de: &DifferentialEvolution,
        population: &Population,
        partition_counts: &BTreeMap<Label, usize>,
        states: &mut BTreeMap<Label, ClassState>,
    ) -> Result<Option<Label>> {
        let accuracies = de.class_accuracies(population)?;
        let mut target: Option<(Label, f64)> = None;
        for (&label, state) in states.iter_mut() {
            if state.marked {
                continue;
            }
            if partition_counts.get(&label).copied().unwrap_or(0) < 2 {
                log::debug!("IPADE: class {} has fewer than 2 instances, marking converged", label);
                state.marked = true;
                continue;
            }
            state.accuracy = accuracies.get(&label).copied().flatten().unwrap_or(0.0);
            if target.map_or(true, |(_, worst)| state.accuracy < worst) {
                target = Some((label, state.accuracy));
            }
        }
        Ok(target.map(|(label, _)| label))
    }

    /// Row of class `target` to add to the population.
    fn pick_instance<R: Rng + ?Sized>(
        &self,
        working: &Dataset,
        population: &Population,
        target: Label,
        untouchable: Label,
        rng: &mut R,
    ) -> Result<usize> {
        let candidates = working.indices_of(target);
        let picked = if !self.config.random_choice && target == untouchable {
            farthest_candidate(working, &candidates, population)
        } else {
            candidates.choose(rng).copied()
        };
        picked.ok_or_else(|| {
            ResampleError::DegenerateInput(format!("class {} has no instances to add", target))
        })
    }
}

/// Candidate with the largest summed L1 distance to the population.
///
/// Candidates duplicating a prototype score `NEG_INFINITY`; ties keep the first.
fn farthest_candidate(working: &Dataset, candidates: &[usize], population: &Population) -> Option<usize> {
    let mut best: Option<(f64, usize)> = None;
    for &c in candidates {
        let row = working.row_vec(c);
        let distances: Vec<f64> = population.x.iter().map(|p| manhattan(p, &row)).collect();
        let score = if distances.iter().any(|&d| d == 0.0) {
            f64::NEG_INFINITY
        } else {
            distances.iter().sum()
        };
        if best.map_or(true, |(top, _)| score > top) {
            best = Some((score, c));
        }
    }
    best.map(|(_, c)| c)
}

impl Resampler for Ipade {
    fn name(&self) -> &str {
        "IPADE"
    }

    fn common(&self) -> &SamplerConfig {
        &self.config.common
    }

    fn resample(&self, data: &Dataset) -> Result<Resampled> {
        // rejected before any data preparation or mutation
        MutationStrategy::try_from(self.config.strategy)?;

        let Prepared {
            working,
            scaler,
            partition,
            untouchable,
            mut rng,
            ..
        } = prepare(data, &self.config.common)?;
        let context = DistanceContext::from_dataset(
            &working,
            self.config.common.distance,
            self.config.common.nominal_weighting,
        );
        let de = DifferentialEvolution::new(
            self.oracle.as_ref(),
            &working,
            &context,
            self.config.strategy,
            self.config.iterations,
        )?;

        let initial = init::initial_prototypes(&working, &context, &self.config.init_tree, &mut rng)?;
        log::info!("IPADE: {} initial prototypes", initial.len());
        let (mut population, mut fitness) = de.run(initial, &mut rng)?;
        log::debug!("IPADE: initial population fitness {:.4}", fitness);

        let counts: BTreeMap<Label, usize> = partition.iter().collect();
        let mut controller = Controller::new(partition.labels(), untouchable);

        while controller.active() {
            let target = match self.select_target(&de, &population, &counts, &mut controller.states)? {
                Some(target) => target,
                None => break,
            };

            let seed = match controller.take_alternative(target) {
                Some(stashed) => stashed,
                None => {
                    let pick = self.pick_instance(&working, &population, target, untouchable, &mut rng)?;
                    let mut grown = population.clone();
                    grown.push(working.row_vec(pick), target);
                    grown
                }
            };

            let (challenger, challenger_fitness) = de.run(seed, &mut rng)?;
            fitness = de.fitness(&population)?;
            let improved = challenger_fitness > fitness;

            match controller.judge(target, challenger, improved)? {
                Verdict::Improved(accepted) => {
                    log::debug!(
                        "IPADE: class {} improved fitness {:.4} -> {:.4}",
                        target,
                        fitness,
                        challenger_fitness
                    );
                    population = accepted;
                    fitness = challenger_fitness;
                }
                Verdict::Forced(accepted) => {
                    population = accepted;
                    fitness = challenger_fitness;
                }
                Verdict::Stashed | Verdict::Converged => {}
            }
        }

        log::info!(
            "IPADE: final population of {} prototypes, fitness {:.4}",
            population.len(),
            fitness
        );
        for label in partition.labels() {
            log::debug!("IPADE: class {} keeps {} prototypes", label, population.count(label));
        }
        let reduced = Dataset::from_rows(&population.x, population.y, working.nominal.clone())?;
        let dataset = match scaler {
            Some(scaler) => scaler.inverse_transform(&reduced),
            None => reduced,
        };
        Ok(Resampled {
            dataset,
            indices: None,
        })
    }
}
