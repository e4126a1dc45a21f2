//! One-dimensional searches over the differential evolution scaling factor.
//!
//! Both procedures take an `evaluate` callback producing a candidate
//! population and its fitness for a given scaling factor, and return the best
//! candidate they saw. Ties keep the earlier candidate.
use rand::Rng;

use crate::error::Result;
use crate::sampling::ipade::de::Population;

pub(crate) const FACTOR_MIN: f64 = 0.1;
pub(crate) const FACTOR_MAX: f64 = 1.0;

const GOLDEN_ROUNDS: usize = 8;
const HILL_CLIMB_ROUNDS: usize = 20;
const HILL_CLIMB_STEP: f64 = 0.5;

/// Branch taken at a local-search iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LocalSearchMove {
    GoldenSection,
    HillClimb,
    Keep,
}

/// Draw the branch for one local-search iteration against the thresholds `(tau0, tau1)`.
pub(crate) fn choose_move<R: Rng + ?Sized>(tau: (f64, f64), rng: &mut R) -> LocalSearchMove {
    let d0: f64 = rng.gen();
    let d1: f64 = rng.gen();
    if d0 < tau.0 {
        LocalSearchMove::GoldenSection
    } else if d1 < tau.1 {
        LocalSearchMove::HillClimb
    } else {
        LocalSearchMove::Keep
    }
}

/// A population scored under a given scaling factor.
#[derive(Debug, Clone)]
pub(crate) struct Scored {
    pub population: Population,
    pub fitness: f64,
    pub factor: f64,
}

impl Scored {
    fn evaluate<F>(factor: f64, evaluate: &mut F) -> Result<Scored>
    where
        F: FnMut(f64) -> Result<(Population, f64)>,
    {
        let (population, fitness) = evaluate(factor)?;
        Ok(Scored {
            population,
            fitness,
            factor,
        })
    }

    fn keep_better(self, other: Scored) -> Scored {
        if other.fitness > self.fitness {
            other
        } else {
            self
        }
    }
}

/// Golden-section search of the factor on [0.1, 1.0].
pub(crate) fn golden_section<F>(mut evaluate: F) -> Result<Scored>
where
    F: FnMut(f64) -> Result<(Population, f64)>,
{
    let inv_phi = (5f64.sqrt() - 1.0) / 2.0;
    let (mut a, mut b) = (FACTOR_MIN, FACTOR_MAX);
    let mut best: Option<Scored> = None;

    for _ in 0..GOLDEN_ROUNDS {
        let c = b - (b - a) * inv_phi;
        let d = a + (b - a) * inv_phi;
        let left = Scored::evaluate(c, &mut evaluate)?;
        let right = Scored::evaluate(d, &mut evaluate)?;

        if left.fitness > right.fitness {
            b = d;
        } else {
            a = c;
        }
        let round_best = left.keep_better(right);
        best = Some(match best {
            Some(current) => current.keep_better(round_best),
            None => round_best,
        });
    }

    match best {
        Some(best) => Ok(best),
        None => Scored::evaluate((a + b) / 2.0, &mut evaluate),
    }
}

/// Stochastic hill-climbing of the factor starting at `start`.
///
/// Each round compares `f - h`, `f` and `f + h`; the step halves whenever the
/// centre wins.
pub(crate) fn hill_climb<F>(start: f64, mut evaluate: F) -> Result<Scored>
where
    F: FnMut(f64) -> Result<(Population, f64)>,
{
    let mut centre = Scored::evaluate(start.clamp(FACTOR_MIN, FACTOR_MAX), &mut evaluate)?;
    let mut step = HILL_CLIMB_STEP;

    for _ in 0..HILL_CLIMB_ROUNDS {
        let lower = Scored::evaluate((centre.factor - step).clamp(FACTOR_MIN, FACTOR_MAX), &mut evaluate)?;
        let upper = Scored::evaluate((centre.factor + step).clamp(FACTOR_MIN, FACTOR_MAX), &mut evaluate)?;
        let side = lower.keep_better(upper);
        if side.fitness > centre.fitness {
            centre = side;
        } else {
            step /= 2.0;
        }
    }
    Ok(centre)
}
