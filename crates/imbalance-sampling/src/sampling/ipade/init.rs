//! Initial prototypes from the leaf partition of a decision tree.
use std::collections::BTreeMap;

use rand::seq::SliceRandom;
use rand::Rng;

use crate::config::TreeParams;
use crate::data_handling::Dataset;
use crate::distance::DistanceContext;
use crate::error::{ResampleError, Result};
use crate::models::{ClassifierModel, DecisionTreeClassifier, LeafIndex};
use crate::sampling::ipade::de::Population;

/// Prototypes injected for a class the tree partition left without one.
const MISSING_CLASS_PROTOTYPES: usize = 2;

/// One prototype per tree leaf: the leaf member closest to the leaf centroid.
///
/// Classes absent from the result receive up to two random rows of their own.
pub(crate) fn initial_prototypes<R: Rng + ?Sized>(
    working: &Dataset,
    context: &DistanceContext,
    params: &TreeParams,
    rng: &mut R,
) -> Result<Population> {
    let mut tree = DecisionTreeClassifier::new(*params);
    tree.fit(&working.x, &working.y)?;

    let mut clusters: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for i in 0..working.n_samples() {
        let leaf = tree
            .leaf_id(&working.row_vec(i))
            .ok_or_else(|| ResampleError::DegenerateInput("decision tree has no leaves".to_string()))?;
        clusters.entry(leaf).or_default().push(i);
    }
    log::debug!("IPADE init: {} leaves over {} rows", clusters.len(), working.n_samples());

    let mut chosen: Vec<usize> = clusters
        .values()
        .map(|members| centroid_member(working, context, members))
        .collect();

    let mut population_labels: Vec<_> = chosen.iter().map(|&i| working.y[i]).collect();
    for label in working.class_partition().labels() {
        if population_labels.contains(&label) {
            continue;
        }
        let own = working.indices_of(label);
        let picked: Vec<usize> = own
            .choose_multiple(rng, MISSING_CLASS_PROTOTYPES)
            .copied()
            .collect();
        log::debug!("IPADE init: class {} had no prototype, injecting {:?}", label, picked);
        population_labels.extend(picked.iter().map(|&i| working.y[i]));
        chosen.extend(picked);
    }

    Ok(Population::from_rows(working, &chosen))
}

/// Member nearest to the mean of `members`; ties keep the first member.
fn centroid_member(working: &Dataset, context: &DistanceContext, members: &[usize]) -> usize {
    let n_features = working.n_features();
    let mut centroid = vec![0.0; n_features];
    for &i in members {
        for (c, v) in centroid.iter_mut().zip(working.row(i).iter()) {
            *c += v;
        }
    }
    for c in centroid.iter_mut() {
        *c /= members.len() as f64;
    }

    let mut best = members[0];
    let mut best_distance = f64::INFINITY;
    for &i in members {
        let d = context.distance(&working.row_vec(i), &centroid);
        if d < best_distance {
            best = i;
            best_distance = d;
        }
    }
    best
}
