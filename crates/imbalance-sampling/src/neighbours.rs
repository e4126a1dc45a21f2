//! k-NN rule evaluators over a pool of dataset rows.
//!
//! A `NeighbourPool` indexes a subset of a dataset's rows and reports results
//! with the parent dataset's indices. The pool never hides the query point;
//! callers that need to exclude themselves use `query_excluding`, which filters
//! by identity rather than by position in the result.
use ndarray::Array2;

use crate::config::DistanceMetric;
use crate::data_handling::{Dataset, Label};
use crate::distance::DistanceContext;
use crate::error::{ResampleError, Result};
use crate::spatial::{KdTree, Neighbour, QueryMode};

/// Anything able to answer k-nearest / k-farthest queries over its own points.
pub trait NeighbourSearch: Send + Sync {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Up to `k` neighbours indexed by position in the searched point set.
    fn n_neighbours(&self, query: &[f64], k: usize, mode: QueryMode) -> Result<Vec<Neighbour>>;
}

impl NeighbourSearch for KdTree {
    fn len(&self) -> usize {
        KdTree::len(self)
    }

    fn n_neighbours(&self, query: &[f64], k: usize, mode: QueryMode) -> Result<Vec<Neighbour>> {
        KdTree::n_neighbours(self, query, k, mode)
    }
}

/// Exhaustive scan under any metric of a `DistanceContext`.
pub struct BruteForce<'a> {
    points: Array2<f64>,
    labels: Vec<Label>,
    context: &'a DistanceContext,
}

impl<'a> BruteForce<'a> {
    pub fn new(points: Array2<f64>, labels: Vec<Label>, context: &'a DistanceContext) -> Self {
        BruteForce {
            points,
            labels,
            context,
        }
    }
}

impl NeighbourSearch for BruteForce<'_> {
    fn len(&self) -> usize {
        self.labels.len()
    }

    fn n_neighbours(&self, query: &[f64], k: usize, mode: QueryMode) -> Result<Vec<Neighbour>> {
        if self.labels.is_empty() {
            return Err(ResampleError::EmptyIndex);
        }
        let mut all: Vec<Neighbour> = self
            .points
            .rows()
            .into_iter()
            .enumerate()
            .map(|(index, row)| Neighbour {
                index,
                distance: self.context.distance(&row.to_vec(), query),
                label: self.labels[index],
            })
            .collect();
        all.sort_by(|a, b| {
            let by_distance = match mode {
                QueryMode::Nearest => a.distance.total_cmp(&b.distance),
                QueryMode::Farthest => b.distance.total_cmp(&a.distance),
            };
            by_distance.then(a.index.cmp(&b.index))
        });
        all.truncate(k);
        Ok(all)
    }
}

/// Searchable subset of a dataset's rows.
pub struct NeighbourPool<'a> {
    ids: Vec<usize>,
    search: Box<dyn NeighbourSearch + 'a>,
}

impl<'a> NeighbourPool<'a> {
    /// Index the rows `ids` of `data` with the metric held by `context`.
    pub fn new(data: &Dataset, ids: Vec<usize>, context: &'a DistanceContext) -> Result<Self> {
        let subset = data.select(&ids);
        let search: Box<dyn NeighbourSearch + 'a> = match context.metric() {
            DistanceMetric::Euclidean => Box::new(KdTree::build(&subset.x, &subset.y)?),
            DistanceMetric::Heterogeneous => Box::new(BruteForce::new(subset.x, subset.y, context)),
        };
        Ok(NeighbourPool { ids, search })
    }

    /// Pool over every row of `data`.
    pub fn full(data: &Dataset, context: &'a DistanceContext) -> Result<Self> {
        NeighbourPool::new(data, (0..data.n_samples()).collect(), context)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn ids(&self) -> &[usize] {
        &self.ids
    }

    /// Up to `k` neighbours, reported with parent dataset indices.
    pub fn query(&self, query: &[f64], k: usize, mode: QueryMode) -> Result<Vec<Neighbour>> {
        let found = self.search.n_neighbours(query, k, mode)?;
        Ok(found
            .into_iter()
            .map(|n| Neighbour {
                index: self.ids[n.index],
                ..n
            })
            .collect())
    }

    /// Like `query`, but drops the row whose parent index is `exclude`.
    pub fn query_excluding(
        &self,
        query: &[f64],
        k: usize,
        mode: QueryMode,
        exclude: usize,
    ) -> Result<Vec<Neighbour>> {
        let mut found = self.query(query, k + 1, mode)?;
        found.retain(|n| n.index != exclude);
        found.truncate(k);
        Ok(found)
    }
}

/// Result of a k-NN rule evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub label: Label,
    pub indices: Vec<usize>,
    pub distances: Vec<f64>,
}

/// Most frequent label; ties go to the first label reaching the top count in scan order.
pub fn majority_vote(labels: &[Label]) -> Option<Label> {
    let mut counts: Vec<(Label, usize)> = Vec::new();
    for &label in labels {
        match counts.iter_mut().find(|(l, _)| *l == label) {
            Some((_, c)) => *c += 1,
            None => counts.push((label, 1)),
        }
    }
    let best = counts.iter().map(|&(_, c)| c).max()?;
    counts.into_iter().find(|&(_, c)| c == best).map(|(l, _)| l)
}

/// Predict a label by majority vote among the `k` neighbours of `query` in `pool`.
///
/// `exclude` removes the query's own row when it is part of the pool.
pub fn classify(
    pool: &NeighbourPool,
    query: &[f64],
    k: usize,
    mode: QueryMode,
    exclude: Option<usize>,
) -> Result<Classification> {
    if pool.is_empty() {
        return Err(ResampleError::insufficient_neighbours("classifying with a k-NN rule"));
    }
    let neighbours = match exclude {
        Some(own) => pool.query_excluding(query, k, mode, own)?,
        None => pool.query(query, k, mode)?,
    };
    let labels: Vec<Label> = neighbours.iter().map(|n| n.label).collect();
    let label = majority_vote(&labels)
        .ok_or_else(|| ResampleError::insufficient_neighbours("classifying with a k-NN rule"))?;
    Ok(Classification {
        label,
        indices: neighbours.iter().map(|n| n.index).collect(),
        distances: neighbours.iter().map(|n| n.distance).collect(),
    })
}

/// Nearest pool member at a strictly positive distance from `query`.
///
/// Exact duplicates of the query (including the query itself) are skipped.
/// Returns `None` when every pool member coincides with the query.
pub fn nearest_distinct_same_class(pool: &NeighbourPool, query: &[f64]) -> Result<Option<Neighbour>> {
    if pool.is_empty() {
        return Err(ResampleError::insufficient_neighbours("searching a same-class neighbour"));
    }
    let mut k = 2;
    loop {
        let found = pool.query(query, k, QueryMode::Nearest)?;
        if let Some(hit) = found.iter().find(|n| n.distance > 0.0) {
            return Ok(Some(*hit));
        }
        if k >= pool.len() {
            return Ok(None);
        }
        k = (k * 2).min(pool.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NominalWeighting;
    use ndarray::array;

    fn line() -> Dataset {
        Dataset::continuous(
            array![[0.0], [1.0], [2.0], [3.0], [10.0], [11.0]],
            vec![0, 0, 1, 1, 1, 0],
        )
        .unwrap()
    }

    #[test]
    fn test_majority_vote_tie_break() {
        assert_eq!(majority_vote(&[2, 1, 1, 2]), Some(2));
        assert_eq!(majority_vote(&[3, 1, 1]), Some(1));
        assert_eq!(majority_vote(&[]), None);
    }

    #[test]
    fn test_pool_reports_parent_indices() {
        let data = line();
        let ctx = DistanceContext::from_dataset(&data, DistanceMetric::Euclidean, NominalWeighting::Overlap);
        let pool = NeighbourPool::new(&data, vec![2, 3, 4], &ctx).unwrap();
        let found = pool.query(&[0.0], 2, QueryMode::Nearest).unwrap();
        assert_eq!(found.iter().map(|n| n.index).collect::<Vec<_>>(), vec![2, 3]);
    }

    #[test]
    fn test_classify_excludes_self_by_identity() {
        let data = line();
        let ctx = DistanceContext::from_dataset(&data, DistanceMetric::Euclidean, NominalWeighting::Overlap);
        let pool = NeighbourPool::full(&data, &ctx).unwrap();
        let result = classify(&pool, &[1.0], 3, QueryMode::Nearest, Some(1)).unwrap();
        assert!(!result.indices.contains(&1));
        assert_eq!(result.indices.len(), 3);
        // neighbours 0 (class 0), 2 (class 1), 3 (class 1)
        assert_eq!(result.label, 1);
    }

    #[test]
    fn test_classify_empty_pool_is_degenerate() {
        let data = line();
        let ctx = DistanceContext::from_dataset(&data, DistanceMetric::Euclidean, NominalWeighting::Overlap);
        let pool = NeighbourPool::new(&data, vec![], &ctx).unwrap();
        let err = classify(&pool, &[1.0], 3, QueryMode::Nearest, None).unwrap_err();
        assert!(matches!(err, ResampleError::DegenerateInput(_)));
    }

    #[test]
    fn test_nearest_distinct_skips_duplicates() {
        let data = Dataset::continuous(array![[1.0], [1.0], [1.0], [4.0]], vec![0, 0, 0, 0]).unwrap();
        let ctx = DistanceContext::from_dataset(&data, DistanceMetric::Euclidean, NominalWeighting::Overlap);
        let pool = NeighbourPool::full(&data, &ctx).unwrap();
        let hit = nearest_distinct_same_class(&pool, &[1.0]).unwrap().unwrap();
        assert_eq!(hit.index, 3);

        let only_dupes = NeighbourPool::new(&data, vec![0, 1], &ctx).unwrap();
        assert_eq!(nearest_distinct_same_class(&only_dupes, &[1.0]).unwrap(), None);
    }

    #[test]
    fn test_brute_force_agrees_with_kd_tree() {
        let data = line();
        let euclid = DistanceContext::from_dataset(&data, DistanceMetric::Euclidean, NominalWeighting::Overlap);
        let kd = NeighbourPool::full(&data, &euclid).unwrap();
        let brute = BruteForce::new(data.x.clone(), data.y.clone(), &euclid);
        let a: Vec<usize> = kd.query(&[2.4], 4, QueryMode::Farthest).unwrap().iter().map(|n| n.index).collect();
        let b: Vec<usize> = brute.n_neighbours(&[2.4], 4, QueryMode::Farthest).unwrap().iter().map(|n| n.index).collect();
        assert_eq!(a, b);
    }
}
