//! Integration tests for the neighbourhood filtering rules and their index.

use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use imbalance_sampling::config::{
    DistanceMetric, EnnConfig, NclConfig, NearMissConfig, NominalWeighting, SamplerConfig,
};
use imbalance_sampling::data_handling::{Dataset, Label};
use imbalance_sampling::distance::DistanceContext;
use imbalance_sampling::sampling::{
    EditedNearestNeighbours, NearMiss, NeighbourhoodCleaningRule, Resampler,
};
use imbalance_sampling::spatial::{KdTree, QueryMode};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Uniform points in the unit square, `counts[c]` of them labelled `c`.
fn random_dataset(seed: u64, counts: &[usize]) -> Dataset {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut values = Vec::new();
    let mut labels = Vec::new();
    for (label, &count) in counts.iter().enumerate() {
        for _ in 0..count {
            values.push(rng.gen::<f64>());
            values.push(rng.gen::<f64>());
            labels.push(label as Label);
        }
    }
    let x = Array2::from_shape_vec((labels.len(), 2), values).unwrap();
    Dataset::continuous(x, labels).unwrap()
}

fn common(seed: u64) -> SamplerConfig {
    SamplerConfig {
        randomize_order: true,
        ..SamplerConfig::default().with_seed(seed)
    }
}

fn samplers(seed: u64) -> Vec<Box<dyn Resampler>> {
    let mut all: Vec<Box<dyn Resampler>> = vec![
        Box::new(EditedNearestNeighbours::new(EnnConfig {
            common: common(seed),
            k: 3,
        })),
        Box::new(NeighbourhoodCleaningRule::new(NclConfig {
            common: common(seed),
            k: 3,
            threshold: 0.1,
        })),
    ];
    for version in 1..=3 {
        all.push(Box::new(NearMiss::new(NearMissConfig {
            common: common(seed),
            version,
            n_neighbours: 3,
            ratio: 1.0,
        })));
    }
    all
}

// ---------------------------------------------------------------------------
// Minority preservation
// ---------------------------------------------------------------------------

#[test]
fn filters_never_remove_the_untouchable_class() {
    init_logger();
    for seed in 0..4 {
        let data = random_dataset(seed, &[30, 20, 6]);
        let minority = data.indices_of(2);
        for sampler in samplers(seed) {
            let result = sampler.fit_resample(&data).unwrap();
            let kept = result.indices.unwrap();
            for i in &minority {
                assert!(kept.contains(i), "{} removed minority row {} (seed {})", sampler.name(), i, seed);
            }
            assert_eq!(result.dataset.n_samples(), kept.len());
        }
    }
}

#[test]
fn filters_keep_input_order_and_rows() {
    let data = random_dataset(11, &[25, 8]);
    for sampler in samplers(11) {
        let result = sampler.fit_resample(&data).unwrap();
        let kept = result.indices.unwrap();
        assert!(kept.windows(2).all(|w| w[0] < w[1]), "{} output not in input order", sampler.name());
        for (row, &i) in kept.iter().enumerate() {
            assert_eq!(result.dataset.row_vec(row), data.row_vec(i));
            assert_eq!(result.dataset.y[row], data.y[i]);
        }
    }
}

// ---------------------------------------------------------------------------
// Spatial index and distances
// ---------------------------------------------------------------------------

#[test]
fn kd_tree_results_are_sorted_and_sized() {
    let data = random_dataset(5, &[40, 20]);
    let tree = KdTree::build(&data.x, &data.y).unwrap();
    let mut rng = StdRng::seed_from_u64(6);
    for k in [1, 3, 10, 60] {
        let query = [rng.gen::<f64>(), rng.gen::<f64>()];

        let nearest = tree.n_neighbours(&query, k, QueryMode::Nearest).unwrap();
        assert_eq!(nearest.len(), k);
        assert!(nearest.windows(2).all(|w| w[0].distance <= w[1].distance));

        let farthest = tree.n_neighbours(&query, k, QueryMode::Farthest).unwrap();
        assert_eq!(farthest.len(), k);
        assert!(farthest.windows(2).all(|w| w[0].distance >= w[1].distance));
    }
}

#[test]
fn heterogeneous_distance_is_symmetric() {
    let mut rng = StdRng::seed_from_u64(21);
    let rows: Vec<Vec<f64>> = (0..20)
        .map(|_| vec![rng.gen::<f64>() * 10.0, rng.gen_range(0..3) as f64, rng.gen::<f64>()])
        .collect();
    let labels: Vec<Label> = (0..20).map(|i| (i % 2) as Label).collect();
    let data = Dataset::from_rows(&rows, labels, vec![false, true, false]).unwrap();

    for weighting in [NominalWeighting::Overlap, NominalWeighting::ValueDifference] {
        let context = DistanceContext::from_dataset(&data, DistanceMetric::Heterogeneous, weighting);
        for a in &rows {
            assert_eq!(context.distance(a, a), 0.0);
            for b in &rows {
                assert_eq!(context.distance(a, b), context.distance(b, a));
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[test]
fn near_miss_one_balances_ten_against_two() {
    let data = random_dataset(3, &[10, 2]);
    let nm = NearMiss::new(NearMissConfig {
        common: SamplerConfig::default().with_seed(3),
        version: 1,
        n_neighbours: 3,
        ratio: 1.0,
    });
    let result = nm.fit_resample(&data).unwrap();
    assert_eq!(result.dataset.n_samples(), 4);
    assert_eq!(result.dataset.class_partition().count(0), 2);
    assert_eq!(result.dataset.class_partition().count(1), 2);
}

#[test]
fn near_miss_three_pools_distinct_majority_rows() {
    let data = random_dataset(8, &[20, 5]);
    let nm = NearMiss::new(NearMissConfig {
        common: common(8),
        version: 3,
        n_neighbours: 4,
        ratio: 100.0,
    });
    let result = nm.fit_resample(&data).unwrap();
    let kept = result.indices.unwrap();
    let majority = result.dataset.class_partition().count(0);
    assert!(majority >= 4 && majority <= 20);
    assert_eq!(kept.len(), majority + 5);
}

#[test]
fn enn_keeps_separable_majority() {
    let mut rows = Vec::new();
    let mut labels = Vec::new();
    for i in 0..8 {
        rows.push(vec![(i % 4) as f64 * 0.1, (i / 4) as f64 * 0.1]);
        labels.push(0);
    }
    for i in 0..3 {
        rows.push(vec![10.0 + i as f64 * 0.1, 10.0]);
        labels.push(1);
    }
    let data = Dataset::from_rows(&rows, labels, vec![false, false]).unwrap();
    let enn = EditedNearestNeighbours::new(EnnConfig {
        common: SamplerConfig::default().with_seed(1),
        k: 3,
    });
    let result = enn.fit_resample(&data).unwrap();
    assert_eq!(result.dataset, data);
}

#[test]
fn ncl_with_unreachable_threshold_only_applies_enn() {
    let data = random_dataset(13, &[20, 15, 5]);
    let enn = EditedNearestNeighbours::new(EnnConfig {
        common: SamplerConfig::default().with_seed(2),
        k: 3,
    });
    let ncl = NeighbourhoodCleaningRule::new(NclConfig {
        common: SamplerConfig::default().with_seed(2),
        k: 3,
        threshold: 1.0,
    });
    let edited = enn.fit_resample(&data).unwrap();
    let cleaned = ncl.fit_resample(&data).unwrap();
    assert_eq!(cleaned.indices, edited.indices);

    let two_class = random_dataset(13, &[20, 5]);
    let cleaned = ncl.fit_resample(&two_class).unwrap();
    assert_eq!(cleaned.dataset, two_class);
}

#[test]
fn single_class_input_is_rejected() {
    let data = random_dataset(1, &[6]);
    for sampler in samplers(1) {
        assert!(sampler.fit_resample(&data).is_err(), "{} accepted one class", sampler.name());
    }
}
