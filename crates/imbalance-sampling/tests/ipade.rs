//! Integration tests for the IPADE prototype generator.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use imbalance_sampling::config::{
    DistanceMetric, FitnessMeasure, IpadeConfig, ModelConfig, SamplerConfig,
};
use imbalance_sampling::data_handling::{Dataset, Label};
use imbalance_sampling::error::Result;
use imbalance_sampling::models::ClassifierModel;
use imbalance_sampling::oracle::{ClassifierOracle, FitnessOracle};
use imbalance_sampling::sampling::{Ipade, Resampler};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Two gaussian-ish blobs, the second one small.
fn blobs(seed: u64) -> Dataset {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut values = Vec::new();
    let mut labels = Vec::new();
    for (label, centre, count) in [(0, 2.0, 24), (1, 6.0, 8)] {
        for _ in 0..count {
            values.push(centre + rng.gen_range(-1.5..1.5));
            values.push(centre + rng.gen_range(-1.5..1.5));
            labels.push(label as Label);
        }
    }
    let x = Array2::from_shape_vec((labels.len(), 2), values).unwrap();
    Dataset::continuous(x, labels).unwrap()
}

fn config(seed: u64, strategy: u8) -> IpadeConfig {
    IpadeConfig {
        common: SamplerConfig {
            normalize: true,
            randomize_order: true,
            ..SamplerConfig::default().with_seed(seed)
        },
        iterations: 10,
        strategy,
        ..IpadeConfig::default()
    }
}

/// Oracle that counts how often it trains.
struct CountingOracle {
    inner: ClassifierOracle,
    trained: Arc<AtomicUsize>,
}

impl FitnessOracle for CountingOracle {
    fn measure(&self) -> FitnessMeasure {
        self.inner.measure()
    }

    fn train(&self, x: &Array2<f64>, y: &[Label]) -> Result<Box<dyn ClassifierModel>> {
        self.trained.fetch_add(1, Ordering::SeqCst);
        self.inner.train(x, y)
    }
}

// ---------------------------------------------------------------------------
// Determinism
// ---------------------------------------------------------------------------

#[test]
fn same_seed_gives_identical_prototypes() {
    init_logger();
    let data = blobs(1);
    for strategy in 1..=4 {
        let first = Ipade::new(config(99, strategy)).fit_resample(&data).unwrap();
        let second = Ipade::new(config(99, strategy)).fit_resample(&data).unwrap();
        assert_eq!(first.dataset, second.dataset, "strategy {}", strategy);
        assert_eq!(first.dataset.y, second.dataset.y);
    }
}

// ---------------------------------------------------------------------------
// Output shape
// ---------------------------------------------------------------------------

#[test]
fn prototypes_are_synthesised_for_every_class() {
    let data = blobs(2);
    let result = Ipade::new(config(5, 2)).fit_resample(&data).unwrap();
    assert!(result.indices.is_none());
    assert_eq!(result.dataset.n_features(), 2);
    assert_eq!(result.dataset.class_partition().labels(), vec![0, 1]);
    assert!(result.dataset.n_samples() < data.n_samples());
}

#[test]
fn nominal_attributes_keep_known_codes() {
    let mut rng = StdRng::seed_from_u64(4);
    let mut rows = Vec::new();
    let mut labels = Vec::new();
    for i in 0..30 {
        let label = if i < 22 { 0 } else { 1 };
        let colour = if label == 0 { rng.gen_range(0..2) } else { 2 };
        rows.push(vec![rng.gen::<f64>() + label as f64 * 3.0, colour as f64]);
        labels.push(label);
    }
    let data = Dataset::from_rows(&rows, labels, vec![false, true]).unwrap();
    let mut config = config(8, 1);
    config.common.distance = DistanceMetric::Heterogeneous;

    let result = Ipade::new(config).fit_resample(&data).unwrap();
    assert_eq!(result.dataset.nominal, vec![false, true]);
    for row in result.dataset.x.rows() {
        assert!([0.0, 1.0, 2.0].contains(&row[1]), "unexpected nominal code {}", row[1]);
    }
}

// ---------------------------------------------------------------------------
// Parameters and oracle seam
// ---------------------------------------------------------------------------

#[test]
fn invalid_strategy_trains_nothing() {
    let trained = Arc::new(AtomicUsize::new(0));
    let oracle = CountingOracle {
        inner: ClassifierOracle::new(ModelConfig::default(), FitnessMeasure::Auc),
        trained: Arc::clone(&trained),
    };
    let err = Ipade::with_oracle(config(1, 5), Box::new(oracle))
        .fit_resample(&blobs(3))
        .unwrap_err();
    assert!(err.is_invalid_parameter());
    assert_eq!(trained.load(Ordering::SeqCst), 0);
}

#[test]
fn custom_oracle_drives_the_search() {
    let trained = Arc::new(AtomicUsize::new(0));
    let oracle = CountingOracle {
        inner: ClassifierOracle::new(ModelConfig::default(), FitnessMeasure::Accuracy),
        trained: Arc::clone(&trained),
    };
    let result = Ipade::with_oracle(config(2, 1), Box::new(oracle))
        .fit_resample(&blobs(3))
        .unwrap();
    assert!(result.dataset.n_samples() >= 2);
    assert!(trained.load(Ordering::SeqCst) > 10);
}
