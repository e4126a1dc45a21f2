//! Integration tests for CSV ingestion/egestion and config parsing.

use std::fs;
use std::path::PathBuf;
use std::str::FromStr;

use imbalance_sampling::config::{
    DistanceMetric, EnnConfig, FitnessMeasure, IpadeConfig, ModelType, SamplerConfig,
};
use imbalance_sampling::io::{read_csv, write_csv, CsvReaderConfig};
use imbalance_sampling::sampling::{EditedNearestNeighbours, Resampler};

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("imbalance_sampling_it_{}_{}", std::process::id(), name))
}

// ---------------------------------------------------------------------------
// CSV round trip
// ---------------------------------------------------------------------------

#[test]
fn csv_round_trip_preserves_names() {
    let input = temp_path("round_trip_in.csv");
    let output = temp_path("round_trip_out.csv");
    fs::write(
        &input,
        "width,shape,label\n1.5,circle,neg\n2.5,square,neg\n3.5,circle,pos\n4.5,triangle,neg\n",
    )
    .unwrap();

    let parsed = read_csv(&input, &CsvReaderConfig::default()).unwrap();
    assert_eq!(parsed.dataset.n_samples(), 4);
    assert_eq!(parsed.dataset.nominal, vec![false, true]);

    write_csv(&output, &parsed.dataset, &parsed.metadata).unwrap();
    let written = fs::read_to_string(&output).unwrap();
    let reread = read_csv(&output, &CsvReaderConfig::default()).unwrap();
    fs::remove_file(&input).ok();
    fs::remove_file(&output).ok();

    assert!(written.starts_with("width,shape,label\n"));
    assert!(written.contains("3.5,circle,pos"));
    assert_eq!(reread.dataset, parsed.dataset);
    assert_eq!(reread.metadata, parsed.metadata);
}

#[test]
fn csv_resample_and_write_back() {
    let input = temp_path("resample_in.csv");
    let output = temp_path("resample_out.csv");
    let mut contents = String::from("a,b,class\n");
    for i in 0..10 {
        contents.push_str(&format!("{},{},major\n", i as f64 * 0.1, 0.0));
    }
    contents.push_str("5.0,5.0,minor\n5.1,5.0,minor\n");
    fs::write(&input, contents).unwrap();

    let parsed = read_csv(&input, &CsvReaderConfig::default()).unwrap();
    let enn = EditedNearestNeighbours::new(EnnConfig {
        common: SamplerConfig::default().with_seed(1),
        k: 3,
    });
    let result = enn.fit_resample(&parsed.dataset).unwrap();
    write_csv(&output, &result.dataset, &parsed.metadata).unwrap();
    let written = fs::read_to_string(&output).unwrap();
    fs::remove_file(&input).ok();
    fs::remove_file(&output).ok();

    assert_eq!(written.lines().count(), result.dataset.n_samples() + 1);
    assert_eq!(written.matches("minor").count(), 2);
}

#[test]
fn csv_missing_file_is_an_error() {
    let err = read_csv(temp_path("does_not_exist.csv"), &CsvReaderConfig::default()).unwrap_err();
    assert!(err.to_string().contains("Failed to open CSV file"));
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[test]
fn config_enums_parse_from_strings() {
    assert_eq!(DistanceMetric::from_str("HVDM").unwrap(), DistanceMetric::Heterogeneous);
    assert_eq!(DistanceMetric::from_str("euclidean").unwrap(), DistanceMetric::Euclidean);
    assert!(DistanceMetric::from_str("cosine").is_err());
    assert_eq!(FitnessMeasure::from_str("auc").unwrap(), FitnessMeasure::Auc);
    assert!(matches!(ModelType::from_str("gbdt").unwrap(), ModelType::GBDT { .. }));
    assert!(matches!(ModelType::from_str("cart").unwrap(), ModelType::DecisionTree(_)));
    assert!(ModelType::from_str("svm").is_err());
}

#[test]
fn ipade_defaults() {
    let config = IpadeConfig::default();
    assert!(config.common.normalize);
    assert_eq!(config.strategy, 1);
    assert_eq!(config.measure, FitnessMeasure::Auc);
    assert!(config.random_choice);
}

#[test]
fn wall_clock_seed_when_unset() {
    let config = SamplerConfig::default();
    assert!(config.seed.is_none());
    assert_eq!(config.clone().with_seed(7).resolve_seed(), 7);
}
