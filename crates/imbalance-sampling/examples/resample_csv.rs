use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{anyhow, Result};
use clap::{Arg, ArgMatches, Command, ValueHint};
use log::LevelFilter;

use imbalance_sampling::config::{
    DistanceMetric, EnnConfig, IpadeConfig, NclConfig, NearMissConfig, SamplerConfig,
};
use imbalance_sampling::io::{read_csv, write_csv, CsvReaderConfig};
use imbalance_sampling::sampling::{
    EditedNearestNeighbours, Ipade, NearMiss, NeighbourhoodCleaningRule, Resampler,
};

fn parse_metric(value: &str) -> std::result::Result<DistanceMetric, String> {
    DistanceMetric::from_str(value)
}

fn cli() -> Command {
    Command::new("resample_csv")
        .version(clap::crate_version!())
        .about("Resample a labelled CSV file with a neighbourhood rule or IPADE")
        .arg(
            Arg::new("algorithm")
                .help("Resampling algorithm to run")
                .required(true)
                .value_parser(["enn", "nm1", "nm2", "nm3", "ncl", "ipade"])
                .value_hint(ValueHint::Other),
        )
        .arg(
            Arg::new("input")
                .help("Input CSV file, last column is the label")
                .required(true)
                .value_parser(clap::value_parser!(PathBuf))
                .value_hint(ValueHint::FilePath),
        )
        .arg(
            Arg::new("output")
                .help("Path the resampled CSV is written to")
                .required(true)
                .value_parser(clap::value_parser!(PathBuf))
                .value_hint(ValueHint::FilePath),
        )
        .arg(
            Arg::new("seed")
                .short('s')
                .long("seed")
                .help("Random seed. Defaults to the wall clock.")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new("metric")
                .short('m')
                .long("metric")
                .help("Distance metric: euclidean or hvdm")
                .default_value("euclidean")
                .value_parser(parse_metric),
        )
}

fn build_sampler(algorithm: &str, common: SamplerConfig) -> Result<Box<dyn Resampler>> {
    let sampler: Box<dyn Resampler> = match algorithm {
        "enn" => Box::new(EditedNearestNeighbours::new(EnnConfig {
            common,
            ..EnnConfig::default()
        })),
        "nm1" | "nm2" | "nm3" => Box::new(NearMiss::new(NearMissConfig {
            common,
            version: algorithm[2..].parse()?,
            ..NearMissConfig::default()
        })),
        "ncl" => Box::new(NeighbourhoodCleaningRule::new(NclConfig {
            common,
            ..NclConfig::default()
        })),
        "ipade" => Box::new(Ipade::new(IpadeConfig {
            common: SamplerConfig {
                normalize: true,
                ..common
            },
            ..IpadeConfig::default()
        })),
        other => return Err(anyhow!("Unknown algorithm: {}", other)),
    };
    Ok(sampler)
}

fn run(matches: &ArgMatches) -> Result<()> {
    let algorithm: &String = matches
        .get_one("algorithm")
        .ok_or_else(|| anyhow!("missing algorithm"))?;
    let input: &PathBuf = matches
        .get_one("input")
        .ok_or_else(|| anyhow!("missing input path"))?;
    let output: &PathBuf = matches
        .get_one("output")
        .ok_or_else(|| anyhow!("missing output path"))?;

    let common = SamplerConfig {
        verbose: true,
        seed: matches.get_one::<u64>("seed").copied(),
        distance: matches
            .get_one::<DistanceMetric>("metric")
            .copied()
            .unwrap_or_default(),
        ..SamplerConfig::default()
    };

    let csv = read_csv(input, &CsvReaderConfig::default())?;
    csv.dataset.log_input_data_summary();

    let sampler = build_sampler(algorithm, common)?;
    let result = sampler.fit_resample(&csv.dataset)?;
    write_csv(output, &result.dataset, &csv.metadata)?;
    log::info!(
        "Wrote {} rows to {}",
        result.dataset.n_samples(),
        output.display()
    );
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::default()
        .filter_level(LevelFilter::Error)
        .parse_env(env_logger::Env::default().filter_or("RUST_LOG", "imbalance_sampling=info"))
        .init();

    let matches = cli().get_matches();
    run(&matches)
}
