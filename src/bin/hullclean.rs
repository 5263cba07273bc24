//! Command-line driver: load a cloud, peel its hull outliers, save the cleaned
//! cloud, and write a CSV report of the Chamfer distance and normal
//! consistency between the raw and cleaned clouds.
//!
//! Logging is controlled by `RUST_LOG` (default `info`).

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use hullclean::io::{self, LoadError, SaveError};
use hullclean::metrics::normal_consistency::NormalPairing;
use hullclean::pipeline::{
    EvaluationConfigBuilder, EvaluationConfigBuilderError, EvaluationError, evaluate,
};
use hullclean::report::{ReportError, write_report};
use thiserror::Error;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum PairingArg {
    /// Query normal against its nearest neighbor's normal.
    CrossSet,
    /// Reference normals re-indexed by the match (legacy scores).
    SelfIndexed,
}

impl From<PairingArg> for NormalPairing {
    fn from(arg: PairingArg) -> Self {
        match arg {
            PairingArg::CrossSet => Self::CrossSet,
            PairingArg::SelfIndexed => Self::SelfIndexed,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "hullclean")]
#[command(about = "Remove convex-hull outliers from a point cloud and score the result")]
struct Args {
    /// Input point cloud (.ply, .xyz, .xyzn, .txt)
    #[arg(long)]
    input_path: PathBuf,

    /// Maximum number of points per cloud used by each metric
    #[arg(long, default_value_t = 10_000)]
    max_points: usize,

    /// Subsampling seed
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Number of hull peeling passes
    #[arg(long, default_value_t = 1)]
    passes: usize,

    /// Neighborhood radius for normal estimation
    #[arg(long, default_value_t = 0.1)]
    normal_radius: f64,

    /// Maximum neighbors for normal estimation
    #[arg(long, default_value_t = 30)]
    normal_max_nn: usize,

    /// Which normals the normal consistency metric compares
    #[arg(long, value_enum, default_value_t = PairingArg::CrossSet)]
    normal_pairing: PairingArg,

    /// Where to write the cleaned cloud
    #[arg(long, default_value = "convex_pc.ply")]
    cleaned_output: PathBuf,

    /// Where to write the CSV report
    #[arg(long, default_value = "point_cloud_results.csv")]
    report: PathBuf,
}

#[derive(Debug, Error)]
enum CliError {
    #[error("invalid configuration: {0}")]
    Config(#[from] EvaluationConfigBuilderError),
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Evaluation(#[from] EvaluationError),
    #[error(transparent)]
    Save(#[from] SaveError),
    #[error(transparent)]
    Report(#[from] ReportError),
}

fn run(args: &Args) -> Result<(), CliError> {
    let config = EvaluationConfigBuilder::default()
        .max_points(args.max_points)
        .seed(args.seed)
        .passes(args.passes)
        .normal_radius(args.normal_radius)
        .normal_max_neighbors(args.normal_max_nn)
        .normal_pairing(args.normal_pairing.into())
        .build()?;

    let raw = io::load(&args.input_path)?;
    let evaluation = evaluate(&raw, &config)?;
    io::save(evaluation.hull.kept(), &args.cleaned_output)?;

    for (metric, err) in evaluation.failures() {
        tracing::error!(metric, error = %err, "metric failed; report not written");
    }
    let record = evaluation.report_record()?;
    write_report(&record, &args.report)?;

    println!(
        "original_size={} hull_size={} chamfer_distance={} normal_consistency={}",
        record.original_size, record.hull_size, record.chamfer_distance, record.normal_consistency
    );
    Ok(())
}

fn main() -> ExitCode {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "hullclean failed");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
