//! Batch training job: preprocess a raw waste table, fit a model, and
//! persist the artifact set the service loads.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use waste_forecast::artifacts::ArtifactPaths;
use waste_forecast::preprocess::{export_matrix, preprocess};
use waste_forecast::training::{train_and_persist, TrainingConfig};

#[derive(Debug, Parser)]
#[command(name = "train", about = "Fit a food waste model from a raw CSV batch")]
struct Args {
    /// Raw training CSV
    raw: PathBuf,

    /// Directory receiving bundle.json, scaler.json and snapshot.json
    #[arg(long, default_value = "artifacts")]
    artifacts: PathBuf,

    /// Optional processed feature-matrix CSV export
    #[arg(long)]
    processed: Option<PathBuf>,

    /// Randomized search draws
    #[arg(long, default_value_t = 10)]
    search_iterations: usize,

    /// Seed for the split, fold assignment, and search
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let prepared = preprocess(&args.raw).context("preprocessing failed")?;
    if let Some(path) = &args.processed {
        export_matrix(&prepared.matrix, path).context("processed matrix export failed")?;
    }

    let config = TrainingConfig {
        search_iterations: args.search_iterations,
        seed: args.seed,
        ..TrainingConfig::default()
    };
    let paths = ArtifactPaths::new(&args.artifacts);
    let outcome = train_and_persist(&prepared, &config, &paths).context("training failed")?;

    println!("{}", outcome.artifacts.bundle.metrics);
    Ok(())
}
