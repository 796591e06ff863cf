#![recursion_limit = "256"]

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use ml_npuzzle::ai::Device;
use ml_npuzzle::checkpoint::{CheckpointManager, FileCheckpointStore};
use ml_npuzzle::config::{AppConfig, MetricsFormat};
use ml_npuzzle::puzzle::Environment;
use ml_npuzzle::training::metrics::{JsonlSink, MetricsSink, NullSink, TensorboardSink};
use ml_npuzzle::training::trainer::Trainer;

/// Train an N-puzzle cost-to-go network by approximate value iteration.
#[derive(Parser)]
#[command(name = "train", about = "Train an N-puzzle cost-to-go network")]
struct Cli {
    /// Path to TOML configuration file
    #[arg(short, long)]
    config: PathBuf,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let config = AppConfig::load(&cli.config)
        .with_context(|| format!("loading config from {}", cli.config.display()))?;
    let env = config.environment().context("building puzzle environment")?;
    let net_config = config.network_config(env.encoded_len());

    let device = Device::default();
    log::info!("device: {:?}", device);
    log::info!("run: {}", config.train_name());

    let store = FileCheckpointStore::new(config.save_path());
    let checkpoints = CheckpointManager::new(config.checkpoint.interval, Box::new(store));
    let metrics: Box<dyn MetricsSink> = match config.checkpoint.metrics {
        MetricsFormat::Tensorboard => Box::new(TensorboardSink::open(&config.log_path())),
        MetricsFormat::Jsonl => Box::new(JsonlSink::open(&config.log_path())),
        MetricsFormat::Off => Box::new(NullSink),
    };

    let mut trainer = Trainer::new(
        config.training.clone(),
        env,
        &net_config,
        device,
        checkpoints,
        metrics,
    )
    .context("initializing trainer")?;

    let report = trainer.run().context("training")?;
    log::info!(
        "finished {} epochs, {} checkpoints saved",
        report.epochs.len(),
        report.saves
    );
    Ok(())
}
