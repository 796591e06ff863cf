use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::ai::networks::CostNetworkConfig;
use crate::error::ConfigError;
use crate::puzzle::SlidingPuzzle;

/// Puzzle selection.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct PuzzleConfig {
    /// Numbered tiles, excluding the blank (15 for the 4x4 puzzle).
    pub size: usize,
}

impl Default for PuzzleConfig {
    fn default() -> Self {
        PuzzleConfig { size: 15 }
    }
}

/// Cost network shape.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub hidden_size: usize,
    pub num_hidden_layers: usize,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        NetworkConfig {
            hidden_size: 256,
            num_hidden_layers: 2,
        }
    }
}

/// Epoch loop hyperparameters.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct TrainerConfig {
    pub num_epochs: usize,
    pub scrambles_per_epoch: usize,
    pub scramble_depth: usize,
    /// Generation workers per epoch.
    pub num_procs: usize,
    /// Batch loader threads, 0 gathers batches inline.
    pub num_workers: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
    /// Target-network blend factor.
    pub tau: f32,
    pub generation_timeout_secs: u64,
    /// Extra generation attempts before an epoch is abandoned.
    pub generation_retries: usize,
    /// Recent losses kept in memory for reporting.
    pub loss_window: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        TrainerConfig {
            num_epochs: 1000,
            scrambles_per_epoch: 10_000,
            scramble_depth: 30,
            num_procs: 4,
            num_workers: 2,
            batch_size: 256,
            learning_rate: 1e-3,
            tau: 0.05,
            generation_timeout_secs: 600,
            generation_retries: 0,
            loss_window: 1000,
            seed: None,
        }
    }
}

impl TrainerConfig {
    pub fn generation_timeout(&self) -> Duration {
        Duration::from_secs(self.generation_timeout_secs)
    }
}

/// Format of the per-run scalar log under `log_dir`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricsFormat {
    #[default]
    Tensorboard,
    Jsonl,
    Off,
}

/// Where checkpoints and metrics go, and how often.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct CheckpointConfig {
    pub interval: usize,
    pub save_dir: PathBuf,
    pub log_dir: PathBuf,
    pub metrics: MetricsFormat,
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        CheckpointConfig {
            interval: 10,
            save_dir: PathBuf::from("saves"),
            log_dir: PathBuf::from("runs"),
            metrics: MetricsFormat::default(),
        }
    }
}

/// Top-level application configuration, loadable from TOML.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub puzzle: PuzzleConfig,
    pub network: NetworkConfig,
    pub training: TrainerConfig,
    pub checkpoint: CheckpointConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: AppConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if SlidingPuzzle::new(self.puzzle.size).is_none() {
            return Err(ConfigError::Validation(format!(
                "puzzle.size + 1 must be a square board of side >= 2, got {}",
                self.puzzle.size
            )));
        }
        if self.network.hidden_size == 0 {
            return Err(ConfigError::Validation(
                "network.hidden_size must be > 0".into(),
            ));
        }

        let t = &self.training;
        if t.num_epochs == 0 {
            return Err(ConfigError::Validation(
                "training.num_epochs must be > 0".into(),
            ));
        }
        if t.num_procs == 0 {
            return Err(ConfigError::Validation(
                "training.num_procs must be >= 1".into(),
            ));
        }
        if t.scrambles_per_epoch < t.num_procs {
            return Err(ConfigError::Validation(
                "training.scrambles_per_epoch must be >= training.num_procs".into(),
            ));
        }
        if t.batch_size == 0 {
            return Err(ConfigError::Validation(
                "training.batch_size must be > 0".into(),
            ));
        }
        if t.learning_rate <= 0.0 {
            return Err(ConfigError::Validation(
                "training.learning_rate must be > 0".into(),
            ));
        }
        if !(t.tau > 0.0 && t.tau <= 1.0) {
            return Err(ConfigError::Validation(
                "training.tau must be in (0, 1]".into(),
            ));
        }
        if t.generation_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "training.generation_timeout_secs must be > 0".into(),
            ));
        }
        if t.loss_window == 0 {
            return Err(ConfigError::Validation(
                "training.loss_window must be > 0".into(),
            ));
        }

        if self.checkpoint.interval == 0 {
            return Err(ConfigError::Validation(
                "checkpoint.interval must be > 0".into(),
            ));
        }

        Ok(())
    }

    /// Run name derived from the hyperparameters that distinguish runs.
    /// Dots are replaced so the name is safe as a file stem.
    pub fn train_name(&self) -> String {
        let t = &self.training;
        format!(
            "puzzle{}-d{}-s{}-lr{}-tau{}",
            self.puzzle.size, t.scramble_depth, t.scrambles_per_epoch, t.learning_rate, t.tau
        )
        .replace('.', "p")
    }

    /// Checkpoint location, without the recorder's extension.
    pub fn save_path(&self) -> PathBuf {
        self.checkpoint.save_dir.join(self.train_name())
    }

    /// Metrics directory for this run.
    pub fn log_path(&self) -> PathBuf {
        self.checkpoint.log_dir.join(self.train_name())
    }

    pub fn environment(&self) -> Result<SlidingPuzzle, ConfigError> {
        SlidingPuzzle::new(self.puzzle.size).ok_or_else(|| {
            ConfigError::Validation(format!("unsupported puzzle.size {}", self.puzzle.size))
        })
    }

    /// Network config for this puzzle's encoding.
    pub fn network_config(&self, input_size: usize) -> CostNetworkConfig {
        CostNetworkConfig::new(input_size)
            .with_hidden_size(self.network.hidden_size)
            .with_num_hidden_layers(self.network.num_hidden_layers)
    }

    /// Generate a TOML string with all default values (useful for creating
    /// example config files).
    pub fn default_toml() -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(&AppConfig::default())
    }
}
