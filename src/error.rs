use std::path::PathBuf;
use std::time::Duration;

/// Errors that can occur during checkpoint operations.
#[derive(Debug, thiserror::Error)]
pub enum CheckpointError {
    #[error("failed to create checkpoint directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to save model: {0}")]
    ModelSave(String),

    #[error("failed to load model: {0}")]
    ModelLoad(String),
}

/// Errors raised while producing an epoch's training set.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("failed to spawn generation worker: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("generation timed out after {waited:?}: {received}/{expected} workers reported")]
    Timeout {
        received: usize,
        expected: usize,
        waited: Duration,
    },

    #[error("generation workers exited early: {received}/{expected} workers reported")]
    WorkersLost { received: usize, expected: usize },

    #[error("generation worker {worker} failed: {reason}")]
    Worker { worker: usize, reason: String },

    #[error("generation worker {worker} was cancelled")]
    Cancelled { worker: usize },

    #[error("generation worker {worker} panicked")]
    WorkerPanicked { worker: usize },

    #[error("labeling failed: {0}")]
    Labeling(String),
}

/// Errors raised by the target synchronizer.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("blend factor tau must be in (0, 1], got {0}")]
    InvalidTau(f32),

    #[error("parameter count mismatch: target has {target}, live has {live}")]
    ParameterCount { target: usize, live: usize },

    #[error("parameter {index} shape mismatch: target {target:?}, live {live:?}")]
    ShapeMismatch {
        index: usize,
        target: Vec<usize>,
        live: Vec<usize>,
    },
}

/// Errors that abort a training run.
#[derive(Debug, thiserror::Error)]
pub enum TrainingError {
    #[error("generation error: {0}")]
    Generation(#[from] GenerationError),

    #[error("target sync error: {0}")]
    Sync(#[from] SyncError),

    #[error("training set is empty")]
    EmptyTrainingSet,

    #[error("batch loader error: {0}")]
    Loader(#[from] std::io::Error),

    #[error("tensor data error: {0}")]
    TensorData(String),
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("config validation error: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_timeout_display() {
        let err = GenerationError::Timeout {
            received: 1,
            expected: 2,
            waited: Duration::from_millis(250),
        };
        assert_eq!(
            err.to_string(),
            "generation timed out after 250ms: 1/2 workers reported"
        );
    }

    #[test]
    fn test_sync_error_display() {
        let err = SyncError::ShapeMismatch {
            index: 3,
            target: vec![16, 8],
            live: vec![16, 4],
        };
        assert_eq!(
            err.to_string(),
            "parameter 3 shape mismatch: target [16, 8], live [16, 4]"
        );
    }

    #[test]
    fn test_training_error_wraps_generation() {
        let err: TrainingError = GenerationError::WorkersLost {
            received: 0,
            expected: 4,
        }
        .into();
        assert_eq!(
            err.to_string(),
            "generation error: generation workers exited early: 0/4 workers reported"
        );
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::Validation("training.tau must be in (0, 1]".to_string());
        assert_eq!(
            err.to_string(),
            "config validation error: training.tau must be in (0, 1]"
        );
    }
}
