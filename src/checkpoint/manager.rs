use std::fs;
use std::path::{Path, PathBuf};

use burn::prelude::*;
use burn::record::DefaultRecorder;

use crate::ai::networks::{CostNetwork, CostNetworkConfig};
use crate::ai::{Device, InferBackend};
use crate::error::CheckpointError;

/// Extension Burn's default recorder gives its files.
const CHECKPOINT_EXTENSION: &str = "mpk";

/// Durable storage for live-network snapshots.
pub trait CheckpointStore {
    /// Persist `network`, replacing any previous snapshot. Returns the file
    /// written.
    fn save(&mut self, network: &CostNetwork<InferBackend>) -> Result<PathBuf, CheckpointError>;
}

/// Single overwrite-in-place file per run, written with Burn's default
/// recorder. The recorder replaces any extension on `base` with its own, so
/// the file stem must not contain dots.
#[derive(Debug, Clone)]
pub struct FileCheckpointStore {
    base: PathBuf,
}

impl FileCheckpointStore {
    pub fn new(base: PathBuf) -> Self {
        FileCheckpointStore { base }
    }

    /// Path the recorder actually writes.
    pub fn file_path(&self) -> PathBuf {
        self.base.with_extension(CHECKPOINT_EXTENSION)
    }
}

impl CheckpointStore for FileCheckpointStore {
    fn save(&mut self, network: &CostNetwork<InferBackend>) -> Result<PathBuf, CheckpointError> {
        if let Some(parent) = self.base.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| CheckpointError::CreateDir {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
        let recorder = DefaultRecorder::default();
        network
            .clone()
            .save_file(self.base.clone(), &recorder)
            .map_err(|e| CheckpointError::ModelSave(e.to_string()))?;
        Ok(self.file_path())
    }
}

/// Load a snapshot written by [`FileCheckpointStore`] into a fresh network.
pub fn load_network(
    base: &Path,
    config: &CostNetworkConfig,
    device: &Device,
) -> Result<CostNetwork<InferBackend>, CheckpointError> {
    let recorder = DefaultRecorder::default();
    config
        .init::<InferBackend>(device)
        .load_file(base.to_path_buf(), &recorder, device)
        .map_err(|e| CheckpointError::ModelLoad(e.to_string()))
}

/// Whether `epoch` falls on the checkpoint cadence.
pub fn should_save(epoch: usize, interval: usize) -> bool {
    interval > 0 && epoch % interval == 0
}

/// Result of a checkpoint decision.
#[derive(Debug)]
pub enum CheckpointOutcome {
    Skipped,
    Saved(PathBuf),
    Failed(CheckpointError),
}

/// Saves the live network every `interval` epochs. Save failures are logged
/// and reported, never propagated: training state in memory is untouched.
pub struct CheckpointManager {
    interval: usize,
    store: Box<dyn CheckpointStore>,
    saves: usize,
}

impl CheckpointManager {
    pub fn new(interval: usize, store: Box<dyn CheckpointStore>) -> Self {
        CheckpointManager {
            interval,
            store,
            saves: 0,
        }
    }

    /// Successful saves so far.
    pub fn saves(&self) -> usize {
        self.saves
    }

    pub fn maybe_save(
        &mut self,
        network: &CostNetwork<InferBackend>,
        epoch: usize,
    ) -> CheckpointOutcome {
        if !should_save(epoch, self.interval) {
            return CheckpointOutcome::Skipped;
        }
        log::info!("Saving model");
        match self.store.save(network) {
            Ok(path) => {
                self.saves += 1;
                log::info!("checkpoint saved: {}", path.display());
                CheckpointOutcome::Saved(path)
            }
            Err(e) => {
                log::warn!("checkpoint failed at epoch {}: {}", epoch, e);
                CheckpointOutcome::Failed(e)
            }
        }
    }
}
