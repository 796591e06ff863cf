use std::path::PathBuf;
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::ai::networks::{CostNetwork, CostNetworkConfig};
use crate::ai::sync::{hard_copy, soft_update};
use crate::ai::{Device, InferBackend};
use crate::checkpoint::{CheckpointManager, CheckpointOutcome};
use crate::config::TrainerConfig;
use crate::error::{GenerationError, TrainingError};
use crate::puzzle::Environment;
use crate::training::dataset::TrainingSet;
use crate::training::generation::GenerationCoordinator;
use crate::training::learner::Learner;
use crate::training::loader::BatchLoader;
use crate::training::metrics::{format_hms, LossHistory, MetricsSink};

/// Where the epoch loop currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EpochPhase {
    Idle,
    Generating,
    Training,
    Syncing,
    Checkpointing,
    Done,
}

/// What one epoch did.
#[derive(Debug, Clone)]
pub struct EpochSummary {
    pub epoch: usize,
    pub scrambles: usize,
    pub batches: usize,
    pub avg_loss: f32,
    /// Mean of the last `loss_window` mini-batch losses, across epochs.
    pub recent_loss: f32,
    pub generation_time: Duration,
    pub train_time: Duration,
    pub checkpoint: Option<PathBuf>,
}

/// What a full run did.
#[derive(Debug, Clone)]
pub struct TrainingReport {
    pub epochs: Vec<EpochSummary>,
    pub total_losses: usize,
    pub recent_loss: f32,
    pub saves: usize,
    pub elapsed: Duration,
}

/// Approximate value iteration: each epoch the target network labels fresh
/// scrambles, the live network is fit to them, and the target is pulled
/// toward the live network.
///
/// Epochs run strictly in sequence; within an epoch generation, training,
/// synchronization and the checkpoint decision never overlap.
pub struct Trainer<E: Environment> {
    config: TrainerConfig,
    env: E,
    device: Device,
    learner: Learner,
    target: CostNetwork<InferBackend>,
    coordinator: GenerationCoordinator,
    loader: BatchLoader,
    checkpoints: CheckpointManager,
    metrics: Box<dyn MetricsSink>,
    history: LossHistory,
    rng: StdRng,
    phase: EpochPhase,
    epoch: usize,
}

impl<E: Environment> Trainer<E> {
    /// Build live and target networks; the target starts as an exact copy.
    pub fn new(
        config: TrainerConfig,
        env: E,
        net_config: &CostNetworkConfig,
        device: Device,
        checkpoints: CheckpointManager,
        metrics: Box<dyn MetricsSink>,
    ) -> Result<Self, TrainingError> {
        let learner = Learner::new(net_config, config.learning_rate, device.clone());
        let target = hard_copy(net_config.init::<InferBackend>(&device), &learner.snapshot())?;
        let coordinator =
            GenerationCoordinator::new(config.num_procs, config.generation_timeout());
        let loader = BatchLoader::new(config.batch_size, config.num_workers);
        let history = LossHistory::with_capacity(config.loss_window);
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        Ok(Trainer {
            config,
            env,
            device,
            learner,
            target,
            coordinator,
            loader,
            checkpoints,
            metrics,
            history,
            rng,
            phase: EpochPhase::Idle,
            epoch: 0,
        })
    }

    pub fn phase(&self) -> EpochPhase {
        self.phase
    }

    /// Epochs completed so far.
    pub fn epoch(&self) -> usize {
        self.epoch
    }

    /// Inference copy of the live network.
    pub fn live_network(&self) -> CostNetwork<InferBackend> {
        self.learner.snapshot()
    }

    pub fn target_network(&self) -> &CostNetwork<InferBackend> {
        &self.target
    }

    pub fn loss_history(&self) -> &LossHistory {
        &self.history
    }

    /// Run the configured number of epochs.
    pub fn run(&mut self) -> Result<TrainingReport, TrainingError> {
        let start = Instant::now();
        let mut epochs = Vec::with_capacity(self.config.num_epochs);

        for _ in 0..self.config.num_epochs {
            epochs.push(self.run_epoch()?);
        }

        self.enter(EpochPhase::Done);
        self.metrics.flush();
        let elapsed = start.elapsed();
        log::info!("Training Time is {}", format_hms(elapsed));

        Ok(TrainingReport {
            epochs,
            total_losses: self.history.total(),
            recent_loss: self.history.average(self.config.loss_window),
            saves: self.checkpoints.saves(),
            elapsed,
        })
    }

    /// Generate, train, sync, and maybe checkpoint: one full epoch.
    pub fn run_epoch(&mut self) -> Result<EpochSummary, TrainingError> {
        let epoch = self.epoch + 1;

        self.enter(EpochPhase::Generating);
        let gen_start = Instant::now();
        let set = self.generate()?;
        let generation_time = gen_start.elapsed();
        log::info!("Generation time is {:.3} seconds", generation_time.as_secs_f64());
        let scrambles = set.len();

        self.enter(EpochPhase::Training);
        let train_start = Instant::now();
        let loss = self.learner.train_epoch(
            set,
            &self.loader,
            &mut self.history,
            self.metrics.as_mut(),
            &mut self.rng,
        )?;
        let train_time = train_start.elapsed();

        self.enter(EpochPhase::Syncing);
        self.target = soft_update(self.target.clone(), &self.learner.snapshot(), self.config.tau)?;

        self.epoch = epoch;
        let recent_loss = self.history.average(self.config.loss_window);
        log::info!(
            "Epoch: {}/{} | loss: {:.4} | recent loss: {:.4} | batches: {}",
            epoch,
            self.config.num_epochs,
            loss.average,
            recent_loss,
            loss.batches
        );
        self.metrics.record("epoch/avg_loss", epoch, loss.average as f64);
        self.metrics.record("epoch/recent_loss", epoch, recent_loss as f64);
        self.metrics
            .record("epoch/generation_secs", epoch, generation_time.as_secs_f64());
        self.metrics
            .record("epoch/train_secs", epoch, train_time.as_secs_f64());

        self.enter(EpochPhase::Checkpointing);
        let checkpoint = match self.checkpoints.maybe_save(&self.learner.snapshot(), epoch) {
            CheckpointOutcome::Saved(path) => Some(path),
            CheckpointOutcome::Skipped | CheckpointOutcome::Failed(_) => None,
        };

        self.enter(EpochPhase::Idle);
        Ok(EpochSummary {
            epoch,
            scrambles,
            batches: loss.batches,
            avg_loss: loss.average,
            recent_loss,
            generation_time,
            train_time,
            checkpoint,
        })
    }

    /// Generation with up to `generation_retries` extra attempts.
    fn generate(&mut self) -> Result<TrainingSet, GenerationError> {
        let mut attempt = 0;
        loop {
            let result = self.coordinator.generate(
                &self.env,
                &self.target,
                &self.device,
                self.config.scrambles_per_epoch,
                self.config.scramble_depth,
                &mut self.rng,
            );
            match result {
                Ok(set) => return Ok(set),
                Err(e) if attempt < self.config.generation_retries => {
                    attempt += 1;
                    log::warn!(
                        "generation failed ({}), retrying ({}/{})",
                        e,
                        attempt,
                        self.config.generation_retries
                    );
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn enter(&mut self, phase: EpochPhase) {
        log::debug!("epoch {}: {:?} -> {:?}", self.epoch + 1, self.phase, phase);
        self.phase = phase;
    }
}
