use std::sync::Arc;

use burn::module::AutodiffModule;
use burn::optim::adaptor::OptimizerAdaptor;
use burn::optim::{Adam, AdamConfig, GradientsParams, Optimizer};
use burn::prelude::*;
use rand::rngs::StdRng;

use crate::ai::networks::{CostNetwork, CostNetworkConfig};
use crate::ai::state_encoding::rows_to_tensor;
use crate::ai::{Device, InferBackend, TrainBackend};
use crate::error::TrainingError;
use crate::training::dataset::TrainingSet;
use crate::training::loader::{BatchLoader, MiniBatch};
use crate::training::metrics::{LossHistory, MetricsSink};

/// Outcome of one pass over a training set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpochLoss {
    pub average: f32,
    pub batches: usize,
}

/// Live network plus Adam optimizer state.
pub struct Learner {
    network: CostNetwork<TrainBackend>,
    optimizer: OptimizerAdaptor<Adam, CostNetwork<TrainBackend>, TrainBackend>,
    learning_rate: f64,
    device: Device,
    steps: usize,
}

impl Learner {
    pub fn new(net_config: &CostNetworkConfig, learning_rate: f64, device: Device) -> Self {
        let network: CostNetwork<TrainBackend> = net_config.init(&device);
        Self::from_network(network, learning_rate, device)
    }

    /// Start from an existing network, with fresh optimizer state.
    pub fn from_network(
        network: CostNetwork<TrainBackend>,
        learning_rate: f64,
        device: Device,
    ) -> Self {
        Learner {
            network,
            optimizer: AdamConfig::new().init(),
            learning_rate,
            device,
            steps: 0,
        }
    }

    /// Inference copy of the live network.
    pub fn snapshot(&self) -> CostNetwork<InferBackend> {
        self.network.valid()
    }

    /// Total optimizer steps taken.
    pub fn steps(&self) -> usize {
        self.steps
    }

    /// One shuffled pass over `set`: a forward, MSE loss, backward and Adam
    /// step per mini-batch. Every mini-batch loss is appended to `history`.
    pub fn train_epoch(
        &mut self,
        set: TrainingSet,
        loader: &BatchLoader,
        history: &mut LossHistory,
        metrics: &mut dyn MetricsSink,
        rng: &mut StdRng,
    ) -> Result<EpochLoss, TrainingError> {
        if set.is_empty() {
            return Err(TrainingError::EmptyTrainingSet);
        }
        let features = set.features();
        let mut sum = 0.0f32;
        let mut batches = 0usize;
        for batch in loader.batches(Arc::new(set), rng)? {
            let loss = self.train_step(batch, features)?;
            history.record(loss);
            metrics.record("loss", self.steps, loss as f64);
            sum += loss;
            batches += 1;
        }
        Ok(EpochLoss {
            average: sum / batches as f32,
            batches,
        })
    }

    fn train_step(&mut self, batch: MiniBatch, features: usize) -> Result<f32, TrainingError> {
        let rows = batch.len();
        let inputs = rows_to_tensor::<TrainBackend>(batch.inputs, features, &self.device);
        let targets = rows_to_tensor::<TrainBackend>(batch.labels, 1, &self.device);

        let predictions = self.network.forward(inputs);
        debug_assert_eq!(predictions.dims(), [rows, 1]);

        // MSE loss
        let diff = predictions - targets;
        let loss = (diff.clone() * diff).mean();

        let loss_val = loss
            .clone()
            .into_data()
            .to_vec::<f32>()
            .map_err(|e| TrainingError::TensorData(format!("{e:?}")))?
            .first()
            .copied()
            .ok_or_else(|| TrainingError::TensorData("empty loss tensor".into()))?;

        let grads = loss.backward();
        let grads = GradientsParams::from_grads(grads, &self.network);

        // Optimizer step: consumes the network, returns the updated one
        self.network = self
            .optimizer
            .step(self.learning_rate, self.network.clone(), grads);
        self.steps += 1;

        Ok(loss_val)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::sync::parameters;
    use crate::training::dataset::GeneratedBatch;
    use crate::training::metrics::NullSink;
    use rand::{Rng, SeedableRng};

    fn config() -> CostNetworkConfig {
        CostNetworkConfig::new(4).with_hidden_size(16)
    }

    /// Rows of 4 features labelled with their sum.
    fn linear_batch(rows: usize, seed: u64) -> GeneratedBatch {
        let mut rng = StdRng::seed_from_u64(seed);
        let inputs: Vec<f32> = (0..rows * 4).map(|_| rng.random_range(0.0..1.0)).collect();
        let labels = inputs.chunks(4).map(|r| r.iter().sum()).collect();
        GeneratedBatch { inputs, labels }
    }

    fn linear_set(rows: usize, seed: u64) -> TrainingSet {
        TrainingSet::concat(4, vec![linear_batch(rows, seed)])
    }

    #[test]
    fn test_epoch_records_one_loss_per_batch() {
        let mut learner = Learner::new(&config(), 1e-3, Default::default());
        let loader = BatchLoader::new(16, 0);
        let mut history = LossHistory::new();
        let mut rng = StdRng::seed_from_u64(0);

        let first = learner
            .train_epoch(linear_set(100, 1), &loader, &mut history, &mut NullSink, &mut rng)
            .unwrap();
        assert_eq!(first.batches, 7);
        assert_eq!(history.total(), 7);

        let second = learner
            .train_epoch(linear_set(40, 2), &loader, &mut history, &mut NullSink, &mut rng)
            .unwrap();
        assert_eq!(second.batches, 3);
        assert_eq!(history.total(), 10);
        assert_eq!(learner.steps(), 10);
    }

    #[test]
    fn test_training_changes_parameters() {
        let mut learner = Learner::new(&config(), 1e-2, Default::default());
        let before = parameters(&learner.snapshot());
        let mut rng = StdRng::seed_from_u64(0);
        learner
            .train_epoch(
                linear_set(32, 3),
                &BatchLoader::new(8, 0),
                &mut LossHistory::new(),
                &mut NullSink,
                &mut rng,
            )
            .unwrap();
        let after = parameters(&learner.snapshot());
        assert_ne!(
            before[0].to_vec::<f32>().unwrap(),
            after[0].to_vec::<f32>().unwrap()
        );
    }

    #[test]
    fn test_loss_decreases_on_learnable_target() {
        let mut learner = Learner::new(&config(), 1e-2, Default::default());
        let loader = BatchLoader::new(32, 2);
        let mut history = LossHistory::new();
        let mut rng = StdRng::seed_from_u64(0);

        let first = learner
            .train_epoch(linear_set(256, 4), &loader, &mut history, &mut NullSink, &mut rng)
            .unwrap();
        let mut last = first;
        for epoch in 0..30 {
            last = learner
                .train_epoch(
                    linear_set(256, 5 + epoch),
                    &loader,
                    &mut history,
                    &mut NullSink,
                    &mut rng,
                )
                .unwrap();
        }
        assert!(
            last.average < first.average,
            "loss did not improve: {} -> {}",
            first.average,
            last.average
        );
    }

    #[test]
    fn test_loss_does_not_depend_on_worker_arrival_order() {
        let base: CostNetwork<TrainBackend> = config().init(&Default::default());
        let arrived: Vec<GeneratedBatch> = (0..4).map(|i| linear_batch(64, 100 + i)).collect();
        let mut reversed = arrived.clone();
        reversed.reverse();
        let loader = BatchLoader::new(32, 0);

        // Mean epoch loss over several shuffle seeds, same starting weights.
        let mean_loss = |batches: &[GeneratedBatch]| -> f32 {
            let mut sum = 0.0;
            let mut epochs = 0;
            for seed in 0..8 {
                let mut learner = Learner::from_network(base.clone(), 1e-2, Default::default());
                let mut rng = StdRng::seed_from_u64(seed);
                for _ in 0..3 {
                    let set = TrainingSet::concat(4, batches.to_vec());
                    sum += learner
                        .train_epoch(set, &loader, &mut LossHistory::new(), &mut NullSink, &mut rng)
                        .unwrap()
                        .average;
                    epochs += 1;
                }
            }
            sum / epochs as f32
        };

        let forward = mean_loss(&arrived);
        let backward = mean_loss(&reversed);
        assert!(
            (forward - backward).abs() <= 0.15 * forward.max(backward),
            "arrival order changed training: {forward} vs {backward}"
        );
    }

    #[test]
    fn test_empty_set_is_an_error() {
        let mut learner = Learner::new(&config(), 1e-3, Default::default());
        let err = learner
            .train_epoch(
                TrainingSet::concat(4, Vec::new()),
                &BatchLoader::new(8, 0),
                &mut LossHistory::new(),
                &mut NullSink,
                &mut StdRng::seed_from_u64(0),
            )
            .unwrap_err();
        assert!(matches!(err, TrainingError::EmptyTrainingSet));
    }
}
