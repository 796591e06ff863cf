//! Parallel scramble generation.
//!
//! Each epoch the coordinator spawns one named thread per worker. A worker
//! owns a clone of the target network, scrambles and labels its share, and
//! reports exactly once on a bounded channel. The coordinator waits on that
//! channel against a single deadline, so a stalled or crashed worker surfaces
//! as an error instead of a hang. When the coordinator gives up it raises a
//! shared cancel flag; detached workers see it before labelling and stop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::ai::networks::CostNetwork;
use crate::ai::state_encoding::encode_states_flat;
use crate::ai::{label_states, Device, InferBackend};
use crate::error::GenerationError;
use crate::puzzle::Environment;
use crate::training::dataset::{GeneratedBatch, TrainingSet};

/// Work assigned to a single generation worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerTask {
    pub worker: usize,
    pub num_scrambles: usize,
    pub depth: usize,
    pub seed: u64,
}

/// Worker routine: scramble `task.num_scrambles` states and label them with
/// the target network. Forward-only, no gradients are tracked. Labelling is
/// skipped once `cancel` is raised.
pub fn run_worker<E: Environment>(
    env: &E,
    target: &CostNetwork<InferBackend>,
    device: &Device,
    task: &WorkerTask,
    cancel: &AtomicBool,
) -> Result<GeneratedBatch, GenerationError> {
    let mut rng = StdRng::seed_from_u64(task.seed);
    let states = env.scramble(task.num_scrambles, task.depth, &mut rng);
    if cancel.load(Ordering::Relaxed) {
        return Err(GenerationError::Cancelled {
            worker: task.worker,
        });
    }
    let labels = label_states(env, target, device, &states)?;
    let inputs = encode_states_flat(env, &states);
    Ok(GeneratedBatch { inputs, labels })
}

struct WorkerReport {
    worker: usize,
    result: Result<GeneratedBatch, GenerationError>,
}

/// Fans scramble generation out over a fixed number of worker threads.
#[derive(Debug, Clone)]
pub struct GenerationCoordinator {
    num_workers: usize,
    timeout: Duration,
}

impl GenerationCoordinator {
    pub fn new(num_workers: usize, timeout: Duration) -> Self {
        GenerationCoordinator {
            num_workers: num_workers.max(1),
            timeout,
        }
    }

    /// Scrambles per worker. The remainder of the integer division is dropped.
    pub fn share(&self, total_scrambles: usize) -> usize {
        total_scrambles / self.num_workers
    }

    /// Rows a call to [`GenerationCoordinator::generate`] will produce.
    pub fn expected_rows(&self, total_scrambles: usize) -> usize {
        self.share(total_scrambles) * self.num_workers
    }

    /// Produce an epoch's training set.
    ///
    /// Blocks until every worker has reported and been joined, or the timeout
    /// elapses. Batches are concatenated in arrival order. On error, workers
    /// that are still running are cancelled and detached.
    pub fn generate<E: Environment>(
        &self,
        env: &E,
        target: &CostNetwork<InferBackend>,
        device: &Device,
        total_scrambles: usize,
        depth: usize,
        rng: &mut StdRng,
    ) -> Result<TrainingSet, GenerationError> {
        let share = self.share(total_scrambles);
        let dropped = total_scrambles - share * self.num_workers;
        if dropped > 0 {
            log::warn!(
                "{} scrambles do not divide across {} workers, dropping {}",
                total_scrambles,
                self.num_workers,
                dropped
            );
        }

        let (tx, rx) = mpsc::sync_channel::<WorkerReport>(self.num_workers);
        let cancel = Arc::new(AtomicBool::new(false));
        let mut handles = Vec::with_capacity(self.num_workers);
        for worker in 0..self.num_workers {
            let task = WorkerTask {
                worker,
                num_scrambles: share,
                depth,
                seed: rng.random(),
            };
            let env = env.clone();
            let target = target.clone();
            let device = device.clone();
            let tx = tx.clone();
            let flag = Arc::clone(&cancel);
            let spawned = thread::Builder::new()
                .name(format!("scramble-worker-{worker}"))
                .spawn(move || {
                    let result = run_worker(&env, &target, &device, &task, &flag);
                    // The coordinator may have given up already.
                    let _ = tx.send(WorkerReport { worker, result });
                });
            match spawned {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    cancel.store(true, Ordering::Relaxed);
                    return Err(e.into());
                }
            }
        }
        // Only workers hold senders now, so a disconnect means they are all gone.
        drop(tx);

        let batches = match self.collect(&rx) {
            Ok(batches) => batches,
            Err(e) => {
                cancel.store(true, Ordering::Relaxed);
                return Err(e);
            }
        };

        for (worker, handle) in handles.into_iter().enumerate() {
            handle
                .join()
                .map_err(|_| GenerationError::WorkerPanicked { worker })?;
        }

        Ok(TrainingSet::concat(env.encoded_len(), batches))
    }

    /// Drain one report per worker against a single deadline.
    fn collect(&self, rx: &Receiver<WorkerReport>) -> Result<Vec<GeneratedBatch>, GenerationError> {
        let started = Instant::now();
        let deadline = started + self.timeout;
        let mut batches = Vec::with_capacity(self.num_workers);
        while batches.len() < self.num_workers {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match rx.recv_timeout(remaining) {
                Ok(WorkerReport { worker, result }) => match result {
                    Ok(batch) => {
                        log::debug!("worker {} reported {} scrambles", worker, batch.len());
                        batches.push(batch);
                    }
                    Err(e) => {
                        return Err(GenerationError::Worker {
                            worker,
                            reason: e.to_string(),
                        })
                    }
                },
                Err(RecvTimeoutError::Timeout) => {
                    return Err(GenerationError::Timeout {
                        received: batches.len(),
                        expected: self.num_workers,
                        waited: started.elapsed(),
                    })
                }
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(GenerationError::WorkersLost {
                        received: batches.len(),
                        expected: self.num_workers,
                    })
                }
            }
        }
        Ok(batches)
    }
}
