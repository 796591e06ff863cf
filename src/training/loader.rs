use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::thread;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::training::dataset::TrainingSet;

/// A shuffled mini-batch, flattened row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct MiniBatch {
    pub inputs: Vec<f32>,
    pub labels: Vec<f32>,
}

impl MiniBatch {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Shuffles a training set and cuts it into mini-batches. The last batch may
/// be short. With `num_workers > 0`, batches are gathered on background
/// threads and arrive in no particular order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchLoader {
    batch_size: usize,
    num_workers: usize,
}

impl BatchLoader {
    pub fn new(batch_size: usize, num_workers: usize) -> Self {
        BatchLoader {
            batch_size: batch_size.max(1),
            num_workers,
        }
    }

    /// Number of mini-batches one pass over `rows` rows yields.
    pub fn num_batches(&self, rows: usize) -> usize {
        rows.div_ceil(self.batch_size)
    }

    /// One shuffled pass over `set`.
    pub fn batches(&self, set: Arc<TrainingSet>, rng: &mut StdRng) -> std::io::Result<Batches> {
        let mut order: Vec<usize> = (0..set.len()).collect();
        order.shuffle(rng);
        let chunks: Vec<Vec<usize>> = order
            .chunks(self.batch_size)
            .map(|chunk| chunk.to_vec())
            .collect();

        if self.num_workers == 0 || chunks.len() <= 1 {
            return Ok(Batches::Inline {
                set,
                chunks: chunks.into_iter(),
            });
        }

        let workers = self.num_workers.min(chunks.len());
        let mut assigned: Vec<Vec<Vec<usize>>> = vec![Vec::new(); workers];
        for (i, chunk) in chunks.into_iter().enumerate() {
            assigned[i % workers].push(chunk);
        }

        let (tx, rx) = mpsc::sync_channel(2 * workers);
        for (worker, chunks) in assigned.into_iter().enumerate() {
            let set = Arc::clone(&set);
            let tx = tx.clone();
            thread::Builder::new()
                .name(format!("batch-loader-{worker}"))
                .spawn(move || {
                    for chunk in chunks {
                        // Receiver gone: the epoch was abandoned.
                        if tx.send(gather(&set, &chunk)).is_err() {
                            break;
                        }
                    }
                })?;
        }
        Ok(Batches::Threaded { rx })
    }
}

fn gather(set: &TrainingSet, rows: &[usize]) -> MiniBatch {
    let mut inputs = Vec::with_capacity(rows.len() * set.features());
    let mut labels = Vec::with_capacity(rows.len());
    for &row in rows {
        inputs.extend_from_slice(set.input(row));
        labels.push(set.label(row));
    }
    MiniBatch { inputs, labels }
}

/// Iterator over one pass of mini-batches.
pub enum Batches {
    Inline {
        set: Arc<TrainingSet>,
        chunks: std::vec::IntoIter<Vec<usize>>,
    },
    Threaded {
        rx: Receiver<MiniBatch>,
    },
}

impl Iterator for Batches {
    type Item = MiniBatch;

    fn next(&mut self) -> Option<MiniBatch> {
        match self {
            Batches::Inline { set, chunks } => chunks.next().map(|chunk| gather(set, &chunk)),
            // Ends once every loader thread has finished and dropped its sender.
            Batches::Threaded { rx } => rx.recv().ok(),
        }
    }
}
