//! Test doubles shared by unit tests across modules.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use rand::rngs::StdRng;

use crate::ai::networks::CostNetwork;
use crate::ai::InferBackend;
use crate::checkpoint::CheckpointStore;
use crate::error::CheckpointError;
use crate::puzzle::{Environment, PuzzleBoard, SlidingPuzzle};
use crate::training::metrics::MetricsSink;

/// 8-puzzle whose first `faulty` scramble calls stall (a minute by default)
/// or panic. Successor expansions, which only labelling performs, are counted.
#[derive(Clone)]
pub struct FaultyPuzzle {
    pub inner: SlidingPuzzle,
    calls: Arc<AtomicUsize>,
    expansions: Arc<AtomicUsize>,
    faulty: usize,
    panic: bool,
    stall: Duration,
}

impl FaultyPuzzle {
    pub fn stalling(faulty: usize) -> Self {
        Self::new(faulty, false)
    }

    pub fn crashing(faulty: usize) -> Self {
        Self::new(faulty, true)
    }

    pub fn with_stall(mut self, stall: Duration) -> Self {
        self.stall = stall;
        self
    }

    pub fn successor_calls(&self) -> usize {
        self.expansions.load(Ordering::SeqCst)
    }

    fn new(faulty: usize, panic: bool) -> Self {
        FaultyPuzzle {
            inner: SlidingPuzzle::new(8).unwrap(),
            calls: Arc::new(AtomicUsize::new(0)),
            expansions: Arc::new(AtomicUsize::new(0)),
            faulty,
            panic,
            stall: Duration::from_secs(60),
        }
    }
}

impl Environment for FaultyPuzzle {
    type State = PuzzleBoard;

    fn scramble(&self, count: usize, depth: usize, rng: &mut StdRng) -> Vec<PuzzleBoard> {
        if self.calls.fetch_add(1, Ordering::SeqCst) < self.faulty {
            if self.panic {
                panic!("injected worker crash");
            }
            thread::sleep(self.stall);
        }
        self.inner.scramble(count, depth, rng)
    }

    fn successors(&self, state: &PuzzleBoard) -> Vec<PuzzleBoard> {
        self.expansions.fetch_add(1, Ordering::SeqCst);
        self.inner.successors(state)
    }

    fn is_goal(&self, state: &PuzzleBoard) -> bool {
        self.inner.is_goal(state)
    }

    fn encoded_len(&self) -> usize {
        self.inner.encoded_len()
    }

    fn encode_into(&self, state: &PuzzleBoard, out: &mut Vec<f32>) {
        self.inner.encode_into(state, out)
    }
}

/// Counts saves in memory, or fails every save when `fail` is set.
#[derive(Clone, Default)]
pub struct CountingStore {
    pub saves: Arc<Mutex<usize>>,
    pub fail: bool,
}

impl CountingStore {
    pub fn count(&self) -> usize {
        *self.saves.lock().unwrap()
    }
}

impl CheckpointStore for CountingStore {
    fn save(&mut self, _network: &CostNetwork<InferBackend>) -> Result<PathBuf, CheckpointError> {
        if self.fail {
            return Err(CheckpointError::ModelSave("disk full".into()));
        }
        *self.saves.lock().unwrap() += 1;
        Ok(PathBuf::from("memory"))
    }
}

/// Keeps every scalar it is given; clones share the same log.
#[derive(Clone, Default)]
pub struct RecordingSink {
    records: Arc<Mutex<Vec<(String, usize, f64)>>>,
}

impl RecordingSink {
    /// Values of one series, in recording order.
    pub fn series(&self, name: &str) -> Vec<f64> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .filter(|(series, _, _)| series == name)
            .map(|&(_, _, value)| value)
            .collect()
    }
}

impl MetricsSink for RecordingSink {
    fn record(&mut self, series: &str, step: usize, value: f64) {
        self.records
            .lock()
            .unwrap()
            .push((series.to_string(), step, value));
    }
}
