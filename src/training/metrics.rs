use std::collections::VecDeque;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use tensorboard_rs::summary_writer::SummaryWriter;

/// Per-mini-batch loss record: the most recent `capacity` values plus a
/// lifetime count that is never capped.
#[derive(Debug, Clone)]
pub struct LossHistory {
    recent: VecDeque<f32>,
    capacity: usize,
    total: usize,
}

impl LossHistory {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        LossHistory {
            recent: VecDeque::with_capacity(capacity),
            capacity,
            total: 0,
        }
    }

    pub fn new() -> Self {
        Self::with_capacity(1000)
    }

    pub fn record(&mut self, loss: f32) {
        self.total += 1;
        self.recent.push_back(loss);
        if self.recent.len() > self.capacity {
            self.recent.pop_front();
        }
    }

    /// Number of losses ever recorded.
    pub fn total(&self) -> usize {
        self.total
    }

    pub fn latest(&self) -> Option<f32> {
        self.recent.back().copied()
    }

    pub fn recent(&self) -> impl Iterator<Item = f32> + '_ {
        self.recent.iter().copied()
    }

    /// Average loss over the last N records still in the window.
    pub fn average(&self, last_n: usize) -> f32 {
        let n = self.recent.len().min(last_n);
        if n == 0 {
            return 0.0;
        }
        let sum: f32 = self.recent.iter().rev().take(n).sum();
        sum / n as f32
    }
}

impl Default for LossHistory {
    fn default() -> Self {
        Self::new()
    }
}

/// Write-only destination for scalar series. Implementations must not fail
/// the caller.
pub trait MetricsSink {
    fn record(&mut self, series: &str, step: usize, value: f64);

    fn flush(&mut self) {}
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl MetricsSink for NullSink {
    fn record(&mut self, _series: &str, _step: usize, _value: f64) {}
}

#[derive(serde::Serialize)]
struct ScalarRecord<'a> {
    series: &'a str,
    step: usize,
    value: f64,
}

/// Appends one JSON object per scalar to a file. After the first I/O error
/// the sink logs a warning and goes quiet.
pub struct JsonlSink {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
}

impl JsonlSink {
    /// Open (or create) `<dir>/metrics.jsonl`. Failure to open is logged and
    /// yields a sink that drops records.
    pub fn open(dir: &Path) -> Self {
        let path = dir.join("metrics.jsonl");
        let writer = fs::create_dir_all(dir)
            .and_then(|_| OpenOptions::new().create(true).append(true).open(&path))
            .map(BufWriter::new);
        match writer {
            Ok(writer) => JsonlSink {
                path,
                writer: Some(writer),
            },
            Err(e) => {
                log::warn!("metrics disabled, cannot open {}: {}", path.display(), e);
                JsonlSink { path, writer: None }
            }
        }
    }

    fn disable(&mut self, e: impl std::fmt::Display) {
        log::warn!("metrics disabled, write to {} failed: {}", self.path.display(), e);
        self.writer = None;
    }
}

impl MetricsSink for JsonlSink {
    fn record(&mut self, series: &str, step: usize, value: f64) {
        let Some(writer) = self.writer.as_mut() else {
            return;
        };
        let result = serde_json::to_writer(&mut *writer, &ScalarRecord { series, step, value })
            .map_err(|e| e.to_string())
            .and_then(|_| writer.write_all(b"\n").map_err(|e| e.to_string()));
        if let Err(e) = result {
            self.disable(e);
        }
    }

    fn flush(&mut self) {
        if let Some(writer) = self.writer.as_mut() {
            if let Err(e) = writer.flush() {
                self.disable(e);
            }
        }
    }
}

impl Drop for JsonlSink {
    fn drop(&mut self) {
        self.flush();
    }
}

/// Writes scalars as TensorBoard event files under a run directory.
pub struct TensorboardSink {
    writer: Option<SummaryWriter>,
}

impl TensorboardSink {
    /// Create the run directory and an event writer in it. Failure to create
    /// the directory is logged and yields a sink that drops records.
    pub fn open(dir: &Path) -> Self {
        match fs::create_dir_all(dir) {
            Ok(()) => TensorboardSink {
                writer: Some(SummaryWriter::new(dir)),
            },
            Err(e) => {
                log::warn!("metrics disabled, cannot create {}: {}", dir.display(), e);
                TensorboardSink { writer: None }
            }
        }
    }
}

impl MetricsSink for TensorboardSink {
    fn record(&mut self, series: &str, step: usize, value: f64) {
        if let Some(writer) = self.writer.as_mut() {
            writer.add_scalar(series, value as f32, step);
        }
    }

    fn flush(&mut self) {
        if let Some(writer) = self.writer.as_mut() {
            writer.flush();
        }
    }
}

impl Drop for TensorboardSink {
    fn drop(&mut self) {
        self.flush();
    }
}

/// Render a duration as "H hours, M minutes and S seconds".
pub fn format_hms(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!(
        "{} hours, {} minutes and {} seconds",
        secs / 3600,
        secs / 60 % 60,
        secs % 60
    )
}
