use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Process-scope, single writer/multiple readers (§3). The kernel is the
/// only writer; readers are metric observers through a one-way callback.
#[derive(Debug)]
pub struct PipelineMetrics {
    rows_read: AtomicU64,
    rows_written: AtomicU64,
    rows_filtered: AtomicU64,
    rows_rejected: AtomicU64,
    bytes_written: AtomicU64,
    batch_count: AtomicU64,
    retries: AtomicU64,
    start: Instant,
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self {
            rows_read: AtomicU64::new(0),
            rows_written: AtomicU64::new(0),
            rows_filtered: AtomicU64::new(0),
            rows_rejected: AtomicU64::new(0),
            bytes_written: AtomicU64::new(0),
            batch_count: AtomicU64::new(0),
            retries: AtomicU64::new(0),
            start: Instant::now(),
        }
    }

    pub fn record_rows_read(&self, n: u64) {
        self.rows_read.fetch_add(n, Ordering::Relaxed);
    }

    pub fn record_rows_written(&self, n: u64) {
        self.rows_written.fetch_add(n, Ordering::Relaxed);
    }

    pub fn record_rows_filtered(&self, n: u64) {
        self.rows_filtered.fetch_add(n, Ordering::Relaxed);
    }

    pub fn record_rows_rejected(&self, n: u64) {
        self.rows_rejected.fetch_add(n, Ordering::Relaxed);
    }

    pub fn record_bytes_written(&self, n: u64) {
        self.bytes_written.fetch_add(n, Ordering::Relaxed);
    }

    pub fn record_batch(&self) {
        self.batch_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_retry(&self) {
        self.retries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> PipelineMetricsSnapshot {
        PipelineMetricsSnapshot {
            rows_read: self.rows_read.load(Ordering::Relaxed),
            rows_written: self.rows_written.load(Ordering::Relaxed),
            rows_filtered: self.rows_filtered.load(Ordering::Relaxed),
            rows_rejected: self.rows_rejected.load(Ordering::Relaxed),
            bytes_written: self.bytes_written.load(Ordering::Relaxed),
            batch_count: self.batch_count.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            elapsed_ms: self.start.elapsed().as_millis() as u64,
        }
    }
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// The structured, flushable form of `PipelineMetrics` — serialized to the
/// `--metrics-path` JSON document. Never read back by the engine itself.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PipelineMetricsSnapshot {
    pub rows_read: u64,
    pub rows_written: u64,
    pub rows_filtered: u64,
    pub rows_rejected: u64,
    pub bytes_written: u64,
    pub batch_count: u64,
    pub retries: u64,
    pub elapsed_ms: u64,
}
