use serde::{Deserialize, Serialize};
use std::sync::RwLock;

/// Coarse phase of one `Run` call, surfaced alongside `PipelineMetrics` for
/// heartbeat reporting. Not persisted across process restarts.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RunStage {
    PreExec,
    ReaderOpen,
    WriterPrepare,
    Streaming,
    WriterComplete,
    PostExec,
    Finally,
    Done,
    Failed,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProgressSnapshot {
    pub stage: RunStage,
    pub rows_read: u64,
    pub rows_written: u64,
}

/// A lightweight in-memory progress tracker for the duration of one `Run`
/// call. Deliberately has no durability story: the engine does not persist
/// intermediate state (spec §1 Non-goals), this is a live readout only.
#[derive(Debug)]
pub struct ProgressService {
    inner: RwLock<ProgressSnapshot>,
}

impl ProgressService {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(ProgressSnapshot {
                stage: RunStage::PreExec,
                rows_read: 0,
                rows_written: 0,
            }),
        }
    }

    pub fn set_stage(&self, stage: RunStage) {
        self.inner.write().expect("progress lock poisoned").stage = stage;
    }

    pub fn set_rows(&self, rows_read: u64, rows_written: u64) {
        let mut guard = self.inner.write().expect("progress lock poisoned");
        guard.rows_read = rows_read;
        guard.rows_written = rows_written;
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        *self.inner.read().expect("progress lock poisoned")
    }
}

impl Default for ProgressService {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reflects_latest_stage_and_counts() {
        let progress = ProgressService::new();
        progress.set_stage(RunStage::Streaming);
        progress.set_rows(100, 80);
        let snap = progress.snapshot();
        assert_eq!(snap.stage, RunStage::Streaming);
        assert_eq!(snap.rows_read, 100);
        assert_eq!(snap.rows_written, 80);
    }
}
