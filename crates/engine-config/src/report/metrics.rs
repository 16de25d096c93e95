//! The structured metrics sidecar file (spec §6 "Persisted state layout":
//! "an append-or-replace JSON document with counters, durations, per-batch
//! latencies"). Never read back by the engine itself.

use model::execution::metrics::PipelineMetricsSnapshot;
use serde::Serialize;

use crate::error::{ConfigError, Result};

/// One run's terminal metrics, written whole (the file is replaced, not
/// appended to, on each run — "append-or-replace" per spec §6).
#[derive(Debug, Clone, Serialize)]
pub struct MetricsDocument {
    pub snapshot: PipelineMetricsSnapshot,
    pub stage_percentiles_ms: Vec<(String, u64)>,
}

pub fn write_metrics_file(path: &str, snapshot: PipelineMetricsSnapshot, stage_percentiles_ms: Vec<(String, u64)>) -> Result<()> {
    let document = MetricsDocument { snapshot, stage_percentiles_ms };
    let json = serde_json::to_string_pretty(&document)?;
    std::fs::write(path, json).map_err(|e| ConfigError::MetricsWrite(path.to_string(), e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_a_readable_json_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metrics.json");
        let snapshot = PipelineMetricsSnapshot {
            rows_read: 10,
            rows_written: 9,
            rows_filtered: 1,
            rows_rejected: 0,
            bytes_written: 128,
            batch_count: 1,
            retries: 0,
            elapsed_ms: 5,
        };
        write_metrics_file(path.to_str().unwrap(), snapshot, vec![("write".into(), 3)]).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("\"rows_read\": 10"));
    }
}
