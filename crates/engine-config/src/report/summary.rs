//! The terminal, human-readable summary line printed after a run (spec §7
//! "User-visible behavior": "stderr carries human-readable diagnostics").

use model::execution::metrics::PipelineMetricsSnapshot;

#[derive(Debug, Clone)]
pub struct SummaryReport {
    pub rows_in: u64,
    pub rows_out: u64,
    pub rows_filtered: u64,
    pub batches: u64,
    pub duration_ms: u64,
    pub retries: u64,
}

impl SummaryReport {
    pub fn from_snapshot(snapshot: &PipelineMetricsSnapshot, batches: u64, duration_ms: u64) -> Self {
        Self {
            rows_in: snapshot.rows_read,
            rows_out: snapshot.rows_written,
            rows_filtered: snapshot.rows_filtered,
            batches,
            duration_ms,
            retries: snapshot.retries,
        }
    }

    pub fn render(&self) -> String {
        format!(
            "rows read={} written={} filtered={} batches={} retries={} duration={}ms",
            self.rows_in, self.rows_out, self.rows_filtered, self.batches, self.retries, self.duration_ms
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_a_one_line_summary() {
        let snapshot = PipelineMetricsSnapshot {
            rows_read: 5,
            rows_written: 4,
            rows_filtered: 1,
            rows_rejected: 0,
            bytes_written: 0,
            batch_count: 1,
            retries: 0,
            elapsed_ms: 10,
        };
        let summary = SummaryReport::from_snapshot(&snapshot, 1, 10);
        assert!(summary.render().contains("written=4"));
    }
}
