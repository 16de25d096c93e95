//! Renderers for everything the engine surfaces to a human or to a
//! machine-readable sidecar file: the `--dry-run N` tracer (spec §4.1
//! step 0.5/§4.4), the `--metrics-path` structured metrics document
//! (spec §6 "Persisted state layout"), and the end-of-job summary line.

pub mod dry_run;
pub mod metrics;
pub mod summary;

pub use dry_run::{DryRunReport, DryRunTracer, StageSchema};
pub use metrics::write_metrics_file;
pub use summary::SummaryReport;
