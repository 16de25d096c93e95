//! The flat CLI surface bound directly to `JobDefinition` fields (spec §6).
//! Transformer directives (`--fake`, `--mask`, ...) are deliberately absent
//! here — they're order-significant across repeated flags in a way clap's
//! derive can't preserve, so `directives` extracts them from raw argv
//! before this struct ever sees it.

use clap::{Parser, ValueEnum};
use model::{InsertMode, WriteStrategy};

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum StrategyArg {
    Append,
    Truncate,
    DeleteThenInsert,
    Recreate,
    Upsert,
    Ignore,
}

impl From<StrategyArg> for WriteStrategy {
    fn from(value: StrategyArg) -> Self {
        match value {
            StrategyArg::Append => WriteStrategy::Append,
            StrategyArg::Truncate => WriteStrategy::Truncate,
            StrategyArg::DeleteThenInsert => WriteStrategy::DeleteThenInsert,
            StrategyArg::Recreate => WriteStrategy::Recreate,
            StrategyArg::Upsert => WriteStrategy::Upsert,
            StrategyArg::Ignore => WriteStrategy::Ignore,
        }
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum InsertModeArg {
    Standard,
    Bulk,
    AppendDirect,
}

impl From<InsertModeArg> for InsertMode {
    fn from(value: InsertModeArg) -> Self {
        match value {
            InsertModeArg::Standard => InsertMode::Standard,
            InsertModeArg::Bulk => InsertMode::Bulk,
            InsertModeArg::AppendDirect => InsertMode::AppendDirect,
        }
    }
}

/// Every field is `Option` (or absent entirely) so that, when merged against
/// a `--job` YAML file, "not present on the command line" is distinguishable
/// from "present with a falsy value" — CLI flags take precedence field by
/// field, per `job_build::merge`.
#[derive(Parser, Debug)]
#[command(name = "dtpipe", version, about = "Command-driven streaming data-movement engine")]
pub struct Args {
    /// Source endpoint, `<prefix>:<connection-string-or-path>`.
    #[arg(short = 'i', long = "input")]
    pub input: Option<String>,

    /// Sink endpoint, `<prefix>:<connection-string-or-path>`.
    #[arg(short = 'o', long = "output")]
    pub output: Option<String>,

    /// Reader query; must begin with SELECT or WITH unless `--unsafe-query`.
    #[arg(short = 'q', long = "query")]
    pub query: Option<String>,

    /// Allows a reader query that doesn't begin with SELECT/WITH.
    #[arg(long = "unsafe-query")]
    pub unsafe_query: bool,

    /// Target table name for database sinks.
    #[arg(long = "table")]
    pub table: Option<String>,

    #[arg(long = "strategy", value_enum)]
    pub strategy: Option<StrategyArg>,

    #[arg(long = "insert-mode", value_enum)]
    pub insert_mode: Option<InsertModeArg>,

    /// Upsert/Ignore key column; repeatable.
    #[arg(long = "key")]
    pub key: Vec<String>,

    #[arg(long = "batch-size")]
    pub batch_size: Option<usize>,

    #[arg(long = "limit")]
    pub limit: Option<u64>,

    #[arg(long = "sampling-rate")]
    pub sampling_rate: Option<f64>,

    #[arg(long = "sampling-seed")]
    pub sampling_seed: Option<u64>,

    #[arg(long = "max-retries")]
    pub max_retries: Option<u32>,

    #[arg(long = "retry-delay-ms")]
    pub retry_delay_ms: Option<u64>,

    #[arg(long = "connection-timeout")]
    pub connection_timeout_ms: Option<u64>,

    #[arg(long = "query-timeout")]
    pub query_timeout_ms: Option<u64>,

    #[arg(long = "pre-exec")]
    pub pre_exec: Option<String>,

    #[arg(long = "post-exec")]
    pub post_exec: Option<String>,

    #[arg(long = "on-error-exec")]
    pub on_error_exec: Option<String>,

    #[arg(long = "finally-exec")]
    pub finally_exec: Option<String>,

    /// Traces a bounded sample through the reader and transformer chain
    /// without touching a writer. Bare `--dry-run` samples 10 rows.
    #[arg(long = "dry-run", num_args = 0..=1, default_missing_value = "10")]
    pub dry_run: Option<u64>,

    #[arg(long = "strict-schema")]
    pub strict_schema: bool,

    #[arg(long = "auto-migrate")]
    pub auto_migrate: bool,

    #[arg(long = "metrics-path")]
    pub metrics_path: Option<String>,

    /// Redirects structured logs to a file instead of stderr.
    #[arg(long = "log")]
    pub log: Option<String>,

    /// Loads a `JobDefinition` from YAML; CLI flags present alongside it
    /// override the corresponding field.
    #[arg(long = "job")]
    pub job: Option<String>,

    /// Writes the fully resolved `JobDefinition` to YAML before running.
    #[arg(long = "export-job")]
    pub export_job: Option<String>,
}
