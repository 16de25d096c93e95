use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::endpoint::Endpoint;
use crate::error::ModelError;

/// The high-level write mode a writer's strategy state machine executes
/// (§4.3). Distinct from `InsertMode`, the low-level placement mechanism.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WriteStrategy {
    Append,
    Truncate,
    DeleteThenInsert,
    Recreate,
    Upsert,
    Ignore,
}

impl WriteStrategy {
    /// Whether this strategy resolves primary-key collisions and therefore
    /// requires a key (introspected or user-supplied) before any row is read.
    pub fn requires_key(&self) -> bool {
        matches!(self, WriteStrategy::Upsert | WriteStrategy::Ignore)
    }
}

/// The low-level mechanism a writer uses to place rows into the sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InsertMode {
    Standard,
    Bulk,
    AppendDirect,
}

/// Shell commands run at the four lifecycle points (§4.1 algorithm,
/// step 1 and step 7). Each is executed against the sink's environment;
/// a non-zero exit from `pre` is fatal, the others are best-effort.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct LifecycleHooks {
    pub pre_exec: Option<String>,
    pub post_exec: Option<String>,
    pub on_error_exec: Option<String>,
    pub finally_exec: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RetryPolicyConfig {
    pub max_retries: u32,
    pub retry_delay_ms: u64,
}

impl Default for RetryPolicyConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay_ms: 500,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct TimeoutConfig {
    pub connection_timeout_ms: Option<u64>,
    pub query_timeout_ms: Option<u64>,
}

/// One grouped transformer directive: a kind plus its ordered argument list.
/// The engine's pipeline construction rule (§4.2) groups consecutive
/// directives of the same kind into a single instance at build time — this
/// type only records the flat, ordered configuration the grouping rule
/// consumes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TransformerConfig {
    pub kind: String,
    pub args: Vec<String>,
    pub options: HashMap<String, String>,
}

impl TransformerConfig {
    pub fn new(kind: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            kind: kind.into(),
            args,
            options: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SamplingConfig {
    /// Fixed-point rate in millionths, so `(rate, seed)` is hashable/Eq
    /// without carrying a bare `f64` through config equality checks.
    pub rate_per_million: u32,
    pub seed: u64,
}

impl SamplingConfig {
    pub fn rate(&self) -> f64 {
        self.rate_per_million as f64 / 1_000_000.0
    }

    pub fn is_active(&self) -> bool {
        self.rate_per_million < 1_000_000
    }
}

/// Owned by the Controller, immutable once frozen (§3). Everything the
/// Pipeline Kernel, Transformer chain, and Writer Strategy Engine need to
/// run one job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobDefinition {
    pub input: Endpoint,
    pub output: Endpoint,
    pub query: Option<String>,
    pub unsafe_query: bool,
    pub timeouts: TimeoutConfig,
    pub batch_size: usize,
    pub limit: Option<u64>,
    pub sampling: Option<SamplingConfig>,
    pub retry: RetryPolicyConfig,
    pub strategy: WriteStrategy,
    pub insert_mode: InsertMode,
    pub target_table: Option<String>,
    pub key_columns: Vec<String>,
    pub hooks: LifecycleHooks,
    pub strict_schema: bool,
    pub auto_migrate: bool,
    pub metrics_path: Option<String>,
    pub dry_run_count: Option<u64>,
    pub transformers: Vec<TransformerConfig>,
}

impl JobDefinition {
    /// Flag/config validation that does not require touching the network —
    /// the part of §7's "Config" error bucket the Controller checks before
    /// opening a reader.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.batch_size == 0 {
            return Err(ModelError::Conflict("batch-size must be > 0".into()));
        }
        if self.strategy.requires_key() && self.key_columns.is_empty() {
            // Not necessarily fatal yet: introspection may still supply a
            // primary key (§4.3 key resolution order). The writer re-checks
            // this after inspect; this early check only catches the case
            // where introspection is impossible to begin with (file sinks).
            if matches!(
                self.output.kind,
                super::endpoint::EndpointKind::Csv
                    | super::endpoint::EndpointKind::Parquet
                    | super::endpoint::EndpointKind::Arrow
            ) {
                return Err(ModelError::Conflict(format!(
                    "{:?} requires --key columns for file sinks",
                    self.strategy
                )));
            }
        }
        if let Some(query) = &self.query {
            validate_query_safety(query, self.unsafe_query)?;
        }
        Ok(())
    }
}

/// Token-level, not a full parse (§6 "Query safety"): rejects leading
/// DDL/DML keywords unless `--unsafe-query` is set.
pub fn validate_query_safety(query: &str, unsafe_query: bool) -> Result<(), ModelError> {
    if unsafe_query {
        return Ok(());
    }
    let trimmed = query.trim_start();
    let first_token = trimmed
        .split(|c: char| c.is_whitespace() || c == '(')
        .find(|t| !t.is_empty())
        .unwrap_or("");
    let upper = first_token.to_ascii_uppercase();
    if upper == "SELECT" || upper == "WITH" {
        Ok(())
    } else {
        Err(ModelError::Conflict(format!(
            "query must begin with SELECT or WITH, found `{first_token}`"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::endpoint::EndpointKind;

    fn endpoint(kind: EndpointKind) -> Endpoint {
        Endpoint {
            kind,
            location: "x".into(),
        }
    }

    #[test]
    fn upsert_without_key_on_db_sink_is_allowed_pending_introspection() {
        let job = JobDefinition {
            input: endpoint(EndpointKind::Csv),
            output: endpoint(EndpointKind::Postgres),
            query: None,
            unsafe_query: false,
            timeouts: TimeoutConfig::default(),
            batch_size: 1000,
            limit: None,
            sampling: None,
            retry: RetryPolicyConfig::default(),
            strategy: WriteStrategy::Upsert,
            insert_mode: InsertMode::Standard,
            target_table: Some("users".into()),
            key_columns: vec![],
            hooks: LifecycleHooks::default(),
            strict_schema: false,
            auto_migrate: false,
            metrics_path: None,
            dry_run_count: None,
            transformers: vec![],
        };
        assert!(job.validate().is_ok());
    }

    #[test]
    fn upsert_without_key_on_file_sink_is_rejected() {
        let job = JobDefinition {
            input: endpoint(EndpointKind::Postgres),
            output: endpoint(EndpointKind::Csv),
            query: None,
            unsafe_query: false,
            timeouts: TimeoutConfig::default(),
            batch_size: 1000,
            limit: None,
            sampling: None,
            retry: RetryPolicyConfig::default(),
            strategy: WriteStrategy::Ignore,
            insert_mode: InsertMode::Standard,
            target_table: None,
            key_columns: vec![],
            hooks: LifecycleHooks::default(),
            strict_schema: false,
            auto_migrate: false,
            metrics_path: None,
            dry_run_count: None,
            transformers: vec![],
        };
        assert!(job.validate().is_err());
    }

    #[test]
    fn rejects_ddl_without_unsafe_flag() {
        assert!(validate_query_safety("DROP TABLE users", false).is_err());
        assert!(validate_query_safety("DROP TABLE users", true).is_ok());
    }

    #[test]
    fn accepts_select_and_with() {
        assert!(validate_query_safety("  select * from t", false).is_ok());
        assert!(validate_query_safety("WITH x AS (SELECT 1) SELECT * FROM x", false).is_ok());
    }
}
