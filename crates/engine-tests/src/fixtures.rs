//! Shared scaffolding for the scenario tests: a minimal `JobDefinition`
//! builder and small CSV read/write helpers so each scenario only states
//! what it actually varies.

use std::io::Write;

use model::execution::endpoint::{Endpoint, EndpointKind};
use model::execution::job::{InsertMode, JobDefinition, LifecycleHooks, RetryPolicyConfig, TimeoutConfig, TransformerConfig, WriteStrategy};

/// A `JobDefinition` with every field at its permissive default; tests
/// override only the fields their scenario cares about.
pub fn base_job(input: Endpoint, output: Endpoint) -> JobDefinition {
    JobDefinition {
        input,
        output,
        query: None,
        unsafe_query: false,
        timeouts: TimeoutConfig::default(),
        batch_size: 100,
        limit: None,
        sampling: None,
        retry: RetryPolicyConfig {
            max_retries: 0,
            retry_delay_ms: 0,
        },
        strategy: WriteStrategy::Append,
        insert_mode: InsertMode::Standard,
        target_table: None,
        key_columns: Vec::new(),
        hooks: LifecycleHooks::default(),
        strict_schema: false,
        auto_migrate: false,
        metrics_path: None,
        dry_run_count: None,
        transformers: Vec::new(),
    }
}

pub fn generate_endpoint(count: u64) -> Endpoint {
    Endpoint {
        kind: EndpointKind::Generate,
        location: count.to_string(),
    }
}

pub fn csv_endpoint(path: &std::path::Path) -> Endpoint {
    Endpoint {
        kind: EndpointKind::Csv,
        location: path.to_string_lossy().into_owned(),
    }
}

pub fn sqlite_endpoint(path: &std::path::Path) -> Endpoint {
    Endpoint {
        kind: EndpointKind::Sqlite,
        location: path.to_string_lossy().into_owned(),
    }
}

pub fn duckdb_memory_endpoint() -> Endpoint {
    Endpoint {
        kind: EndpointKind::DuckDb,
        location: String::new(),
    }
}

/// A file-backed DuckDB endpoint. Unlike `duckdb_memory_endpoint`, a second
/// `open_sql_adapter` call against the same path reopens the same
/// database, so tests that pre-populate a table and then run a job against
/// it need this, not the in-memory variant.
pub fn duckdb_path_endpoint(path: &std::path::Path) -> Endpoint {
    Endpoint {
        kind: EndpointKind::DuckDb,
        location: path.to_string_lossy().into_owned(),
    }
}

/// Writes `rows` (already rendered as comma-joined strings, header first)
/// to a fresh CSV file and returns its path.
pub fn write_csv(dir: &tempfile::TempDir, name: &str, lines: &[&str]) -> std::path::PathBuf {
    let path = dir.path().join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    for line in lines {
        writeln!(file, "{line}").unwrap();
    }
    path
}

/// Reads a CSV file back as `(header, data_rows)`, each row a `Vec<String>`.
pub fn read_csv(path: &std::path::Path) -> (Vec<String>, Vec<Vec<String>>) {
    let mut reader = csv::Reader::from_path(path).unwrap();
    let header = reader.headers().unwrap().iter().map(String::from).collect();
    let rows = reader
        .records()
        .map(|r| r.unwrap().iter().map(String::from).collect())
        .collect();
    (header, rows)
}

pub fn transformer(kind: &str, args: Vec<&str>) -> TransformerConfig {
    TransformerConfig::new(kind, args.into_iter().map(String::from).collect())
}
