//! The shared contract every relational adapter (`postgres`, `mssql`,
//! `oracle`, `duckdb`, `sqlite`) implements, consumed by
//! `engine-runtime::writer_engine::WriterStrategyEngine` and by
//! `sql::reader::SqlReader`. Mirrors the shape of the spec's `TargetSchemaInfo`
//! introspection contract (§3) and the Writer Strategy Engine's load
//! mechanics (§4.3).

use async_trait::async_trait;
use model::{Row, Schema, TargetSchemaInfo, Value};
use planner::Dialect;

use crate::error::Result;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DbCapabilities {
    /// `TRUNCATE TABLE` exists. Sinks without it fall back to
    /// `DeleteThenInsert` (spec §4.3).
    pub native_truncate: bool,
    /// `INSERT ... ON CONFLICT` / `MERGE` from bind variables directly,
    /// with no staging table required.
    pub native_upsert: bool,
    /// A bulk-load protocol distinct from parameterized `INSERT` exists
    /// (`COPY`, bulk-copy API, `LOAD DATA`) — backs `InsertMode::Bulk`.
    pub bulk_copy: bool,
    pub transactional_ddl: bool,
}

/// One row singled out by the batch failure analyzer's bisection (spec
/// §4.3 "Batch failure analysis").
#[derive(Debug, Clone)]
pub struct BatchFailureReport {
    pub row_index: usize,
    pub column: Option<String>,
    pub native_type: Option<String>,
    pub value: Option<String>,
    pub driver_message: String,
}

#[async_trait]
pub trait SqlAdapter: Send + Sync {
    fn dialect(&self) -> &dyn Dialect;

    fn capabilities(&self) -> DbCapabilities;

    /// Executes a statement with no result set, returning rows affected.
    async fn execute(&self, sql: &str) -> Result<u64>;

    /// Executes a query, returning the inferred schema and materialized
    /// rows. Used both by the Writer Strategy Engine's introspection probes
    /// and by `sql::reader::SqlReader`, which wraps the caller's query in a
    /// dialect-specific `OFFSET`/`FETCH` window per batch rather than
    /// materializing the whole result set at once (spec §4.5).
    async fn query(&self, sql: &str) -> Result<(Schema, Vec<Row>)>;

    async fn table_exists(&self, table: &str) -> Result<bool>;

    /// Builds `TargetSchemaInfo` (spec §3) by inspecting the target's
    /// catalog: native column types, nullability, PK/unique constraints,
    /// row count/size if cheaply available.
    async fn introspect_table(&self, table: &str) -> Result<TargetSchemaInfo>;

    async fn create_table(&self, sql: &str) -> Result<()> {
        self.execute(sql).await.map(|_| ())
    }

    async fn drop_table(&self, table: &str) -> Result<()>;

    async fn truncate_table(&self, table: &str) -> Result<()>;

    async fn delete_all(&self, table: &str) -> Result<()>;

    /// Array-bound insert of a row batch ("Standard" insert mode, spec
    /// §4.3). Concrete adapters may batch multiple rows per round trip.
    async fn insert_rows(&self, table: &str, columns: &[String], rows: &[Row]) -> Result<()>;

    /// Native bulk-load protocol ("Bulk" insert mode). Default falls back
    /// to `insert_rows`; adapters with a real bulk-copy API override this.
    async fn bulk_insert(&self, table: &str, columns: &[String], rows: &[Row]) -> Result<()> {
        self.insert_rows(table, columns, rows).await
    }

    /// Native `INSERT ... ON CONFLICT`/`MERGE` upsert. Only called when
    /// `capabilities().native_upsert` is true; the Writer Strategy Engine
    /// otherwise routes through the staging-table merge helpers below.
    async fn upsert_rows(&self, table: &str, columns: &[String], key_columns: &[String], rows: &[Row]) -> Result<()>;

    /// Native conflict-tolerant insert keeping the existing row (`Ignore`).
    async fn ignore_rows(&self, table: &str, columns: &[String], key_columns: &[String], rows: &[Row]) -> Result<()>;

    /// Creates an empty staging table with the target's schema, for
    /// dialects without a native upsert (spec §4.3 "a staging table with
    /// the target's schema").
    async fn create_staging_like(&self, staging_table: &str, target_table: &str) -> Result<()>;

    /// Merges a populated staging table into the target: updates existing
    /// keys, inserts missing ones (`Upsert`) or inserts-only (`Ignore`,
    /// `insert_only: true`).
    async fn merge_staging(
        &self,
        target_table: &str,
        staging_table: &str,
        columns: &[String],
        key_columns: &[String],
        insert_only: bool,
    ) -> Result<()>;

    /// Narrows a bulk-insert failure by bisecting the batch with
    /// single-row retries (spec §4.3 "Batch failure analysis"). Best-effort
    /// and bounded — returns `None` if inconclusive.
    async fn analyze_batch_failure(
        &self,
        table: &str,
        columns: &[String],
        rows: &[Row],
        driver_message: &str,
    ) -> Option<BatchFailureReport> {
        for (index, row) in rows.iter().enumerate() {
            if self.insert_rows(table, columns, std::slice::from_ref(row)).await.is_err() {
                return Some(BatchFailureReport {
                    row_index: index,
                    column: None,
                    native_type: None,
                    value: row.values().first().map(Value::as_display_string),
                    driver_message: driver_message.to_string(),
                });
            }
        }
        None
    }

    /// Quotes and normalizes `columns` against this adapter's dialect,
    /// resolving each to a physical target column name (spec §4.3 "Key
    /// resolution order": "user-supplied names are normalized to physical
    /// target names via the dialect").
    fn normalize_columns(&self, target: &TargetSchemaInfo, columns: &[String]) -> Vec<String> {
        columns
            .iter()
            .map(|name| {
                let normalized = self.dialect().normalize(name);
                target
                    .columns
                    .iter()
                    .find(|c| self.dialect().normalize(&c.name) == normalized)
                    .map(|c| c.name.clone())
                    .unwrap_or_else(|| name.clone())
            })
            .collect()
    }
}
