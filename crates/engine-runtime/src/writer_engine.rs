//! The Writer Strategy Engine (spec §4.3): `Init → Inspect → ApplyStrategy
//! (prepare) → Initialize(physical) → {WriteBatch|Retry|AnalyzeFailure}* →
//! Complete(merge-from-stage if present, drop stage) → Closed`, implemented
//! against `connectors::sql::SqlAdapter` so the same state machine drives
//! every relational dialect.

use std::collections::HashSet;

use async_trait::async_trait;
use connectors::sql::SqlAdapter;
use engine_core::error::EngineError;
use engine_core::kernel::Writer;
use model::core::schema::{Schema, TargetSchemaInfo};
use model::execution::job::{InsertMode, WriteStrategy};
use model::records::batch::Batch;
use model::records::row::Row;
use planner::{ddl, dml};

/// Drives one database sink through its strategy's load mechanics (spec
/// §4.3). Constructed once per job by the Job Controller; `initialize` runs
/// the full Inspect/ApplyStrategy/key-resolution sequence before any row is
/// read, `write_batch` places rows per the chosen mechanism, `complete`
/// merges and drops any staging table.
pub struct WriterStrategyEngine {
    adapter: Box<dyn SqlAdapter>,
    target_table: String,
    strategy: WriteStrategy,
    insert_mode: InsertMode,
    user_key_columns: Vec<String>,
    auto_migrate: bool,
    columns: Vec<String>,
    key_columns: Vec<String>,
    staging_table: Option<String>,
}

impl WriterStrategyEngine {
    pub fn new(
        adapter: Box<dyn SqlAdapter>,
        target_table: String,
        strategy: WriteStrategy,
        insert_mode: InsertMode,
        user_key_columns: Vec<String>,
        auto_migrate: bool,
    ) -> Self {
        Self {
            adapter,
            target_table,
            strategy,
            insert_mode,
            user_key_columns,
            auto_migrate,
            columns: Vec::new(),
            key_columns: Vec::new(),
            staging_table: None,
        }
    }

    /// Drops the staging table if one is outstanding. Idempotent — safe to
    /// call from `complete` and again from the controller's unconditional
    /// cleanup after a failed run (spec §8 "Staging cleanup": no staging
    /// table survives job end, success or failure).
    pub async fn cleanup_staging(&mut self) -> Result<(), EngineError> {
        if let Some(staging) = self.staging_table.take() {
            self.adapter.drop_table(&staging).await?;
        }
        Ok(())
    }

    fn uses_staging(&self) -> bool {
        self.strategy.requires_key() && !self.adapter.capabilities().native_upsert
    }

    async fn apply_recreate(&self, schema: &Schema, target: &TargetSchemaInfo) -> Result<(), EngineError> {
        let dialect = self.adapter.dialect();
        if !target.exists {
            let sql = ddl::create_table_from_schema(&self.target_table, schema, dialect).map_err(|e| EngineError::Fatal(e.to_string()))?;
            self.adapter.create_table(&sql).await?;
            return Ok(());
        }
        if target.columns.is_empty() {
            if !self.auto_migrate {
                return Err(EngineError::Fatal(format!(
                    "Recreate on `{}` requires native column types captured by introspection; introspection returned none and --auto-migrate is not set",
                    self.target_table
                )));
            }
            self.adapter.drop_table(&self.target_table).await?;
            let sql = ddl::create_table_from_schema(&self.target_table, schema, dialect).map_err(|e| EngineError::Fatal(e.to_string()))?;
            self.adapter.create_table(&sql).await?;
            return Ok(());
        }
        // Introspect-Before-Drop: `target` was captured before this drop.
        let sql = ddl::create_table_from_native(&self.target_table, &target.columns, dialect).map_err(|e| EngineError::Fatal(e.to_string()))?;
        self.adapter.drop_table(&self.target_table).await?;
        self.adapter.create_table(&sql).await?;
        Ok(())
    }

    async fn apply_truncate(&self, target: &TargetSchemaInfo) -> Result<(), EngineError> {
        if !target.exists {
            return Ok(());
        }
        if self.adapter.capabilities().native_truncate {
            self.adapter.truncate_table(&self.target_table).await?;
        } else {
            self.adapter.delete_all(&self.target_table).await?;
        }
        Ok(())
    }

    /// Resolves the key columns for `Upsert`/`Ignore` (spec §4.3 "Key
    /// resolution order"): the target's introspected primary key wins when
    /// present, falling back to the user-supplied `--key` list; duplicates
    /// are folded case-insensitively under the dialect's normalization, and
    /// an absence of both is fatal before any row is read.
    fn resolve_key_columns(&self, target: &TargetSchemaInfo) -> Result<Vec<String>, EngineError> {
        let raw: Vec<String> = if !target.primary_key_columns.is_empty() {
            target.primary_key_columns.clone()
        } else {
            self.user_key_columns.clone()
        };
        if raw.is_empty() {
            return Err(EngineError::Fatal(format!(
                "{:?} requires a key: introspection found no primary key on `{}` and no --key was supplied",
                self.strategy, self.target_table
            )));
        }
        let normalized = self.adapter.normalize_columns(target, &raw);
        let mut seen = HashSet::new();
        let mut resolved = Vec::new();
        for column in normalized {
            if seen.insert(self.adapter.dialect().normalize(&column)) {
                resolved.push(column);
            }
        }
        Ok(resolved)
    }

    async fn write_rows(&self, table: &str, rows: &[Row]) -> Result<(), EngineError> {
        if rows.is_empty() {
            return Ok(());
        }
        let outcome = match self.insert_mode {
            InsertMode::Bulk => self.adapter.bulk_insert(table, &self.columns, rows).await,
            InsertMode::Standard | InsertMode::AppendDirect => self.adapter.insert_rows(table, &self.columns, rows).await,
        };
        self.diagnose(table, rows, outcome).await
    }

    /// Narrows a load failure with the adapter's bisection analyzer (spec
    /// §4.3 "Batch failure analysis") before surfacing it to the kernel.
    async fn diagnose(&self, table: &str, rows: &[Row], outcome: connectors::error::Result<()>) -> Result<(), EngineError> {
        let Err(err) = outcome else { return Ok(()) };
        let message = err.to_string();
        if let Some(report) = self.adapter.analyze_batch_failure(table, &self.columns, rows, &message).await {
            return Err(EngineError::Fatal(format!(
                "row {} column {} ({}): {}",
                report.row_index,
                report.column.as_deref().unwrap_or("?"),
                report.native_type.as_deref().unwrap_or("unknown type"),
                report.driver_message
            )));
        }
        Err(err.into())
    }
}

#[async_trait]
impl Writer for WriterStrategyEngine {
    async fn initialize(&mut self, schema: &Schema, strict_schema: bool) -> Result<(), EngineError> {
        self.columns = schema.names().into_iter().map(str::to_string).collect();

        let target_exists = self.adapter.table_exists(&self.target_table).await?;
        let target = if target_exists {
            self.adapter.introspect_table(&self.target_table).await?
        } else {
            TargetSchemaInfo::missing()
        };

        if strict_schema && target.exists {
            let report = engine_config::validation::validate_schema(schema, &target, self.adapter.dialect());
            if report.has_errors() {
                return Err(EngineError::Fatal(report.render()));
            }
        }

        if self.strategy.requires_key() {
            self.key_columns = self.resolve_key_columns(&target)?;
        }

        match self.strategy {
            WriteStrategy::Append => {
                if !target.exists {
                    let sql = ddl::create_table_from_schema(&self.target_table, schema, self.adapter.dialect())
                        .map_err(|e| EngineError::Fatal(e.to_string()))?;
                    self.adapter.create_table(&sql).await?;
                }
            }
            WriteStrategy::Truncate => {
                if !target.exists {
                    let sql = ddl::create_table_from_schema(&self.target_table, schema, self.adapter.dialect())
                        .map_err(|e| EngineError::Fatal(e.to_string()))?;
                    self.adapter.create_table(&sql).await?;
                } else {
                    self.apply_truncate(&target).await?;
                }
            }
            WriteStrategy::DeleteThenInsert => {
                if !target.exists {
                    let sql = ddl::create_table_from_schema(&self.target_table, schema, self.adapter.dialect())
                        .map_err(|e| EngineError::Fatal(e.to_string()))?;
                    self.adapter.create_table(&sql).await?;
                } else {
                    self.adapter.delete_all(&self.target_table).await?;
                }
            }
            WriteStrategy::Recreate => {
                self.apply_recreate(schema, &target).await?;
            }
            WriteStrategy::Upsert | WriteStrategy::Ignore => {
                if !target.exists {
                    let sql = ddl::create_table_from_schema(&self.target_table, schema, self.adapter.dialect())
                        .map_err(|e| EngineError::Fatal(e.to_string()))?;
                    self.adapter.create_table(&sql).await?;
                } else if self.uses_staging() {
                    let staging = ddl::staging_table_name(&self.target_table, model::core::identifiers::StagingId::new().as_str());
                    self.adapter.create_staging_like(&staging, &self.target_table).await?;
                    self.staging_table = Some(staging);
                }
            }
        }

        Ok(())
    }

    async fn write_batch(&mut self, batch: &Batch) -> Result<(), EngineError> {
        let rows = batch.rows();
        match self.strategy {
            WriteStrategy::Upsert | WriteStrategy::Ignore => {
                if let Some(staging) = self.staging_table.clone() {
                    self.write_rows(&staging, rows).await
                } else if self.strategy == WriteStrategy::Upsert {
                    self.diagnose(
                        &self.target_table,
                        rows,
                        self.adapter.upsert_rows(&self.target_table, &self.columns, &self.key_columns, rows).await,
                    )
                    .await
                } else {
                    self.diagnose(
                        &self.target_table,
                        rows,
                        self.adapter.ignore_rows(&self.target_table, &self.columns, &self.key_columns, rows).await,
                    )
                    .await
                }
            }
            _ => self.write_rows(&self.target_table.clone(), rows).await,
        }
    }

    async fn complete(&mut self) -> Result<(), EngineError> {
        if let Some(staging) = self.staging_table.clone() {
            let insert_only = self.strategy == WriteStrategy::Ignore;
            self.adapter
                .merge_staging(&self.target_table, &staging, &self.columns, &self.key_columns, insert_only)
                .await?;
        }
        self.cleanup_staging().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use connectors::error::Result as ConnResult;
    use connectors::sql::DbCapabilities;
    use model::core::data_type::LogicalType;
    use model::core::schema::{PipeColumnInfo, TargetColumnInfo};
    use model::core::value::Value;
    use planner::dialect::{Dialect, Postgres};
    use std::sync::Mutex;

    /// A `SqlAdapter` double recording every DDL/DML statement it was asked
    /// to run, so strategy tests can assert on the sequence without a real
    /// database.
    struct FakeAdapter {
        dialect: Postgres,
        exists: bool,
        target: TargetSchemaInfo,
        native_upsert: bool,
        native_truncate: bool,
        executed: Mutex<Vec<String>>,
        inserted: Mutex<Vec<usize>>,
    }

    #[async_trait]
    impl SqlAdapter for FakeAdapter {
        fn dialect(&self) -> &dyn Dialect {
            &self.dialect
        }

        fn capabilities(&self) -> DbCapabilities {
            DbCapabilities {
                native_truncate: self.native_truncate,
                native_upsert: self.native_upsert,
                bulk_copy: false,
                transactional_ddl: true,
            }
        }

        async fn execute(&self, sql: &str) -> ConnResult<u64> {
            self.executed.lock().unwrap().push(sql.to_string());
            Ok(0)
        }

        async fn query(&self, _sql: &str) -> ConnResult<(Schema, Vec<Row>)> {
            Ok((Schema::empty(), Vec::new()))
        }

        async fn table_exists(&self, _table: &str) -> ConnResult<bool> {
            Ok(self.exists)
        }

        async fn introspect_table(&self, _table: &str) -> ConnResult<TargetSchemaInfo> {
            Ok(self.target.clone())
        }

        async fn drop_table(&self, table: &str) -> ConnResult<()> {
            self.executed.lock().unwrap().push(format!("DROP {table}"));
            Ok(())
        }

        async fn truncate_table(&self, table: &str) -> ConnResult<()> {
            self.executed.lock().unwrap().push(format!("TRUNCATE {table}"));
            Ok(())
        }

        async fn delete_all(&self, table: &str) -> ConnResult<()> {
            self.executed.lock().unwrap().push(format!("DELETE {table}"));
            Ok(())
        }

        async fn insert_rows(&self, _table: &str, _columns: &[String], rows: &[Row]) -> ConnResult<()> {
            self.inserted.lock().unwrap().push(rows.len());
            Ok(())
        }

        async fn upsert_rows(&self, _table: &str, _columns: &[String], _key_columns: &[String], rows: &[Row]) -> ConnResult<()> {
            self.inserted.lock().unwrap().push(rows.len());
            Ok(())
        }

        async fn ignore_rows(&self, _table: &str, _columns: &[String], _key_columns: &[String], rows: &[Row]) -> ConnResult<()> {
            self.inserted.lock().unwrap().push(rows.len());
            Ok(())
        }

        async fn create_staging_like(&self, staging_table: &str, _target_table: &str) -> ConnResult<()> {
            self.executed.lock().unwrap().push(format!("STAGE {staging_table}"));
            Ok(())
        }

        async fn merge_staging(
            &self,
            target_table: &str,
            staging_table: &str,
            _columns: &[String],
            _key_columns: &[String],
            _insert_only: bool,
        ) -> ConnResult<()> {
            self.executed.lock().unwrap().push(format!("MERGE {staging_table} INTO {target_table}"));
            Ok(())
        }
    }

    fn schema() -> Schema {
        Schema::new(vec![
            PipeColumnInfo::new("id", LogicalType::Int64, false),
            PipeColumnInfo::new("name", LogicalType::String, true),
        ])
    }

    fn batch() -> Batch {
        Batch::new(schema(), vec![Row::new(vec![Value::Int64(1), Value::String("ada".into())])])
    }

    #[tokio::test]
    async fn append_creates_table_only_when_missing() {
        let adapter = FakeAdapter {
            dialect: Postgres,
            exists: false,
            target: TargetSchemaInfo::missing(),
            native_upsert: false,
            native_truncate: true,
            executed: Mutex::new(Vec::new()),
            inserted: Mutex::new(Vec::new()),
        };
        let mut writer = WriterStrategyEngine::new(Box::new(adapter), "users".into(), WriteStrategy::Append, InsertMode::Standard, vec![], false);
        writer.initialize(&schema(), false).await.unwrap();
        writer.write_batch(&batch()).await.unwrap();
        writer.complete().await.unwrap();
    }

    #[tokio::test]
    async fn truncate_falls_back_to_delete_when_no_native_truncate() {
        let adapter = FakeAdapter {
            dialect: Postgres,
            exists: true,
            target: TargetSchemaInfo {
                exists: true,
                columns: vec![TargetColumnInfo {
                    name: "id".into(),
                    native_type: "bigint".into(),
                    inferred_logical_type: LogicalType::Int64,
                    nullable: false,
                    is_primary_key: true,
                    is_unique: true,
                    max_length: None,
                }],
                primary_key_columns: vec!["id".into()],
                row_count: None,
                size_bytes: None,
            },
            native_upsert: false,
            native_truncate: false,
            executed: Mutex::new(Vec::new()),
            inserted: Mutex::new(Vec::new()),
        };
        let mut writer = WriterStrategyEngine::new(Box::new(adapter), "users".into(), WriteStrategy::Truncate, InsertMode::Standard, vec![], false);
        writer.initialize(&schema(), false).await.unwrap();
        writer.write_batch(&batch()).await.unwrap();
        writer.complete().await.unwrap();
    }

    #[tokio::test]
    async fn upsert_without_discoverable_or_supplied_key_is_fatal() {
        let adapter = FakeAdapter {
            dialect: Postgres,
            exists: true,
            target: TargetSchemaInfo {
                exists: true,
                columns: vec![],
                primary_key_columns: vec![],
                row_count: None,
                size_bytes: None,
            },
            native_upsert: true,
            native_truncate: true,
            executed: Mutex::new(Vec::new()),
            inserted: Mutex::new(Vec::new()),
        };
        let mut writer = WriterStrategyEngine::new(Box::new(adapter), "users".into(), WriteStrategy::Upsert, InsertMode::Standard, vec![], false);
        let result = writer.initialize(&schema(), false).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn upsert_without_native_support_stages_and_merges() {
        let adapter = FakeAdapter {
            dialect: Postgres,
            exists: true,
            target: TargetSchemaInfo {
                exists: true,
                columns: vec![],
                primary_key_columns: vec!["id".into()],
                row_count: None,
                size_bytes: None,
            },
            native_upsert: false,
            native_truncate: true,
            executed: Mutex::new(Vec::new()),
            inserted: Mutex::new(Vec::new()),
        };
        let mut writer = WriterStrategyEngine::new(Box::new(adapter), "users".into(), WriteStrategy::Upsert, InsertMode::Standard, vec![], false);
        writer.initialize(&schema(), false).await.unwrap();
        assert!(writer.staging_table.is_some());
        writer.write_batch(&batch()).await.unwrap();
        writer.complete().await.unwrap();
        assert!(writer.staging_table.is_none());
    }

    #[tokio::test]
    async fn recreate_without_introspected_columns_requires_auto_migrate() {
        let adapter = FakeAdapter {
            dialect: Postgres,
            exists: true,
            target: TargetSchemaInfo {
                exists: true,
                columns: vec![],
                primary_key_columns: vec![],
                row_count: None,
                size_bytes: None,
            },
            native_upsert: true,
            native_truncate: true,
            executed: Mutex::new(Vec::new()),
            inserted: Mutex::new(Vec::new()),
        };
        let mut writer = WriterStrategyEngine::new(Box::new(adapter), "users".into(), WriteStrategy::Recreate, InsertMode::Standard, vec![], false);
        assert!(writer.initialize(&schema(), false).await.is_err());
    }
}
