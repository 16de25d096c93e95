//! The DuckDB `SqlAdapter`. `duckdb-rs` mirrors `rusqlite`'s synchronous
//! API, so the `spawn_blocking` dispatch pattern matches
//! `sql::sqlite::SqliteAdapter`. Scenario 3 of spec §8 ("Recreate preserves
//! native type") exercises this adapter's `introspect_table` directly.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use duckdb::{types::Value as DuckValue, Connection};

use model::{LogicalType, PipeColumnInfo, Row, Schema, TargetColumnInfo, TargetSchemaInfo, Value};
use planner::dialect::DuckDb as DuckDbDialect;
use planner::{ddl, dml, Dialect};

use crate::error::{ConnectorError, Result};
use crate::sql::base::{DbCapabilities, SqlAdapter};

pub struct DuckDbAdapter {
    conn: Arc<Mutex<Connection>>,
    dialect: DuckDbDialect,
}

impl DuckDbAdapter {
    pub async fn connect(path: &str) -> Result<Self> {
        let path_owned = path.to_string();
        let conn = tokio::task::spawn_blocking(move || {
            if path_owned.is_empty() || path_owned == ":memory:" {
                Connection::open_in_memory()
            } else {
                Connection::open(path_owned)
            }
        })
        .await
        .map_err(|e| ConnectorError::Fatal(e.to_string()))?
        .map_err(|e| ConnectorError::Fatal(e.to_string()))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            dialect: DuckDbDialect,
        })
    }

    async fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> duckdb::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let guard = conn.lock().expect("duckdb connection lock poisoned");
            f(&guard)
        })
        .await
        .map_err(|e| ConnectorError::Fatal(e.to_string()))?
        .map_err(|e| ConnectorError::Fatal(e.to_string()))
    }
}

fn value_to_duck(value: &Value) -> DuckValue {
    match value {
        Value::Bool(v) => DuckValue::Boolean(*v),
        Value::Int8(v) => DuckValue::TinyInt(*v),
        Value::Int16(v) => DuckValue::SmallInt(*v),
        Value::Int32(v) => DuckValue::Int(*v),
        Value::Int64(v) => DuckValue::BigInt(*v),
        Value::Uint8(v) => DuckValue::UTinyInt(*v),
        Value::Uint16(v) => DuckValue::USmallInt(*v),
        Value::Uint32(v) => DuckValue::UInt(*v),
        Value::Uint64(v) => DuckValue::UBigInt(*v),
        Value::Float32(v) => DuckValue::Float(*v),
        Value::Float64(v) => DuckValue::Double(*v),
        Value::Decimal(v) => DuckValue::Text(v.to_string()),
        Value::String(v) => DuckValue::Text(v.clone()),
        Value::Bytes(v) => DuckValue::Blob(v.clone()),
        Value::Date(v) => DuckValue::Text(v.to_string()),
        Value::Timestamp(v) => DuckValue::Text(v.to_rfc3339()),
        Value::TimestampTz(v) => DuckValue::Text(v.to_rfc3339()),
        Value::Uuid(v) => DuckValue::Text(v.to_string()),
        Value::Null => DuckValue::Null,
    }
}

fn duck_to_value(v: DuckValue) -> Value {
    match v {
        DuckValue::Null => Value::Null,
        DuckValue::Boolean(b) => Value::Bool(b),
        DuckValue::TinyInt(i) => Value::Int8(i),
        DuckValue::SmallInt(i) => Value::Int16(i),
        DuckValue::Int(i) => Value::Int32(i),
        DuckValue::BigInt(i) => Value::Int64(i),
        DuckValue::UTinyInt(i) => Value::Uint8(i),
        DuckValue::USmallInt(i) => Value::Uint16(i),
        DuckValue::UInt(i) => Value::Uint32(i),
        DuckValue::UBigInt(i) => Value::Uint64(i),
        DuckValue::Float(f) => Value::Float32(f),
        DuckValue::Double(f) => Value::Float64(f),
        DuckValue::Text(s) => Value::String(s),
        DuckValue::Blob(b) => Value::Bytes(b),
        _ => Value::Null,
    }
}

#[async_trait]
impl SqlAdapter for DuckDbAdapter {
    fn dialect(&self) -> &dyn Dialect {
        &self.dialect
    }

    fn capabilities(&self) -> DbCapabilities {
        DbCapabilities {
            native_truncate: true,
            native_upsert: true,
            bulk_copy: true,
            transactional_ddl: true,
        }
    }

    async fn execute(&self, sql: &str) -> Result<u64> {
        let sql = sql.to_string();
        self.with_conn(move |conn| conn.execute(&sql, []).map(|n| n as u64)).await
    }

    async fn query(&self, sql: &str) -> Result<(Schema, Vec<Row>)> {
        let sql = sql.to_string();
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(&sql)?;
            let col_names: Vec<String> = stmt.column_names();
            let mut rows_out = Vec::new();
            let mut rows = stmt.query([])?;
            while let Some(row) = rows.next()? {
                let mut values = Vec::with_capacity(col_names.len());
                for i in 0..col_names.len() {
                    let v: DuckValue = row.get(i)?;
                    values.push(duck_to_value(v));
                }
                rows_out.push(Row::new(values));
            }
            Ok((col_names, rows_out))
        })
        .await
        .map(|(names, rows)| {
            let schema = Schema::new(names.into_iter().map(|n| PipeColumnInfo::new(n, LogicalType::String, true)).collect());
            (schema, rows)
        })
    }

    async fn table_exists(&self, table: &str) -> Result<bool> {
        let table = table.to_string();
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare("SELECT 1 FROM information_schema.tables WHERE table_name = ?")?;
            Ok(stmt.exists([&table])?)
        })
        .await
    }

    async fn introspect_table(&self, table: &str) -> Result<TargetSchemaInfo> {
        if !self.table_exists(table).await? {
            return Ok(TargetSchemaInfo::missing());
        }
        let table_owned = table.to_string();
        let columns = self
            .with_conn(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT column_name, data_type, is_nullable FROM information_schema.columns \
                     WHERE table_name = ? ORDER BY ordinal_position",
                )?;
                let mut columns = Vec::new();
                let mut rows = stmt.query([&table_owned])?;
                while let Some(row) = rows.next()? {
                    let name: String = row.get(0)?;
                    let native_type: String = row.get(1)?;
                    let is_nullable: String = row.get(2)?;
                    columns.push(TargetColumnInfo {
                        is_primary_key: false,
                        is_unique: false,
                        inferred_logical_type: infer_logical_type(&native_type),
                        name,
                        native_type,
                        nullable: is_nullable == "YES",
                        max_length: None,
                    });
                }
                Ok(columns)
            })
            .await?;
        Ok(TargetSchemaInfo {
            exists: true,
            columns,
            primary_key_columns: Vec::new(),
            row_count: None,
            size_bytes: None,
        })
    }

    async fn drop_table(&self, table: &str) -> Result<()> {
        self.execute(&ddl::drop_table(table, &self.dialect)).await.map(|_| ())
    }

    async fn truncate_table(&self, table: &str) -> Result<()> {
        self.execute(&ddl::truncate_table(table, &self.dialect)).await.map(|_| ())
    }

    async fn delete_all(&self, table: &str) -> Result<()> {
        self.execute(&ddl::delete_all(table, &self.dialect)).await.map(|_| ())
    }

    async fn insert_rows(&self, table: &str, columns: &[String], rows: &[Row]) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }
        let sql = dml::insert_row(table, columns, &self.dialect);
        let rows_owned: Vec<Vec<DuckValue>> = rows.iter().map(|r| r.values().iter().map(value_to_duck).collect()).collect();
        self.with_conn(move |conn| {
            for row in &rows_owned {
                let params: Vec<&dyn duckdb::ToSql> = row.iter().map(|v| v as &dyn duckdb::ToSql).collect();
                conn.execute(&sql, params.as_slice())?;
            }
            Ok(())
        })
        .await
    }

    async fn upsert_rows(&self, table: &str, columns: &[String], key_columns: &[String], rows: &[Row]) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }
        let sql = dml::upsert_on_conflict(table, columns, key_columns, &self.dialect);
        let rows_owned: Vec<Vec<DuckValue>> = rows.iter().map(|r| r.values().iter().map(value_to_duck).collect()).collect();
        self.with_conn(move |conn| {
            for row in &rows_owned {
                let params: Vec<&dyn duckdb::ToSql> = row.iter().map(|v| v as &dyn duckdb::ToSql).collect();
                conn.execute(&sql, params.as_slice())?;
            }
            Ok(())
        })
        .await
    }

    async fn ignore_rows(&self, table: &str, columns: &[String], key_columns: &[String], rows: &[Row]) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }
        let sql = dml::ignore_on_conflict(table, columns, key_columns, &self.dialect);
        let rows_owned: Vec<Vec<DuckValue>> = rows.iter().map(|r| r.values().iter().map(value_to_duck).collect()).collect();
        self.with_conn(move |conn| {
            for row in &rows_owned {
                let params: Vec<&dyn duckdb::ToSql> = row.iter().map(|v| v as &dyn duckdb::ToSql).collect();
                conn.execute(&sql, params.as_slice())?;
            }
            Ok(())
        })
        .await
    }

    async fn create_staging_like(&self, staging_table: &str, target_table: &str) -> Result<()> {
        let target = self.introspect_table(target_table).await?;
        let sql = ddl::create_table_from_native(staging_table, &target.columns, &self.dialect)
            .map_err(|e| ConnectorError::Fatal(e.to_string()))?;
        self.execute(&sql).await.map(|_| ())
    }

    async fn merge_staging(
        &self,
        target_table: &str,
        staging_table: &str,
        columns: &[String],
        key_columns: &[String],
        insert_only: bool,
    ) -> Result<()> {
        let (update_sql, insert_sql) = dml::staging_merge(target_table, staging_table, columns, key_columns, &self.dialect);
        if !insert_only && !update_sql.is_empty() {
            self.execute(&update_sql).await?;
        }
        self.execute(&insert_sql).await.map(|_| ())
    }
}

fn infer_logical_type(native_type: &str) -> LogicalType {
    match native_type.to_ascii_uppercase().as_str() {
        "BOOLEAN" => LogicalType::Bool,
        "TINYINT" => LogicalType::Int8,
        "SMALLINT" => LogicalType::Int16,
        "INTEGER" => LogicalType::Int32,
        "BIGINT" => LogicalType::Int64,
        "FLOAT" => LogicalType::Float32,
        "DOUBLE" => LogicalType::Float64,
        other if other.starts_with("DECIMAL") => LogicalType::Decimal,
        "BLOB" => LogicalType::Bytes,
        "DATE" => LogicalType::Date,
        "TIMESTAMP" => LogicalType::Timestamp,
        "TIMESTAMP WITH TIME ZONE" => LogicalType::TimestampTz,
        "UUID" => LogicalType::Uuid,
        _ => LogicalType::String,
    }
}
