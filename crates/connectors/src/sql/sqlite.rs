//! The SQLite `SqlAdapter`. `rusqlite` is synchronous; every call is
//! dispatched through `spawn_blocking` so the adapter still satisfies the
//! async `SqlAdapter` trait without blocking the kernel's single-threaded
//! batch loop (spec §5 "I/O operations may suspend").

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{types::Value as SqlValue, Connection};

use model::{LogicalType, PipeColumnInfo, Row, Schema, TargetColumnInfo, TargetSchemaInfo, Value};
use planner::dialect::Sqlite as SqliteDialect;
use planner::{ddl, dml, Dialect};

use crate::error::{ConnectorError, Result};
use crate::sql::base::{DbCapabilities, SqlAdapter};

pub struct SqliteAdapter {
    conn: Arc<Mutex<Connection>>,
    dialect: SqliteDialect,
}

impl SqliteAdapter {
    pub async fn connect(path: &str) -> Result<Self> {
        let path_buf = PathBuf::from(path);
        let conn = tokio::task::spawn_blocking(move || Connection::open(path_buf))
            .await
            .map_err(|e| ConnectorError::Fatal(e.to_string()))?
            .map_err(|e| ConnectorError::Fatal(e.to_string()))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            dialect: SqliteDialect,
        })
    }

    async fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> rusqlite::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let guard = conn.lock().expect("sqlite connection lock poisoned");
            f(&guard)
        })
        .await
        .map_err(|e| ConnectorError::Fatal(e.to_string()))?
        .map_err(classify_sqlite_error)
    }
}

fn classify_sqlite_error(err: rusqlite::Error) -> ConnectorError {
    match err {
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::DatabaseBusy => {
            ConnectorError::Transient(err.to_string())
        }
        other => ConnectorError::Fatal(other.to_string()),
    }
}

fn value_to_sql(value: &Value) -> SqlValue {
    match value {
        Value::Bool(v) => SqlValue::Integer(*v as i64),
        Value::Int8(v) => SqlValue::Integer(*v as i64),
        Value::Int16(v) => SqlValue::Integer(*v as i64),
        Value::Int32(v) => SqlValue::Integer(*v as i64),
        Value::Int64(v) => SqlValue::Integer(*v),
        Value::Uint8(v) => SqlValue::Integer(*v as i64),
        Value::Uint16(v) => SqlValue::Integer(*v as i64),
        Value::Uint32(v) => SqlValue::Integer(*v as i64),
        Value::Uint64(v) => SqlValue::Integer(*v as i64),
        Value::Float32(v) => SqlValue::Real(*v as f64),
        Value::Float64(v) => SqlValue::Real(*v),
        Value::Decimal(v) => SqlValue::Text(v.to_string()),
        Value::String(v) => SqlValue::Text(v.clone()),
        Value::Bytes(v) => SqlValue::Blob(v.clone()),
        Value::Date(v) => SqlValue::Text(v.to_string()),
        Value::Timestamp(v) => SqlValue::Text(v.to_rfc3339()),
        Value::TimestampTz(v) => SqlValue::Text(v.to_rfc3339()),
        Value::Uuid(v) => SqlValue::Text(v.to_string()),
        Value::Null => SqlValue::Null,
    }
}

#[async_trait]
impl SqlAdapter for SqliteAdapter {
    fn dialect(&self) -> &dyn Dialect {
        &self.dialect
    }

    fn capabilities(&self) -> DbCapabilities {
        DbCapabilities {
            native_truncate: false,
            native_upsert: true,
            bulk_copy: false,
            transactional_ddl: false,
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
            let col_names: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
            let mut rows_out = Vec::new();
            let mut rows = stmt.query([])?;
            while let Some(row) = rows.next()? {
                let mut values = Vec::with_capacity(col_names.len());
                for i in 0..col_names.len() {
                    let v: SqlValue = row.get(i)?;
                    values.push(sqlite_value_to_model(v));
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
            let mut stmt = conn.prepare("SELECT 1 FROM sqlite_master WHERE type='table' AND name = ?1")?;
            Ok(stmt.exists([&table])?)
        })
        .await
    }

    async fn introspect_table(&self, table: &str) -> Result<TargetSchemaInfo> {
        if !self.table_exists(table).await? {
            return Ok(TargetSchemaInfo::missing());
        }
        let table_owned = table.to_string();
        let (columns, pk) = self
            .with_conn(move |conn| {
                let mut stmt = conn.prepare(&format!("PRAGMA table_info({table_owned})"))?;
                let mut columns = Vec::new();
                let mut pk = Vec::new();
                let mut rows = stmt.query([])?;
                while let Some(row) = rows.next()? {
                    let name: String = row.get(1)?;
                    let native_type: String = row.get(2)?;
                    let not_null: i64 = row.get(3)?;
                    let pk_index: i64 = row.get(5)?;
                    if pk_index > 0 {
                        pk.push(name.clone());
                    }
                    columns.push(TargetColumnInfo {
                        is_primary_key: pk_index > 0,
                        is_unique: pk_index > 0,
                        inferred_logical_type: infer_logical_type(&native_type),
                        name,
                        native_type,
                        nullable: not_null == 0,
                        max_length: None,
                    });
                }
                Ok((columns, pk))
            })
            .await?;
        Ok(TargetSchemaInfo {
            exists: true,
            columns,
            primary_key_columns: pk,
            row_count: None,
            size_bytes: None,
        })
    }

    async fn drop_table(&self, table: &str) -> Result<()> {
        self.execute(&ddl::drop_table(table, &self.dialect)).await.map(|_| ())
    }

    async fn truncate_table(&self, table: &str) -> Result<()> {
        self.delete_all(table).await
    }

    async fn delete_all(&self, table: &str) -> Result<()> {
        self.execute(&ddl::delete_all(table, &self.dialect)).await.map(|_| ())
    }

    async fn insert_rows(&self, table: &str, columns: &[String], rows: &[Row]) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }
        let sql = dml::insert_row(table, columns, &self.dialect);
        let rows_owned: Vec<Vec<SqlValue>> = rows.iter().map(|r| r.values().iter().map(value_to_sql).collect()).collect();
        self.with_conn(move |conn| {
            for row in &rows_owned {
                let params: Vec<&dyn rusqlite::ToSql> = row.iter().map(|v| v as &dyn rusqlite::ToSql).collect();
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
        let rows_owned: Vec<Vec<SqlValue>> = rows.iter().map(|r| r.values().iter().map(value_to_sql).collect()).collect();
        self.with_conn(move |conn| {
            for row in &rows_owned {
                let params: Vec<&dyn rusqlite::ToSql> = row.iter().map(|v| v as &dyn rusqlite::ToSql).collect();
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
        let rows_owned: Vec<Vec<SqlValue>> = rows.iter().map(|r| r.values().iter().map(value_to_sql).collect()).collect();
        self.with_conn(move |conn| {
            for row in &rows_owned {
                let params: Vec<&dyn rusqlite::ToSql> = row.iter().map(|v| v as &dyn rusqlite::ToSql).collect();
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

fn sqlite_value_to_model(v: SqlValue) -> Value {
    match v {
        SqlValue::Null => Value::Null,
        SqlValue::Integer(i) => Value::Int64(i),
        SqlValue::Real(f) => Value::Float64(f),
        SqlValue::Text(s) => Value::String(s),
        SqlValue::Blob(b) => Value::Bytes(b),
    }
}

fn infer_logical_type(native_type: &str) -> LogicalType {
    let upper = native_type.to_ascii_uppercase();
    if upper.contains("INT") {
        LogicalType::Int64
    } else if upper.contains("REAL") || upper.contains("FLOA") || upper.contains("DOUB") {
        LogicalType::Float64
    } else if upper.contains("BLOB") {
        LogicalType::Bytes
    } else {
        LogicalType::String
    }
}
