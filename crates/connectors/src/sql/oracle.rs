//! The Oracle `SqlAdapter`. The `oracle` crate (OCI bindings) is
//! synchronous like `rusqlite`/`duckdb`, so calls are dispatched through
//! `spawn_blocking`. Kept thinner than the Postgres/SQLite adapters: Oracle
//! is the least-common target in this kernel's expected deployments, and
//! its `MERGE INTO` support lets it skip the staging-table path entirely
//! (`capabilities().native_upsert` is true via `planner::dml::merge_into`).

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use oracle::Connection;

use model::{LogicalType, PipeColumnInfo, Row, Schema, TargetColumnInfo, TargetSchemaInfo, Value};
use planner::dialect::Oracle as OracleDialect;
use planner::{ddl, dml, Dialect};

use crate::error::{ConnectorError, Result};
use crate::sql::base::{DbCapabilities, SqlAdapter};

pub struct OracleAdapter {
    conn: Arc<Mutex<Connection>>,
    dialect: OracleDialect,
}

impl OracleAdapter {
    pub async fn connect(connect_string: &str, user: &str, password: &str) -> Result<Self> {
        let connect_string = connect_string.to_string();
        let user = user.to_string();
        let password = password.to_string();
        let conn = tokio::task::spawn_blocking(move || Connection::connect(user, password, connect_string))
            .await
            .map_err(|e| ConnectorError::Fatal(e.to_string()))?
            .map_err(|e| ConnectorError::Fatal(e.to_string()))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            dialect: OracleDialect,
        })
    }

    async fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> oracle::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let guard = conn.lock().expect("oracle connection lock poisoned");
            f(&guard)
        })
        .await
        .map_err(|e| ConnectorError::Fatal(e.to_string()))?
        .map_err(classify_oracle_error)
    }
}

fn classify_oracle_error(err: oracle::Error) -> ConnectorError {
    match &err {
        oracle::Error::NetworkError(_) => ConnectorError::Transient(err.to_string()),
        _ => ConnectorError::Fatal(err.to_string()),
    }
}

fn value_to_sql_param(value: &Value) -> String {
    // Bind-by-position via oracle-rs requires concrete Rust types per
    // parameter; since columns arrive as heterogeneous `Value`s here, this
    // adapter renders literals rather than binding, matching the approach
    // taken for the other secondary dialect (mssql).
    match value {
        Value::Null => "NULL".to_string(),
        Value::Bool(v) => if *v { "1".to_string() } else { "0".to_string() },
        Value::Int8(v) => v.to_string(),
        Value::Int16(v) => v.to_string(),
        Value::Int32(v) => v.to_string(),
        Value::Int64(v) => v.to_string(),
        Value::Uint8(v) => v.to_string(),
        Value::Uint16(v) => v.to_string(),
        Value::Uint32(v) => v.to_string(),
        Value::Uint64(v) => v.to_string(),
        Value::Float32(v) => v.to_string(),
        Value::Float64(v) => v.to_string(),
        Value::Decimal(v) => v.to_string(),
        Value::String(v) => format!("'{}'", v.replace('\'', "''")),
        Value::Bytes(v) => format!("hextoraw('{}')", v.iter().map(|b| format!("{b:02x}")).collect::<String>()),
        Value::Date(v) => format!("DATE '{v}'"),
        Value::Timestamp(v) => format!("TIMESTAMP '{}'", v.format("%Y-%m-%d %H:%M:%S")),
        Value::TimestampTz(v) => format!("TIMESTAMP '{}'", v.format("%Y-%m-%d %H:%M:%S%:z")),
        Value::Uuid(v) => format!("'{v}'"),
    }
}

#[async_trait]
impl SqlAdapter for OracleAdapter {
    fn dialect(&self) -> &dyn Dialect {
        &self.dialect
    }

    fn capabilities(&self) -> DbCapabilities {
        DbCapabilities {
            native_truncate: true,
            native_upsert: true,
            bulk_copy: false,
            transactional_ddl: false,
        }
    }

    async fn execute(&self, sql: &str) -> Result<u64> {
        let sql = sql.to_string();
        self.with_conn(move |conn| {
            let count = conn.execute(&sql, &[])?.row_count()?;
            conn.commit()?;
            Ok(count)
        })
        .await
    }

    async fn query(&self, sql: &str) -> Result<(Schema, Vec<Row>)> {
        let sql = sql.to_string();
        self.with_conn(move |conn| {
            let rows_stmt = conn.query(&sql, &[])?;
            let col_names: Vec<String> = rows_stmt.column_info().iter().map(|c| c.name().to_string()).collect();
            let mut out = Vec::new();
            for row_result in rows_stmt {
                let row = row_result?;
                let mut values = Vec::with_capacity(col_names.len());
                for i in 0..col_names.len() {
                    let v: Option<String> = row.get(i)?;
                    values.push(v.map(Value::String).unwrap_or(Value::Null));
                }
                out.push(Row::new(values));
            }
            Ok((col_names, out))
        })
        .await
        .map(|(names, rows)| {
            let schema = Schema::new(names.into_iter().map(|n| PipeColumnInfo::new(n, LogicalType::String, true)).collect());
            (schema, rows)
        })
    }

    async fn table_exists(&self, table: &str) -> Result<bool> {
        let sql = format!(
            "SELECT 1 FROM user_tables WHERE table_name = UPPER('{}')",
            table.replace('\'', "''")
        );
        let (_, rows) = self.query(&sql).await?;
        Ok(!rows.is_empty())
    }

    async fn introspect_table(&self, table: &str) -> Result<TargetSchemaInfo> {
        if !self.table_exists(table).await? {
            return Ok(TargetSchemaInfo::missing());
        }
        let sql = format!(
            "SELECT c.column_name, c.data_type, c.nullable, \
             CASE WHEN pk.column_name IS NOT NULL THEN 1 ELSE 0 END \
             FROM user_tab_columns c \
             LEFT JOIN ( \
               SELECT cols.column_name FROM user_constraints cons \
               JOIN user_cons_columns cols ON cons.constraint_name = cols.constraint_name \
               WHERE cons.constraint_type = 'P' AND cons.table_name = UPPER('{table}') \
             ) pk ON pk.column_name = c.column_name \
             WHERE c.table_name = UPPER('{table}') ORDER BY c.column_id",
        );
        let (_, rows) = self.query(&sql).await?;
        let mut columns = Vec::new();
        let mut primary_key_columns = Vec::new();
        for row in rows {
            let vals = row.values();
            let name = vals[0].as_display_string();
            let native_type = vals[1].as_display_string();
            let nullable = vals[2].as_display_string() == "Y";
            let is_pk = vals[3].as_display_string() == "1";
            if is_pk {
                primary_key_columns.push(name.clone());
            }
            columns.push(TargetColumnInfo {
                is_primary_key: is_pk,
                is_unique: is_pk,
                inferred_logical_type: infer_logical_type(&native_type),
                name,
                native_type,
                nullable,
                max_length: None,
            });
        }
        Ok(TargetSchemaInfo {
            exists: true,
            columns,
            primary_key_columns,
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
        let col_list: Vec<String> = columns.iter().map(|c| self.dialect.render_identifier(c, false)).collect();
        let tuples: Vec<String> = rows
            .iter()
            .map(|row| {
                let rendered: Vec<String> = row.values().iter().map(value_to_sql_param).collect();
                format!("INTO {} ({}) VALUES ({})", self.dialect.render_identifier(table, false), col_list.join(", "), rendered.join(", "))
            })
            .collect();
        let sql = format!("INSERT ALL {} SELECT 1 FROM dual", tuples.join(" "));
        self.execute(&sql).await.map(|_| ())
    }

    async fn upsert_rows(&self, table: &str, columns: &[String], key_columns: &[String], rows: &[Row]) -> Result<()> {
        for row in rows {
            let values: Vec<String> = row.values().iter().map(value_to_sql_param).collect();
            let sql = merge_with_literals(table, columns, key_columns, &values, &self.dialect);
            self.execute(&sql).await?;
        }
        Ok(())
    }

    async fn ignore_rows(&self, table: &str, columns: &[String], key_columns: &[String], rows: &[Row]) -> Result<()> {
        // Oracle's MERGE without a WHEN MATCHED clause behaves as Ignore.
        for row in rows {
            let values: Vec<String> = row.values().iter().map(value_to_sql_param).collect();
            let sql = merge_with_literals(table, columns, key_columns, &values, &self.dialect);
            self.execute(&sql).await?;
        }
        Ok(())
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

/// `merge_into`'s placeholder-bound `SELECT ... FROM dual` rewritten with
/// literal values already substituted for each placeholder, in source
/// (column) order.
fn merge_with_literals(table: &str, columns: &[String], key_columns: &[String], values: &[String], dialect: &dyn Dialect) -> String {
    let templated = dml::merge_into(table, columns, key_columns, dialect);
    let mut out = templated;
    for (i, value) in values.iter().enumerate() {
        out = out.replacen(&dialect.placeholder(i + 1), value, 1);
    }
    out
}

fn infer_logical_type(native_type: &str) -> LogicalType {
    let upper = native_type.to_ascii_uppercase();
    match upper.as_str() {
        "NUMBER" => LogicalType::Decimal,
        "BINARY_FLOAT" => LogicalType::Float32,
        "BINARY_DOUBLE" => LogicalType::Float64,
        "DATE" => LogicalType::Date,
        "BLOB" | "RAW" | "LONG RAW" => LogicalType::Bytes,
        _ if upper.starts_with("TIMESTAMP") && upper.contains("TIME ZONE") => LogicalType::TimestampTz,
        _ if upper.starts_with("TIMESTAMP") => LogicalType::Timestamp,
        _ => LogicalType::String,
    }
}
