//! The PostgreSQL `SqlAdapter` (spec §6). Out of scope per spec §1 ("the
//! concrete wire drivers for each database" are external collaborators):
//! this adapter is kept to the operations the Writer Strategy Engine and
//! `SqlReader` actually drive, not a general-purpose Postgres client.

use std::sync::Arc;

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, Utc};
use tokio_postgres::types::{ToSql, Type};
use tokio_postgres::{Client, NoTls, Row as PgRow};
use uuid::Uuid;

use model::{LogicalType, PipeColumnInfo, Row, Schema, TargetColumnInfo, TargetSchemaInfo, Value};
use planner::dialect::Postgres as PostgresDialect;
use planner::{ddl, dml, Dialect};

use crate::error::{ConnectorError, Result};
use crate::sql::base::{DbCapabilities, SqlAdapter};

pub struct PostgresAdapter {
    client: Arc<Client>,
    dialect: PostgresDialect,
}

impl PostgresAdapter {
    pub async fn connect(conn_str: &str) -> Result<Self> {
        let (client, connection) = tokio_postgres::connect(conn_str, NoTls)
            .await
            .map_err(|e| ConnectorError::Transient(e.to_string()))?;
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::error!("postgres connection closed: {e}");
            }
        });
        Ok(Self {
            client: Arc::new(client),
            dialect: PostgresDialect,
        })
    }

    fn params_for(values: &[Value]) -> Vec<Box<dyn ToSql + Sync + Send>> {
        values.iter().map(value_to_sql).collect()
    }

    async fn exec_params(&self, sql: &str, values: &[Value]) -> Result<u64> {
        let boxed = Self::params_for(values);
        let refs: Vec<&(dyn ToSql + Sync)> = boxed.iter().map(|b| b.as_ref() as &(dyn ToSql + Sync)).collect();
        self.client
            .execute(sql, &refs)
            .await
            .map_err(classify_pg_error)
    }
}

fn value_to_sql(value: &Value) -> Box<dyn ToSql + Sync + Send> {
    match value {
        Value::Bool(v) => Box::new(*v),
        Value::Int8(v) => Box::new(*v as i16),
        Value::Int16(v) => Box::new(*v),
        Value::Int32(v) => Box::new(*v),
        Value::Int64(v) => Box::new(*v),
        Value::Uint8(v) => Box::new(*v as i16),
        Value::Uint16(v) => Box::new(*v as i32),
        Value::Uint32(v) => Box::new(*v as i64),
        Value::Uint64(v) => Box::new(*v as i64),
        Value::Float32(v) => Box::new(*v),
        Value::Float64(v) => Box::new(*v),
        Value::Decimal(v) => Box::new(v.to_string()),
        Value::String(v) => Box::new(v.clone()),
        Value::Bytes(v) => Box::new(v.clone()),
        Value::Date(v) => Box::new(*v),
        Value::Timestamp(v) => Box::new(*v),
        Value::TimestampTz(v) => Box::new(*v),
        Value::Uuid(v) => Box::new(*v),
        Value::Null => Box::new(Option::<String>::None),
    }
}

fn classify_pg_error(err: tokio_postgres::Error) -> ConnectorError {
    if err.is_closed() {
        ConnectorError::Transient(err.to_string())
    } else {
        ConnectorError::Fatal(err.to_string())
    }
}

fn logical_type_for(pg_type: &Type) -> LogicalType {
    match *pg_type {
        Type::BOOL => LogicalType::Bool,
        Type::INT2 => LogicalType::Int16,
        Type::INT4 => LogicalType::Int32,
        Type::INT8 => LogicalType::Int64,
        Type::FLOAT4 => LogicalType::Float32,
        Type::FLOAT8 => LogicalType::Float64,
        Type::NUMERIC => LogicalType::Decimal,
        Type::TEXT | Type::VARCHAR | Type::BPCHAR => LogicalType::String,
        Type::BYTEA => LogicalType::Bytes,
        Type::DATE => LogicalType::Date,
        Type::TIMESTAMP => LogicalType::Timestamp,
        Type::TIMESTAMPTZ => LogicalType::TimestampTz,
        Type::UUID => LogicalType::Uuid,
        _ => LogicalType::String,
    }
}

fn row_value(row: &PgRow, idx: usize, logical_type: LogicalType) -> Value {
    match logical_type {
        LogicalType::Bool => row.try_get::<_, Option<bool>>(idx).ok().flatten().map(Value::Bool),
        LogicalType::Int16 | LogicalType::Int8 => row.try_get::<_, Option<i16>>(idx).ok().flatten().map(|v| Value::Int16(v)),
        LogicalType::Int32 => row.try_get::<_, Option<i32>>(idx).ok().flatten().map(Value::Int32),
        LogicalType::Int64 => row.try_get::<_, Option<i64>>(idx).ok().flatten().map(Value::Int64),
        LogicalType::Float32 => row.try_get::<_, Option<f32>>(idx).ok().flatten().map(Value::Float32),
        LogicalType::Float64 => row.try_get::<_, Option<f64>>(idx).ok().flatten().map(Value::Float64),
        LogicalType::Decimal => row
            .try_get::<_, Option<String>>(idx)
            .ok()
            .flatten()
            .and_then(|s| s.parse::<BigDecimal>().ok())
            .map(Value::Decimal),
        LogicalType::Bytes => row.try_get::<_, Option<Vec<u8>>>(idx).ok().flatten().map(Value::Bytes),
        LogicalType::Date => row.try_get::<_, Option<NaiveDate>>(idx).ok().flatten().map(Value::Date),
        LogicalType::Timestamp => row
            .try_get::<_, Option<DateTime<Utc>>>(idx)
            .ok()
            .flatten()
            .map(Value::Timestamp),
        LogicalType::TimestampTz => row
            .try_get::<_, Option<DateTime<Utc>>>(idx)
            .ok()
            .flatten()
            .map(Value::TimestampTz),
        LogicalType::Uuid => row.try_get::<_, Option<Uuid>>(idx).ok().flatten().map(Value::Uuid),
        _ => row.try_get::<_, Option<String>>(idx).ok().flatten().map(Value::String),
    }
    .unwrap_or(Value::Null)
}

#[async_trait]
impl SqlAdapter for PostgresAdapter {
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
        self.client.execute(sql, &[]).await.map_err(classify_pg_error)
    }

    async fn query(&self, sql: &str) -> Result<(Schema, Vec<Row>)> {
        let rows = self.client.query(sql, &[]).await.map_err(classify_pg_error)?;
        let Some(first) = rows.first() else {
            return Ok((Schema::empty(), Vec::new()));
        };
        let columns: Vec<(String, LogicalType)> = first
            .columns()
            .iter()
            .map(|c| (c.name().to_string(), logical_type_for(c.type_())))
            .collect();
        let schema = Schema::new(
            columns
                .iter()
                .map(|(name, lt)| PipeColumnInfo::new(name.clone(), *lt, true))
                .collect(),
        );
        let out_rows = rows
            .iter()
            .map(|row| Row::new(columns.iter().enumerate().map(|(i, (_, lt))| row_value(row, i, *lt)).collect()))
            .collect();
        Ok((schema, out_rows))
    }

    async fn table_exists(&self, table: &str) -> Result<bool> {
        let normalized = self.dialect.normalize(table);
        let rows = self
            .client
            .query("SELECT 1 FROM information_schema.tables WHERE table_name = $1", &[&normalized])
            .await
            .map_err(classify_pg_error)?;
        Ok(!rows.is_empty())
    }

    async fn introspect_table(&self, table: &str) -> Result<TargetSchemaInfo> {
        if !self.table_exists(table).await? {
            return Ok(TargetSchemaInfo::missing());
        }
        let normalized = self.dialect.normalize(table);
        let col_rows = self
            .client
            .query(
                "SELECT column_name, data_type, is_nullable, character_maximum_length \
                 FROM information_schema.columns WHERE table_name = $1 ORDER BY ordinal_position",
                &[&normalized],
            )
            .await
            .map_err(classify_pg_error)?;

        let pk_rows = self
            .client
            .query(
                "SELECT a.attname FROM pg_index i \
                 JOIN pg_attribute a ON a.attrelid = i.indrelid AND a.attnum = ANY(i.indkey) \
                 WHERE i.indrelid = $1::regclass AND i.indisprimary",
                &[&normalized],
            )
            .await
            .map_err(classify_pg_error)?;
        let primary_key_columns: Vec<String> = pk_rows.iter().map(|r| r.get::<_, String>(0)).collect();

        let columns = col_rows
            .iter()
            .map(|r| {
                let name: String = r.get(0);
                let native_type: String = r.get(1);
                let is_nullable: String = r.get(2);
                let max_length: Option<i32> = r.get(3);
                TargetColumnInfo {
                    is_primary_key: primary_key_columns.contains(&name),
                    is_unique: primary_key_columns.contains(&name),
                    inferred_logical_type: infer_logical_type_from_native(&native_type),
                    name,
                    native_type,
                    nullable: is_nullable == "YES",
                    max_length: max_length.map(|v| v as u32),
                }
            })
            .collect();

        let count_row = self
            .client
            .query_one(&format!("SELECT count(*) FROM {}", self.dialect.render_identifier(table, false)), &[])
            .await
            .ok();
        let row_count = count_row.and_then(|r| r.try_get::<_, i64>(0).ok()).map(|v| v as u64);

        Ok(TargetSchemaInfo {
            exists: true,
            columns,
            primary_key_columns,
            row_count,
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
        let sql = dml::insert_multi_row(table, columns, rows.len(), &self.dialect);
        let values: Vec<Value> = rows.iter().flat_map(|r| r.values().to_vec()).collect();
        self.exec_params(&sql, &values).await.map(|_| ())
    }

    async fn upsert_rows(&self, table: &str, columns: &[String], key_columns: &[String], rows: &[Row]) -> Result<()> {
        for row in rows {
            let sql = dml::upsert_on_conflict(table, columns, key_columns, &self.dialect);
            self.exec_params(&sql, row.values()).await?;
        }
        Ok(())
    }

    async fn ignore_rows(&self, table: &str, columns: &[String], key_columns: &[String], rows: &[Row]) -> Result<()> {
        for row in rows {
            let sql = dml::ignore_on_conflict(table, columns, key_columns, &self.dialect);
            self.exec_params(&sql, row.values()).await?;
        }
        Ok(())
    }

    async fn create_staging_like(&self, staging_table: &str, target_table: &str) -> Result<()> {
        let sql = format!(
            "CREATE TABLE {} (LIKE {} INCLUDING DEFAULTS)",
            self.dialect.render_identifier(staging_table, false),
            self.dialect.render_identifier(target_table, false)
        );
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

fn infer_logical_type_from_native(native_type: &str) -> LogicalType {
    match native_type {
        "boolean" => LogicalType::Bool,
        "smallint" => LogicalType::Int16,
        "integer" => LogicalType::Int32,
        "bigint" => LogicalType::Int64,
        "real" => LogicalType::Float32,
        "double precision" => LogicalType::Float64,
        "numeric" => LogicalType::Decimal,
        "bytea" => LogicalType::Bytes,
        "date" => LogicalType::Date,
        "timestamp without time zone" => LogicalType::Timestamp,
        "timestamp with time zone" => LogicalType::TimestampTz,
        "uuid" => LogicalType::Uuid,
        _ => LogicalType::String,
    }
}
