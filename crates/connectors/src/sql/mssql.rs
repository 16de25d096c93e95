//! The SQL Server `SqlAdapter`. Unlike `sqlite`/`duckdb`, `tiberius` is
//! natively async, so no `spawn_blocking` dispatch is needed — the client
//! is held behind a `tokio::sync::Mutex` because `tiberius::Client` requires
//! `&mut self` for every round trip and the kernel may hold one adapter per
//! writer rather than one per in-flight batch.
//!
//! SQL Server has no reliable `INSERT ... ON CONFLICT`, so
//! `capabilities().native_upsert` is false and `Upsert`/`Ignore` always
//! route through the staging-table merge path (spec §4.3).

use std::sync::Arc;

use async_trait::async_trait;
use tiberius::{AuthMethod, Client, Config, ColumnData};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};

use model::{LogicalType, PipeColumnInfo, Row, Schema, TargetColumnInfo, TargetSchemaInfo, Value};
use planner::dialect::MsSql as MsSqlDialect;
use planner::{ddl, dml, Dialect};

use crate::error::{ConnectorError, Result};
use crate::sql::base::{DbCapabilities, SqlAdapter};

pub struct MsSqlAdapter {
    client: Arc<Mutex<Client<Compat<TcpStream>>>>,
    dialect: MsSqlDialect,
}

impl MsSqlAdapter {
    pub async fn connect(host: &str, port: u16, database: &str, user: &str, password: &str) -> Result<Self> {
        let mut config = Config::new();
        config.host(host);
        config.port(port);
        config.database(database);
        config.authentication(AuthMethod::sql_server(user, password));
        config.trust_cert();

        let tcp = TcpStream::connect(config.get_addr())
            .await
            .map_err(|e| ConnectorError::Transient(e.to_string()))?;
        tcp.set_nodelay(true).ok();
        let client = Client::connect(config, tcp.compat_write())
            .await
            .map_err(|e| ConnectorError::Fatal(e.to_string()))?;

        Ok(Self {
            client: Arc::new(Mutex::new(client)),
            dialect: MsSqlDialect,
        })
    }
}

fn column_data_to_value(data: ColumnData<'static>) -> Value {
    match data {
        ColumnData::Bit(v) => v.map(Value::Bool).unwrap_or(Value::Null),
        ColumnData::U8(v) => v.map(|n| Value::Uint8(n)).unwrap_or(Value::Null),
        ColumnData::I16(v) => v.map(Value::Int16).unwrap_or(Value::Null),
        ColumnData::I32(v) => v.map(Value::Int32).unwrap_or(Value::Null),
        ColumnData::I64(v) => v.map(Value::Int64).unwrap_or(Value::Null),
        ColumnData::F32(v) => v.map(Value::Float32).unwrap_or(Value::Null),
        ColumnData::F64(v) => v.map(Value::Float64).unwrap_or(Value::Null),
        ColumnData::String(v) => v.map(|s| Value::String(s.into_owned())).unwrap_or(Value::Null),
        ColumnData::Binary(v) => v.map(|b| Value::Bytes(b.into_owned())).unwrap_or(Value::Null),
        _ => Value::Null,
    }
}

fn value_to_literal(value: &Value) -> String {
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
        Value::String(v) => format!("N'{}'", v.replace('\'', "''")),
        Value::Bytes(v) => format!("0x{}", v.iter().map(|b| format!("{b:02x}")).collect::<String>()),
        Value::Date(v) => format!("'{v}'"),
        Value::Timestamp(v) => format!("'{}'", v.to_rfc3339()),
        Value::TimestampTz(v) => format!("'{}'", v.to_rfc3339()),
        Value::Uuid(v) => format!("'{v}'"),
    }
}

fn classify_tiberius_error(err: tiberius::error::Error) -> ConnectorError {
    match &err {
        tiberius::error::Error::Io { .. } => ConnectorError::Transient(err.to_string()),
        _ => ConnectorError::Fatal(err.to_string()),
    }
}

#[async_trait]
impl SqlAdapter for MsSqlAdapter {
    fn dialect(&self) -> &dyn Dialect {
        &self.dialect
    }

    fn capabilities(&self) -> DbCapabilities {
        DbCapabilities {
            native_truncate: true,
            native_upsert: false,
            bulk_copy: true,
            transactional_ddl: true,
        }
    }

    async fn execute(&self, sql: &str) -> Result<u64> {
        let mut client = self.client.lock().await;
        let result = client.execute(sql, &[]).await.map_err(classify_tiberius_error)?;
        Ok(result.rows_affected().iter().sum::<u64>())
    }

    async fn query(&self, sql: &str) -> Result<(Schema, Vec<Row>)> {
        let mut client = self.client.lock().await;
        let stream = client.simple_query(sql).await.map_err(classify_tiberius_error)?;
        let rows = stream.into_first_result().await.map_err(classify_tiberius_error)?;

        let mut col_names = Vec::new();
        if let Some(first) = rows.first() {
            col_names = first.columns().iter().map(|c| c.name().to_string()).collect();
        }
        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let mut values = Vec::new();
            for i in 0..row.columns().len() {
                let data: Option<&str> = row.get(i);
                values.push(data.map(|s| Value::String(s.to_string())).unwrap_or(Value::Null));
            }
            out.push(Row::new(values));
        }
        let schema = Schema::new(col_names.into_iter().map(|n| PipeColumnInfo::new(n, LogicalType::String, true)).collect());
        Ok((schema, out))
    }

    async fn table_exists(&self, table: &str) -> Result<bool> {
        let sql = format!(
            "SELECT 1 FROM INFORMATION_SCHEMA.TABLES WHERE TABLE_NAME = '{}'",
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
            "SELECT c.COLUMN_NAME, c.DATA_TYPE, c.IS_NULLABLE, \
             CASE WHEN pk.COLUMN_NAME IS NOT NULL THEN 1 ELSE 0 END \
             FROM INFORMATION_SCHEMA.COLUMNS c \
             LEFT JOIN ( \
               SELECT ku.COLUMN_NAME FROM INFORMATION_SCHEMA.TABLE_CONSTRAINTS tc \
               JOIN INFORMATION_SCHEMA.KEY_COLUMN_USAGE ku ON tc.CONSTRAINT_NAME = ku.CONSTRAINT_NAME \
               WHERE tc.CONSTRAINT_TYPE = 'PRIMARY KEY' AND tc.TABLE_NAME = '{table}' \
             ) pk ON pk.COLUMN_NAME = c.COLUMN_NAME \
             WHERE c.TABLE_NAME = '{table}' ORDER BY c.ORDINAL_POSITION",
        );
        let (_, rows) = self.query(&sql).await?;
        let mut columns = Vec::new();
        let mut primary_key_columns = Vec::new();
        for row in rows {
            let vals = row.values();
            let name = vals[0].as_display_string();
            let native_type = vals[1].as_display_string();
            let nullable = vals[2].as_display_string() == "YES";
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
        // tiberius's positional binds are typed per-variant (`ColumnData`),
        // which makes a single owned bind vector awkward to build generically
        // across `Value`'s variants; values are rendered as escaped literals
        // into the `VALUES` tuples instead, same shape `insert_multi_row`
        // produces but with data substituted for placeholders.
        let col_list: Vec<String> = columns.iter().map(|c| self.dialect.render_identifier(c, false)).collect();
        let tuples: Vec<String> = rows
            .iter()
            .map(|row| {
                let rendered: Vec<String> = row.values().iter().map(value_to_literal).collect();
                format!("({})", rendered.join(", "))
            })
            .collect();
        let sql = format!(
            "INSERT INTO {} ({}) VALUES {}",
            self.dialect.render_identifier(table, false),
            col_list.join(", "),
            tuples.join(", ")
        );
        let mut client = self.client.lock().await;
        client.execute(sql, &[]).await.map_err(classify_tiberius_error)?;
        Ok(())
    }

    async fn upsert_rows(&self, table: &str, columns: &[String], key_columns: &[String], rows: &[Row]) -> Result<()> {
        // No native upsert on this dialect; engine-core routes Upsert
        // through create_staging_like + merge_staging instead.
        let _ = key_columns;
        self.insert_rows(table, columns, rows).await
    }

    async fn ignore_rows(&self, table: &str, columns: &[String], key_columns: &[String], rows: &[Row]) -> Result<()> {
        let _ = key_columns;
        self.insert_rows(table, columns, rows).await
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
    match native_type.to_ascii_lowercase().as_str() {
        "bit" => LogicalType::Bool,
        "tinyint" => LogicalType::Int8,
        "smallint" => LogicalType::Int16,
        "int" => LogicalType::Int32,
        "bigint" => LogicalType::Int64,
        "real" => LogicalType::Float32,
        "float" => LogicalType::Float64,
        "decimal" | "numeric" | "money" | "smallmoney" => LogicalType::Decimal,
        "varbinary" | "binary" | "image" => LogicalType::Bytes,
        "date" => LogicalType::Date,
        "datetime" | "datetime2" | "smalldatetime" => LogicalType::Timestamp,
        "datetimeoffset" => LogicalType::TimestampTz,
        "uniqueidentifier" => LogicalType::Uuid,
        _ => LogicalType::String,
    }
}
