//! Resolves a parsed `Endpoint` (spec §6) to a concrete `Reader`,
//! `SqlAdapter`, or `FileSink`. This is the only module that knows the
//! connection-string shape each database dialect expects; everything
//! downstream only sees the trait objects.

use std::collections::HashMap;

use model::{Endpoint, EndpointKind, GenerateSpec};

use crate::error::{ConnectorError, Result};
use crate::file::{ArrowReader, ArrowSink, CsvReader, CsvSettings, CsvSink, ParquetReader, ParquetSink};
use crate::generate::GenerateReader;
use crate::keyring::resolve_embedded;
use crate::reader::Reader;
use crate::sql::{DuckDbAdapter, MsSqlAdapter, OracleAdapter, PostgresAdapter, SqlAdapter, SqlReader, SqliteAdapter};
use crate::writer::FileSink;

/// Opens the `Reader` for an endpoint. `query` is required for relational
/// endpoints (`EndpointKind::requires_query`) and ignored otherwise.
pub async fn open_reader(endpoint: &Endpoint, query: Option<&str>) -> Result<Box<dyn Reader>> {
    let location = resolve_embedded(&endpoint.location)?;
    match endpoint.kind {
        EndpointKind::Generate => {
            let spec = GenerateSpec::parse(&location).map_err(|e| ConnectorError::Fatal(e.to_string()))?;
            Ok(Box::new(GenerateReader::new(spec)))
        }
        EndpointKind::Csv => Ok(Box::new(CsvReader::new(location, CsvSettings::default()))),
        EndpointKind::Parquet => Ok(Box::new(ParquetReader::new(location))),
        EndpointKind::Arrow => Ok(Box::new(ArrowReader::new(location))),
        EndpointKind::Postgres | EndpointKind::MsSql | EndpointKind::Oracle | EndpointKind::DuckDb | EndpointKind::Sqlite => {
            let query = query.ok_or_else(|| ConnectorError::MissingProperty("query".into()))?;
            let adapter = open_sql_adapter(endpoint).await?;
            Ok(Box::new(SqlReaderAny::new(adapter, query)))
        }
    }
}

/// Opens the `SqlAdapter` for a relational endpoint. Used both by
/// `open_reader` (wrapped in `SqlReader`) and directly by
/// `engine-core::writer_engine` for database sinks.
pub async fn open_sql_adapter(endpoint: &Endpoint) -> Result<Box<dyn SqlAdapter>> {
    let location = resolve_embedded(&endpoint.location)?;
    match endpoint.kind {
        EndpointKind::Postgres => Ok(Box::new(PostgresAdapter::connect(&location).await?)),
        EndpointKind::Sqlite => Ok(Box::new(SqliteAdapter::connect(&location).await?)),
        EndpointKind::DuckDb => Ok(Box::new(DuckDbAdapter::connect(&location).await?)),
        EndpointKind::MsSql => {
            let params = parse_ado_params(&location);
            let (host, port) = parse_host_port(params.get("server").map(String::as_str).unwrap_or(&location));
            let database = params.get("database").cloned().unwrap_or_default();
            let user = params.get("user id").or_else(|| params.get("uid")).cloned().unwrap_or_default();
            let password = params.get("password").or_else(|| params.get("pwd")).cloned().unwrap_or_default();
            Ok(Box::new(MsSqlAdapter::connect(&host, port, &database, &user, &password).await?))
        }
        EndpointKind::Oracle => {
            let (credentials, connect_string) = location
                .rsplit_once('@')
                .ok_or_else(|| ConnectorError::MissingProperty("oracle connect string (user/password@tns)".into()))?;
            let (user, password) = credentials
                .split_once('/')
                .ok_or_else(|| ConnectorError::MissingProperty("oracle user/password".into()))?;
            Ok(Box::new(OracleAdapter::connect(connect_string, user, password).await?))
        }
        other => Err(ConnectorError::UnknownProvider(format!("{other:?} has no SQL adapter"))),
    }
}

/// Opens the `FileSink` for a file endpoint. Database endpoints go through
/// `open_sql_adapter` and the Writer Strategy Engine instead.
pub async fn open_file_sink(endpoint: &Endpoint) -> Result<Box<dyn FileSink>> {
    let location = resolve_embedded(&endpoint.location)?;
    match endpoint.kind {
        EndpointKind::Csv => Ok(Box::new(CsvSink::new(location, CsvSettings::default()))),
        EndpointKind::Parquet => Ok(Box::new(ParquetSink::new(location))),
        EndpointKind::Arrow => Ok(Box::new(ArrowSink::new(location))),
        other => Err(ConnectorError::UnknownProvider(format!("{other:?} is not a file sink"))),
    }
}

/// Wraps a boxed `SqlAdapter` so `SqlReader<A>`'s generic parameter doesn't
/// leak into `open_reader`'s trait-object return type.
struct SqlReaderAny {
    inner: Box<dyn SqlAdapter>,
    query: String,
    schema: Option<model::Schema>,
    offset: u64,
}

impl SqlReaderAny {
    fn new(inner: Box<dyn SqlAdapter>, query: &str) -> Self {
        Self {
            inner,
            query: query.to_string(),
            schema: None,
            offset: 0,
        }
    }
}

#[async_trait::async_trait]
impl Reader for SqlReaderAny {
    async fn open(&mut self, _opts: &crate::reader::ReaderOptions) -> Result<model::Schema> {
        let probe = self.inner.dialect().paginate(&self.query, 0, 1);
        let (schema, _) = self.inner.query(&probe).await?;
        self.schema = Some(schema.clone());
        Ok(schema)
    }

    async fn read_batch(&mut self, batch_size: usize) -> Result<crate::reader::ReadResult> {
        let windowed = self.inner.dialect().paginate(&self.query, self.offset, batch_size as u64);
        let (_, rows) = self.inner.query(&windowed).await?;
        let fetched = rows.len();
        self.offset += fetched as u64;
        Ok(crate::reader::ReadResult {
            rows,
            exhausted: fetched < batch_size,
        })
    }

    async fn close(&mut self) -> Result<()> {
        Ok(())
    }

    fn requires_query(&self) -> bool {
        true
    }
}

fn parse_ado_params(location: &str) -> HashMap<String, String> {
    location
        .split(';')
        .filter_map(|part| part.split_once('='))
        .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim().to_string()))
        .collect()
}

fn parse_host_port(host_spec: &str) -> (String, u16) {
    match host_spec.split_once(',').or_else(|| host_spec.split_once(':')) {
        Some((host, port)) => (host.to_string(), port.parse().unwrap_or(1433)),
        None => (host_spec.to_string(), 1433),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ado_style_params() {
        let params = parse_ado_params("Server=db1,1433;Database=app;User Id=sa;Password=secret");
        assert_eq!(params.get("database"), Some(&"app".to_string()));
        assert_eq!(params.get("user id"), Some(&"sa".to_string()));
    }

    #[test]
    fn parses_host_and_port() {
        assert_eq!(parse_host_port("db1,1433"), ("db1".to_string(), 1433));
        assert_eq!(parse_host_port("db1"), ("db1".to_string(), 1433));
    }
}
