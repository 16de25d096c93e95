use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// The closed set of source/sink kinds recognized by endpoint syntax
/// `<prefix>:<connection-string-or-path>` (spec §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EndpointKind {
    Oracle,
    MsSql,
    Postgres,
    DuckDb,
    Sqlite,
    Csv,
    Parquet,
    Arrow,
    Generate,
}

impl EndpointKind {
    pub fn from_prefix(prefix: &str) -> Option<Self> {
        match prefix {
            "ora" => Some(Self::Oracle),
            "mssql" => Some(Self::MsSql),
            "pg" => Some(Self::Postgres),
            "duck" => Some(Self::DuckDb),
            "sqlite" => Some(Self::Sqlite),
            "csv" => Some(Self::Csv),
            "parquet" => Some(Self::Parquet),
            "arrow" => Some(Self::Arrow),
            "generate" => Some(Self::Generate),
            _ => None,
        }
    }

    /// Database endpoints require a reader query (spec §4.5); file and
    /// generator endpoints may not.
    pub fn requires_query(&self) -> bool {
        matches!(
            self,
            EndpointKind::Oracle | EndpointKind::MsSql | EndpointKind::Postgres | EndpointKind::DuckDb | EndpointKind::Sqlite
        )
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "csv" => Some(Self::Csv),
            "parquet" => Some(Self::Parquet),
            "arrow" | "ipc" => Some(Self::Arrow),
            "db" | "sqlite" | "sqlite3" => Some(Self::Sqlite),
            "duckdb" => Some(Self::DuckDb),
            _ => None,
        }
    }
}

/// A resolved `<prefix>:<connection-string-or-path>` endpoint. `keyring://`
/// aliases are resolved against the OS keyring before this type is
/// constructed — by the time an `Endpoint` exists, `location` is final.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Endpoint {
    pub kind: EndpointKind,
    pub location: String,
}

impl Endpoint {
    /// Parses `prefix:location`, falling back to extension sniffing for a
    /// bare path with no recognized prefix.
    pub fn parse(raw: &str) -> Result<Self, ModelError> {
        if let Some((prefix, rest)) = raw.split_once(':') {
            if let Some(kind) = EndpointKind::from_prefix(prefix) {
                return Ok(Self {
                    kind,
                    location: rest.to_string(),
                });
            }
        }
        let ext = std::path::Path::new(raw)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("");
        match EndpointKind::from_extension(ext) {
            Some(kind) => Ok(Self {
                kind,
                location: raw.to_string(),
            }),
            None => Err(ModelError::UnknownEndpoint(raw.to_string())),
        }
    }
}

/// A parsed `generate:<N>[;rate=R]` endpoint location.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerateSpec {
    pub count: u64,
    pub rate_per_sec: Option<u64>,
}

impl GenerateSpec {
    pub fn parse(location: &str) -> Result<Self, ModelError> {
        let mut parts = location.split(';');
        let count = parts
            .next()
            .ok_or_else(|| ModelError::MalformedEndpoint(location.to_string()))?
            .trim()
            .parse::<u64>()
            .map_err(|_| ModelError::MalformedEndpoint(location.to_string()))?;
        let mut rate_per_sec = None;
        for part in parts {
            if let Some(rate) = part.trim().strip_prefix("rate=") {
                rate_per_sec = Some(
                    rate.parse::<u64>()
                        .map_err(|_| ModelError::MalformedEndpoint(location.to_string()))?,
                );
            }
        }
        Ok(Self { count, rate_per_sec })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_recognized_prefix() {
        let endpoint = Endpoint::parse("pg:postgres://localhost/db").unwrap();
        assert_eq!(endpoint.kind, EndpointKind::Postgres);
        assert_eq!(endpoint.location, "postgres://localhost/db");
    }

    #[test]
    fn falls_back_to_extension_sniffing() {
        let endpoint = Endpoint::parse("/tmp/data.csv").unwrap();
        assert_eq!(endpoint.kind, EndpointKind::Csv);
    }

    #[test]
    fn unknown_prefix_and_extension_is_an_error() {
        assert!(Endpoint::parse("ftp:example.com").is_err());
    }

    #[test]
    fn generate_spec_parses_rate() {
        let spec = GenerateSpec::parse("1000;rate=50").unwrap();
        assert_eq!(spec.count, 1000);
        assert_eq!(spec.rate_per_sec, Some(50));
    }

    #[test]
    fn generate_spec_without_rate() {
        let spec = GenerateSpec::parse("10").unwrap();
        assert_eq!(spec, GenerateSpec { count: 10, rate_per_sec: None });
    }
}
