//! Per-database identifier rules (spec §6 "SQL identifier contract"):
//! `Quote`, `NeedsQuoting`, `Normalize`. These functions drive every
//! identifier rendered into DDL/DML by `ddl`/`dml`, and every column match
//! the Schema & Constraint Validator (`engine-core::validator`) performs
//! between source and target columns.

use model::{EndpointKind, LogicalType};

use crate::error::{PlannerError, Result};

/// A target database's identifier and type-rendering rules. One
/// implementation per `EndpointKind` database variant.
pub trait Dialect: Send + Sync {
    /// Wraps `name` in the dialect's quote character, escaping any embedded
    /// quote characters.
    fn quote(&self, name: &str) -> String;

    /// Whether `name` must be quoted when rendered: a reserved word, or a
    /// name containing characters outside the dialect's bare-identifier
    /// rule (commonly non-lowercase-ASCII).
    fn needs_quoting(&self, name: &str) -> bool;

    /// Renders `name` as it would be matched unquoted by the dialect —
    /// its case-folding rule. Used by the Schema & Constraint Validator to
    /// compare a source column name against a target column name.
    fn normalize(&self, name: &str) -> String;

    /// Renders `name`, quoting only if `needs_quoting` (or the caller
    /// forces case-sensitivity via `PipeColumnInfo.isCaseSensitive`).
    fn render_identifier(&self, name: &str, force_quote: bool) -> String {
        if force_quote || self.needs_quoting(name) {
            self.quote(name)
        } else {
            name.to_string()
        }
    }

    /// The native DDL type name for a logical type, used by `CREATE TABLE`
    /// rendering when a table must be created from the source schema.
    fn native_type_name(&self, logical_type: LogicalType) -> &'static str;

    /// The bind-parameter placeholder for the `n`th (1-based) parameter in
    /// a parameterized statement.
    fn placeholder(&self, n: usize) -> String;

    /// Whether this dialect supports a native `TRUNCATE TABLE` statement.
    /// Sinks without one fall back to `DeleteThenInsert` (spec §4.3).
    fn supports_truncate(&self) -> bool {
        true
    }

    /// Whether this dialect supports `INSERT ... ON CONFLICT`/`MERGE`
    /// natively, vs needing a staging-table merge (spec §4.3).
    fn supports_native_upsert(&self) -> bool;

    /// Wraps `query` in a windowed `OFFSET`/`FETCH` clause, used by
    /// `connectors::sql::reader::SqlReader` to pull one batch at a time
    /// without materializing the full result set (spec §4.5).
    fn paginate(&self, query: &str, offset: u64, limit: u64) -> String {
        format!("SELECT * FROM ({query}) __dtpipe_page LIMIT {limit} OFFSET {offset}")
    }

    fn name(&self) -> &'static str;
}

pub struct Postgres;
pub struct MsSql;
pub struct Oracle;
pub struct DuckDb;
pub struct Sqlite;

fn is_bare_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

const PG_RESERVED: &[&str] = &["select", "table", "order", "user", "group", "default", "primary"];

impl Dialect for Postgres {
    fn quote(&self, name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }

    fn needs_quoting(&self, name: &str) -> bool {
        !is_bare_identifier(name) || PG_RESERVED.contains(&name.to_ascii_lowercase().as_str())
    }

    fn normalize(&self, name: &str) -> String {
        name.to_ascii_lowercase()
    }

    fn native_type_name(&self, logical_type: LogicalType) -> &'static str {
        use LogicalType::*;
        match logical_type {
            Bool => "boolean",
            Int8 | Int16 => "smallint",
            Int32 => "integer",
            Int64 => "bigint",
            Uint8 | Uint16 => "smallint",
            Uint32 => "bigint",
            Uint64 => "numeric(20,0)",
            Float32 => "real",
            Float64 => "double precision",
            Decimal => "numeric",
            String => "text",
            Bytes => "bytea",
            Date => "date",
            Timestamp => "timestamp",
            TimestampTz => "timestamptz",
            Uuid => "uuid",
        }
    }

    fn placeholder(&self, n: usize) -> String {
        format!("${n}")
    }

    fn supports_native_upsert(&self) -> bool {
        true
    }

    fn name(&self) -> &'static str {
        "postgres"
    }
}

impl Dialect for MsSql {
    fn quote(&self, name: &str) -> String {
        format!("[{}]", name.replace(']', "]]"))
    }

    fn needs_quoting(&self, name: &str) -> bool {
        !is_bare_identifier(name)
    }

    fn normalize(&self, name: &str) -> String {
        name.to_ascii_lowercase()
    }

    fn native_type_name(&self, logical_type: LogicalType) -> &'static str {
        use LogicalType::*;
        match logical_type {
            Bool => "bit",
            Int8 | Int16 => "smallint",
            Int32 => "int",
            Int64 => "bigint",
            Uint8 => "tinyint",
            Uint16 | Uint32 => "int",
            Uint64 => "bigint",
            Float32 => "real",
            Float64 => "float",
            Decimal => "decimal(38,10)",
            String => "nvarchar(max)",
            Bytes => "varbinary(max)",
            Date => "date",
            Timestamp => "datetime2",
            TimestampTz => "datetimeoffset",
            Uuid => "uniqueidentifier",
        }
    }

    fn placeholder(&self, n: usize) -> String {
        format!("@p{n}")
    }

    fn supports_native_upsert(&self) -> bool {
        // MERGE exists but is infamous for race conditions; this design
        // routes MsSql Upsert/Ignore through the staging-table merge path.
        false
    }

    fn paginate(&self, query: &str, offset: u64, limit: u64) -> String {
        format!(
            "SELECT * FROM ({query}) __dtpipe_page ORDER BY (SELECT NULL) OFFSET {offset} ROWS FETCH NEXT {limit} ROWS ONLY"
        )
    }

    fn name(&self) -> &'static str {
        "mssql"
    }
}

impl Dialect for Oracle {
    fn quote(&self, name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }

    fn needs_quoting(&self, name: &str) -> bool {
        // Oracle folds unquoted identifiers to uppercase; any lowercase
        // letter forces quoting to preserve the source casing.
        name.chars().any(|c| c.is_ascii_lowercase()) || !is_bare_identifier(&name.to_ascii_lowercase())
    }

    fn normalize(&self, name: &str) -> String {
        name.to_ascii_uppercase()
    }

    fn native_type_name(&self, logical_type: LogicalType) -> &'static str {
        use LogicalType::*;
        match logical_type {
            Bool => "number(1,0)",
            Int8 | Int16 | Uint8 | Uint16 => "number(5,0)",
            Int32 | Uint32 => "number(10,0)",
            Int64 | Uint64 => "number(20,0)",
            Float32 => "binary_float",
            Float64 => "binary_double",
            Decimal => "number",
            String => "clob",
            Bytes => "blob",
            Date => "date",
            Timestamp => "timestamp",
            TimestampTz => "timestamp with time zone",
            Uuid => "raw(16)",
        }
    }

    fn placeholder(&self, n: usize) -> String {
        format!(":{n}")
    }

    fn supports_native_upsert(&self) -> bool {
        // Oracle MERGE is a real native upsert; this design still opts to
        // drive Upsert/Ignore through array-bound MERGE directly (no
        // staging table needed) — see connectors::sql::oracle.
        true
    }

    fn paginate(&self, query: &str, offset: u64, limit: u64) -> String {
        format!("SELECT * FROM ({query}) __dtpipe_page OFFSET {offset} ROWS FETCH NEXT {limit} ROWS ONLY")
    }

    fn name(&self) -> &'static str {
        "oracle"
    }
}

impl Dialect for DuckDb {
    fn quote(&self, name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }

    fn needs_quoting(&self, name: &str) -> bool {
        !is_bare_identifier(name)
    }

    fn normalize(&self, name: &str) -> String {
        name.to_ascii_lowercase()
    }

    fn native_type_name(&self, logical_type: LogicalType) -> &'static str {
        use LogicalType::*;
        match logical_type {
            Bool => "boolean",
            Int8 => "tinyint",
            Int16 => "smallint",
            Int32 => "integer",
            Int64 => "bigint",
            Uint8 => "utinyint",
            Uint16 => "usmallint",
            Uint32 => "uinteger",
            Uint64 => "ubigint",
            Float32 => "float",
            Float64 => "double",
            Decimal => "decimal(18,4)",
            String => "varchar",
            Bytes => "blob",
            Date => "date",
            Timestamp => "timestamp",
            TimestampTz => "timestamptz",
            Uuid => "uuid",
        }
    }

    fn placeholder(&self, n: usize) -> String {
        format!("${n}")
    }

    fn supports_native_upsert(&self) -> bool {
        true
    }

    fn name(&self) -> &'static str {
        "duckdb"
    }
}

impl Dialect for Sqlite {
    fn quote(&self, name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }

    fn needs_quoting(&self, name: &str) -> bool {
        !is_bare_identifier(name)
    }

    fn normalize(&self, name: &str) -> String {
        name.to_ascii_lowercase()
    }

    fn native_type_name(&self, logical_type: LogicalType) -> &'static str {
        use LogicalType::*;
        match logical_type {
            Bool | Int8 | Int16 | Int32 | Int64 | Uint8 | Uint16 | Uint32 | Uint64 => "integer",
            Float32 | Float64 => "real",
            Decimal => "numeric",
            String => "text",
            Bytes => "blob",
            Date | Timestamp | TimestampTz => "text",
            Uuid => "text",
        }
    }

    fn placeholder(&self, _n: usize) -> String {
        "?".to_string()
    }

    fn supports_truncate(&self) -> bool {
        false
    }

    fn supports_native_upsert(&self) -> bool {
        true
    }

    fn name(&self) -> &'static str {
        "sqlite"
    }
}

/// Resolves the `Dialect` for a database `EndpointKind`. File/generate
/// endpoints have no SQL identifier contract and return an error.
pub fn dialect_for(kind: EndpointKind) -> Result<Box<dyn Dialect>> {
    match kind {
        EndpointKind::Postgres => Ok(Box::new(Postgres)),
        EndpointKind::MsSql => Ok(Box::new(MsSql)),
        EndpointKind::Oracle => Ok(Box::new(Oracle)),
        EndpointKind::DuckDb => Ok(Box::new(DuckDb)),
        EndpointKind::Sqlite => Ok(Box::new(Sqlite)),
        other => Err(PlannerError::UnsupportedDialect(format!("{other:?}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn postgres_normalizes_to_lowercase() {
        let dialect = Postgres;
        assert_eq!(dialect.normalize("UserId"), "userid");
    }

    #[test]
    fn oracle_normalizes_to_uppercase() {
        let dialect = Oracle;
        assert_eq!(dialect.normalize("user_id"), "USER_ID");
    }

    #[test]
    fn oracle_requires_quoting_for_lowercase_names() {
        let dialect = Oracle;
        assert!(dialect.needs_quoting("user_id"));
        assert!(!dialect.needs_quoting("USER_ID"));
    }

    #[test]
    fn postgres_quotes_mixed_case_names() {
        let dialect = Postgres;
        assert!(dialect.needs_quoting("UserId"));
        assert_eq!(dialect.render_identifier("UserId", false), "\"UserId\"");
        assert_eq!(dialect.render_identifier("user_id", false), "user_id");
    }

    #[test]
    fn sqlite_has_no_native_truncate() {
        assert!(!Sqlite.supports_truncate());
    }

    #[test]
    fn dialect_for_rejects_file_endpoints() {
        assert!(dialect_for(EndpointKind::Csv).is_err());
    }
}
