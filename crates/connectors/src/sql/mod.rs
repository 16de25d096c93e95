//! Relational adapters: one module per database, all behind the shared
//! `SqlAdapter` contract in `base`, plus a generic `Reader` built on top of
//! that contract for the streaming side (spec §4.5).

pub mod base;
pub mod duckdb;
pub mod mssql;
pub mod oracle;
pub mod postgres;
pub mod reader;
pub mod sqlite;

pub use base::{BatchFailureReport, DbCapabilities, SqlAdapter};
pub use duckdb::DuckDbAdapter;
pub use mssql::MsSqlAdapter;
pub use oracle::OracleAdapter;
pub use postgres::PostgresAdapter;
pub use reader::SqlReader;
pub use sqlite::SqliteAdapter;
