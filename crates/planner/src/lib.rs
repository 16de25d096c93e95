//! SQL identifier and rendering contract for database sinks (spec §6): each
//! target dialect's `Quote`/`NeedsQuoting`/`Normalize` rules, native type
//! rendering for `LogicalType`, and the DDL/DML string builders the Writer
//! Strategy Engine (`engine-runtime`) drives against `connectors`' SQL
//! adapters. This crate renders SQL text; it never executes it.

pub mod ddl;
pub mod dialect;
pub mod dml;
pub mod error;

pub use dialect::{dialect_for, Dialect};
pub use error::PlannerError;
