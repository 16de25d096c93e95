//! Concrete `Reader`/`FileSink`/`SqlAdapter` implementations for the closed
//! endpoint set (spec §6) plus the catalog that resolves a parsed
//! `model::Endpoint` to one of them. Out of scope per spec §1: this crate
//! owns the wire protocols themselves, not the strategy semantics that sit
//! on top of a `SqlAdapter` (that's `engine-runtime::writer_engine`).

pub mod catalog;
pub mod error;
pub mod file;
pub mod generate;
pub mod keyring;
pub mod reader;
pub mod sql;
pub mod writer;

pub use catalog::{open_file_sink, open_reader, open_sql_adapter};
pub use error::{ConnectorError, Result};
pub use reader::{ReadResult, Reader, ReaderOptions};
pub use writer::FileSink;
