//! File-based `Reader`/`FileSink` adapters: CSV, Parquet, Arrow IPC.

pub mod arrow;
pub mod conv;
pub mod csv;
pub mod parquet;

pub use arrow::{ArrowReader, ArrowSink};
pub use csv::{CsvReader, CsvSettings, CsvSink};
pub use parquet::{ParquetReader, ParquetSink};
