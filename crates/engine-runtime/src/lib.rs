//! The Writer Strategy Engine and Job Controller (spec §4.3): the layer
//! that turns a frozen `JobDefinition` into a running `engine-core::kernel`
//! job, and implements `kernel::Writer` against `connectors::sql::SqlAdapter`
//! for database sinks and `connectors::writer::FileSink` for file sinks.

pub mod controller;
pub mod file_writer;
pub mod writer_engine;

pub use controller::{execute_job, JobOutcome};
pub use file_writer::FileWriter;
pub use writer_engine::WriterStrategyEngine;
