//! Shared data model for DtPipe: values, schemas, rows, batches, job
//! configuration, metrics, and progress reporting. No I/O lives here — this
//! crate is consumed by `connectors`, `planner`, `engine-core`,
//! `engine-runtime`, `engine-config`, and `cli`.

pub mod core;
pub mod error;
pub mod execution;
pub mod progress;
pub mod records;

pub use core::{BatchId, LogicalType, PipeColumnInfo, RunId, Schema, StagingId, TargetColumnInfo, TargetSchemaInfo, Value};
pub use error::ModelError;
pub use execution::{
    Endpoint, EndpointKind, FailedRow, FailureError, FailureMetadata, GenerateSpec, InsertMode,
    JobDefinition, LifecycleHooks, PipelineMetrics, PipelineMetricsSnapshot, ProcessingStage,
    RetryPolicyConfig, SamplingConfig, TimeoutConfig, TransformerConfig, WriteStrategy,
};
pub use progress::{ProgressService, ProgressSnapshot, RunStage};
pub use records::{manifest_for, Batch, Manifest, Row};
