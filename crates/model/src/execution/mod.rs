pub mod endpoint;
pub mod failed_row;
pub mod job;
pub mod metrics;

pub use endpoint::{Endpoint, EndpointKind, GenerateSpec};
pub use failed_row::{FailedRow, FailureError, FailureMetadata, ProcessingStage};
pub use job::{
    InsertMode, JobDefinition, LifecycleHooks, RetryPolicyConfig, SamplingConfig, TimeoutConfig,
    TransformerConfig, WriteStrategy,
};
pub use metrics::{PipelineMetrics, PipelineMetricsSnapshot};
