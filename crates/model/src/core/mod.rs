pub mod data_type;
pub mod identifiers;
pub mod schema;
pub mod value;

pub use data_type::LogicalType;
pub use identifiers::{BatchId, RunId, StagingId};
pub use schema::{PipeColumnInfo, Schema, TargetColumnInfo, TargetSchemaInfo};
pub use value::Value;
