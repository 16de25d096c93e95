//! The Schema & Constraint Validator (spec §4.4): compares a pipeline's
//! final source schema against what a writer discovered about its sink
//! (`TargetSchemaInfo`) and, for a sample of rows, checks the constraints
//! that would otherwise only surface as a load-time driver error.

mod schema_validator;

pub use schema_validator::{
    validate_row_sample, validate_schema, ColumnFinding, ColumnVerdict, RowFinding, RowViolationKind,
    SchemaValidationReport, Severity,
};
