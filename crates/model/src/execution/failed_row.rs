use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::core::value::Value;
use crate::records::row::Row;

/// Where in the pipeline a row was rejected. Used to route the row into the
/// right bucket of the §7 error taxonomy and to annotate diagnostics with
/// "offending row and column" as the spec requires for Data errors.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ProcessingStage {
    Read,
    Transform,
    Validate,
    Write,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FailureError {
    pub message: String,
    pub column: Option<String>,
    pub native_type: Option<String>,
}

impl FailureError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            column: None,
            native_type: None,
        }
    }

    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }

    pub fn with_native_type(mut self, native_type: impl Into<String>) -> Self {
        self.native_type = Some(native_type.into());
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FailureMetadata {
    pub batch_id: Option<String>,
    pub row_index: Option<u64>,
    pub transformer_kind: Option<String>,
}

/// A row that failed transformation or load when the job is not running in
/// strict mode, so it is skippable rather than fatal. Operationalizes the
/// per-batch failure analyzer (§4.3, §7) for rows that don't abort the job.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FailedRow {
    pub stage: ProcessingStage,
    pub original_values: Vec<String>,
    pub error: FailureError,
    pub metadata: FailureMetadata,
}

impl FailedRow {
    pub fn new(stage: ProcessingStage, row: &Row, error: FailureError) -> Self {
        Self {
            stage,
            original_values: row.values().iter().map(Value::as_display_string).collect(),
            error,
            metadata: FailureMetadata::default(),
        }
    }

    pub fn with_metadata(mut self, metadata: FailureMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Flattened representation for the structured metrics/diagnostics
    /// sink — one row of a "rejected rows" table.
    pub fn to_storage_map(&self) -> HashMap<String, String> {
        let mut map = HashMap::new();
        map.insert("stage".to_string(), format!("{:?}", self.stage));
        map.insert("message".to_string(), self.error.message.clone());
        if let Some(column) = &self.error.column {
            map.insert("column".to_string(), column.clone());
        }
        if let Some(native_type) = &self.error.native_type {
            map.insert("native_type".to_string(), native_type.clone());
        }
        if let Some(row_index) = self.metadata.row_index {
            map.insert("row_index".to_string(), row_index.to_string());
        }
        if let Some(batch_id) = &self.metadata.batch_id {
            map.insert("batch_id".to_string(), batch_id.clone());
        }
        map.insert("values".to_string(), self.original_values.join(","));
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_map_includes_column_when_present() {
        let row = Row::new(vec![Value::Int32(1), Value::String("x".into())]);
        let failed = FailedRow::new(
            ProcessingStage::Write,
            &row,
            FailureError::new("not null violation").with_column("email"),
        )
        .with_metadata(FailureMetadata {
            batch_id: Some("b1".into()),
            row_index: Some(3),
            transformer_kind: None,
        });
        let map = failed.to_storage_map();
        assert_eq!(map.get("column"), Some(&"email".to_string()));
        assert_eq!(map.get("row_index"), Some(&"3".to_string()));
    }

    #[test]
    fn storage_map_omits_absent_optional_fields() {
        let row = Row::new(vec![Value::Null]);
        let failed = FailedRow::new(ProcessingStage::Transform, &row, FailureError::new("boom"));
        let map = failed.to_storage_map();
        assert!(!map.contains_key("column"));
        assert!(!map.contains_key("row_index"));
    }
}
