use serde::{Deserialize, Serialize};

use super::data_type::LogicalType;

/// One column in a `Schema` (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PipeColumnInfo {
    pub name: String,
    pub logical_type: LogicalType,
    pub is_nullable: bool,
    /// Whether the name must be quoted verbatim when rendered into SQL
    /// identifiers, rather than folded by the dialect's case rule.
    pub is_case_sensitive: bool,
}

impl PipeColumnInfo {
    pub fn new(name: impl Into<String>, logical_type: LogicalType, is_nullable: bool) -> Self {
        Self {
            name: name.into(),
            logical_type,
            is_nullable,
            is_case_sensitive: false,
        }
    }

    pub fn case_sensitive(mut self) -> Self {
        self.is_case_sensitive = true;
        self
    }
}

/// An ordered sequence of `PipeColumnInfo`. Names are unique under the
/// target dialect's identifier-equivalence rule; columns may be added,
/// dropped, reordered, or retyped across pipeline stages.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Schema {
    columns: Vec<PipeColumnInfo>,
}

impl Schema {
    pub fn new(columns: Vec<PipeColumnInfo>) -> Self {
        Self { columns }
    }

    pub fn empty() -> Self {
        Self { columns: Vec::new() }
    }

    pub fn columns(&self) -> &[PipeColumnInfo] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn position_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn get(&self, name: &str) -> Option<&PipeColumnInfo> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn with_column(mut self, column: PipeColumnInfo) -> Self {
        self.columns.push(column);
        self
    }

    pub fn without_column(&self, name: &str) -> Self {
        Schema::new(
            self.columns
                .iter()
                .filter(|c| c.name != name)
                .cloned()
                .collect(),
        )
    }

    pub fn names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }
}

/// What the writer discovered about a database sink during its inspect
/// phase (§3). Built once, immutable thereafter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TargetColumnInfo {
    pub name: String,
    pub native_type: String,
    pub inferred_logical_type: LogicalType,
    pub nullable: bool,
    pub is_primary_key: bool,
    pub is_unique: bool,
    pub max_length: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TargetSchemaInfo {
    pub exists: bool,
    pub columns: Vec<TargetColumnInfo>,
    pub primary_key_columns: Vec<String>,
    pub row_count: Option<u64>,
    pub size_bytes: Option<u64>,
}

impl TargetSchemaInfo {
    pub fn missing() -> Self {
        Self {
            exists: false,
            columns: Vec::new(),
            primary_key_columns: Vec::new(),
            row_count: None,
            size_bytes: None,
        }
    }

    pub fn column(&self, name: &str) -> Option<&TargetColumnInfo> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_primary_key(&self) -> bool {
        !self.primary_key_columns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_position_lookup() {
        let schema = Schema::new(vec![
            PipeColumnInfo::new("id", LogicalType::Int64, false),
            PipeColumnInfo::new("name", LogicalType::String, true),
        ]);
        assert_eq!(schema.position_of("name"), Some(1));
        assert_eq!(schema.position_of("missing"), None);
    }

    #[test]
    fn without_column_preserves_remaining_order() {
        let schema = Schema::new(vec![
            PipeColumnInfo::new("a", LogicalType::Int32, false),
            PipeColumnInfo::new("b", LogicalType::Int32, false),
            PipeColumnInfo::new("c", LogicalType::Int32, false),
        ]);
        let reduced = schema.without_column("b");
        assert_eq!(reduced.names(), vec!["a", "c"]);
    }

    #[test]
    fn missing_target_has_no_columns() {
        let target = TargetSchemaInfo::missing();
        assert!(!target.exists);
        assert!(!target.has_primary_key());
    }
}
