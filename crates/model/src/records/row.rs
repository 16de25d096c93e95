use serde::{Deserialize, Serialize};

use crate::core::schema::Schema;
use crate::core::value::Value;

/// An ordered sequence of opaque, nullable values. A row's positional layout
/// is governed by the current schema of the stage that produced it — a row
/// carries no schema of its own.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Row {
    values: Vec<Value>,
}

impl Row {
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    pub fn arity(&self) -> usize {
        self.values.len()
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Value> {
        self.values.get_mut(index)
    }

    pub fn set(&mut self, index: usize, value: Value) {
        if let Some(slot) = self.values.get_mut(index) {
            *slot = value;
        }
    }

    /// Looks up a value by column name against a schema describing this
    /// row's current layout. Returns `None` if the name is absent or the
    /// row is shorter than the schema (a malformed transformer output).
    pub fn get_by_name<'a>(&'a self, schema: &Schema, name: &str) -> Option<&'a Value> {
        schema.position_of(name).and_then(|i| self.values.get(i))
    }

    pub fn push(&mut self, value: Value) {
        self.values.push(value);
    }

    pub fn remove(&mut self, index: usize) -> Value {
        self.values.remove(index)
    }

    /// Checks arity against a schema — the kernel calls this on every row
    /// handed to the writer (§8 "Schema conformance" invariant).
    pub fn conforms_to(&self, schema: &Schema) -> bool {
        self.values.len() == schema.len()
    }

    pub fn size_bytes(&self) -> usize {
        self.values.iter().map(Value::size_bytes).sum()
    }
}

impl From<Vec<Value>> for Row {
    fn from(values: Vec<Value>) -> Self {
        Row::new(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::data_type::LogicalType;
    use crate::core::schema::PipeColumnInfo;

    fn schema() -> Schema {
        Schema::new(vec![
            PipeColumnInfo::new("id", LogicalType::Int64, false),
            PipeColumnInfo::new("name", LogicalType::String, true),
        ])
    }

    #[test]
    fn lookup_by_name_resolves_position() {
        let row = Row::new(vec![Value::Int64(7), Value::String("ada".into())]);
        assert_eq!(row.get_by_name(&schema(), "name"), Some(&Value::String("ada".into())));
    }

    #[test]
    fn conforms_to_checks_arity_only() {
        let row = Row::new(vec![Value::Int64(1), Value::Null]);
        assert!(row.conforms_to(&schema()));
        let short = Row::new(vec![Value::Int64(1)]);
        assert!(!short.conforms_to(&schema()));
    }
}
