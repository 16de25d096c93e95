//! Bridges a `Row`/`Schema` pair into `expression_engine::EvalContext` so
//! `compute`/`filter`/`expand` transformers can evaluate expressions against
//! the row currently in flight.

use expression_engine::EvalContext;
use model::core::schema::Schema;
use model::core::value::Value;
use model::records::row::Row;

pub struct RowEvalContext<'a> {
    row: &'a Row,
    schema: &'a Schema,
}

impl<'a> RowEvalContext<'a> {
    pub fn new(row: &'a Row, schema: &'a Schema) -> Self {
        Self { row, schema }
    }
}

impl EvalContext for RowEvalContext<'_> {
    fn field(&self, name: &str) -> Option<Value> {
        self.row.get_by_name(self.schema, name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::core::data_type::LogicalType;
    use model::core::schema::PipeColumnInfo;

    #[test]
    fn resolves_field_by_schema_position() {
        let schema = Schema::new(vec![
            PipeColumnInfo::new("id", LogicalType::Int64, false),
            PipeColumnInfo::new("name", LogicalType::String, true),
        ]);
        let row = Row::new(vec![Value::Int64(1), Value::String("ada".into())]);
        let ctx = RowEvalContext::new(&row, &schema);
        assert_eq!(ctx.field("name"), Some(Value::String("ada".into())));
        assert_eq!(ctx.field("missing"), None);
    }
}
