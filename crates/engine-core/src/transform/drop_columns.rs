//! `--drop COL` (spec §4.2): removes the named column(s) from the schema
//! and every row, positionally.

use model::core::schema::Schema;
use model::execution::job::TransformerConfig;
use model::records::row::Row;

use crate::error::EngineError;
use crate::transform::{TransformOutcome, Transformer};

pub struct DropTransformer {
    columns: Vec<String>,
    positions: Vec<usize>,
}

impl DropTransformer {
    pub fn new(group: &[TransformerConfig]) -> Self {
        let columns = group.iter().flat_map(|c| c.args.iter().cloned()).collect();
        Self {
            columns,
            positions: Vec::new(),
        }
    }
}

impl Transformer for DropTransformer {
    fn initialize(&mut self, schema_in: &Schema) -> Result<Schema, EngineError> {
        let mut positions: Vec<usize> = self
            .columns
            .iter()
            .map(|name| {
                schema_in
                    .position_of(name)
                    .ok_or_else(|| EngineError::Fatal(format!("drop transformer: unknown column `{name}`")))
            })
            .collect::<Result<_, _>>()?;
        // Remove highest index first so earlier positions stay valid.
        positions.sort_unstable_by(|a, b| b.cmp(a));
        self.positions = positions;
        let mut schema = schema_in.clone();
        for name in &self.columns {
            schema = schema.without_column(name);
        }
        Ok(schema)
    }

    fn transform(&mut self, mut row: Row) -> Result<TransformOutcome, EngineError> {
        for &position in &self.positions {
            row.remove(position);
        }
        Ok(TransformOutcome::Row(row))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::core::data_type::LogicalType;
    use model::core::schema::PipeColumnInfo;
    use model::core::value::Value;

    #[test]
    fn drops_named_columns_from_schema_and_row() {
        let schema = Schema::new(vec![
            PipeColumnInfo::new("id", LogicalType::Int64, false),
            PipeColumnInfo::new("internal_note", LogicalType::String, true),
            PipeColumnInfo::new("name", LogicalType::String, false),
        ]);
        let group = vec![TransformerConfig::new("drop", vec!["internal_note".into()])];
        let mut t = DropTransformer::new(&group);
        let out_schema = t.initialize(&schema).unwrap();
        assert_eq!(out_schema.names(), vec!["id", "name"]);
        let row = Row::new(vec![Value::Int64(1), Value::String("secret".into()), Value::String("ada".into())]);
        match t.transform(row).unwrap() {
            TransformOutcome::Row(r) => assert_eq!(r.values(), &[Value::Int64(1), Value::String("ada".into())]),
            _ => panic!("expected a row"),
        }
    }
}
