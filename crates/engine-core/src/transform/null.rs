//! `--null COL` (spec §4.2): sets the named column(s) to `Null` on every
//! row. No schema effect — nullability of the target column is a writer
//! concern, not a transform-time one.

use model::core::schema::Schema;
use model::core::value::Value;
use model::execution::job::TransformerConfig;
use model::records::row::Row;

use crate::error::EngineError;
use crate::transform::{TransformOutcome, Transformer};

pub struct NullTransformer {
    columns: Vec<String>,
    positions: Vec<usize>,
}

impl NullTransformer {
    pub fn new(group: &[TransformerConfig]) -> Self {
        let columns = group.iter().flat_map(|c| c.args.iter().cloned()).collect();
        Self {
            columns,
            positions: Vec::new(),
        }
    }
}

impl Transformer for NullTransformer {
    fn initialize(&mut self, schema_in: &Schema) -> Result<Schema, EngineError> {
        self.positions = self
            .columns
            .iter()
            .map(|name| {
                schema_in
                    .position_of(name)
                    .ok_or_else(|| EngineError::Fatal(format!("null transformer: unknown column `{name}`")))
            })
            .collect::<Result<_, _>>()?;
        Ok(schema_in.clone())
    }

    fn transform(&mut self, mut row: Row) -> Result<TransformOutcome, EngineError> {
        for &pos in &self.positions {
            row.set(pos, Value::Null);
        }
        Ok(TransformOutcome::Row(row))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::core::data_type::LogicalType;
    use model::core::schema::PipeColumnInfo;

    #[test]
    fn nulls_the_named_column() {
        let schema = Schema::new(vec![
            PipeColumnInfo::new("id", LogicalType::Int64, false),
            PipeColumnInfo::new("ssn", LogicalType::String, true),
        ]);
        let group = vec![TransformerConfig::new("null", vec!["ssn".into()])];
        let mut t = NullTransformer::new(&group);
        t.initialize(&schema).unwrap();
        let row = Row::new(vec![Value::Int64(1), Value::String("123-45-6789".into())]);
        match t.transform(row).unwrap() {
            TransformOutcome::Row(r) => assert_eq!(r.get(1), Some(&Value::Null)),
            _ => panic!("expected a row"),
        }
    }
}
