//! `--expand expr` (spec §4.2): replaces one row with an array of rows.
//! Bound to the bundled script engine's one supported directive,
//! `split(<expr>) as <field>` — each produced row is the original row's
//! fields plus the new `field` column. The spec's schema-effect table
//! entry for `expand` reads "none", written against a generic external
//! script engine whose directives are unconstrained; the bundled engine's
//! only directive always introduces exactly one new named field, so this
//! implementation extends the schema by that field rather than leaving it
//! unchanged — see the design notes for this interpretation.

use model::core::data_type::LogicalType;
use model::core::schema::{PipeColumnInfo, Schema};
use model::core::value::Value;
use model::execution::job::TransformerConfig;
use model::records::row::Row;

use crate::context::RowEvalContext;
use crate::error::EngineError;
use crate::transform::{TransformOutcome, Transformer};
use expression_engine::{DefaultScriptEngine, ScriptEngine};

pub struct ExpandTransformer {
    directive: String,
    field: String,
    read_schema: Schema,
    engine: DefaultScriptEngine,
}

impl ExpandTransformer {
    pub fn new(group: &[TransformerConfig]) -> Result<Self, EngineError> {
        let directive = group
            .iter()
            .flat_map(|c| c.args.iter())
            .next()
            .cloned()
            .ok_or_else(|| EngineError::Fatal("expand transformer requires a directive".to_string()))?;
        let field = directive
            .rsplit_once(" as ")
            .map(|(_, field)| field.trim().to_string())
            .ok_or_else(|| EngineError::Fatal(format!("expand directive `{directive}` is not `split(..) as field`")))?;
        Ok(Self {
            directive,
            field,
            read_schema: Schema::empty(),
            engine: DefaultScriptEngine::new(),
        })
    }
}

impl Transformer for ExpandTransformer {
    fn initialize(&mut self, schema_in: &Schema) -> Result<Schema, EngineError> {
        self.read_schema = schema_in.clone();
        Ok(schema_in.clone().with_column(PipeColumnInfo::new(self.field.clone(), LogicalType::String, true)))
    }

    fn transform(&mut self, row: Row) -> Result<TransformOutcome, EngineError> {
        let maps = {
            let ctx = RowEvalContext::new(&row, &self.read_schema);
            self.engine.expand(&self.directive, &ctx)?
        };
        let rows = maps
            .into_iter()
            .map(|mut map| {
                let mut values = row.values().to_vec();
                values.push(map.remove(&self.field).unwrap_or(Value::Null));
                Row::new(values)
            })
            .collect();
        Ok(TransformOutcome::Expand(rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> Schema {
        Schema::new(vec![PipeColumnInfo::new("tags", LogicalType::String, false)])
    }

    #[test]
    fn splits_a_row_into_one_row_per_token() {
        let group = vec![TransformerConfig::new("expand", vec!["split(row.tags) as tag".into()])];
        let mut t = ExpandTransformer::new(&group).unwrap();
        let out_schema = t.initialize(&schema()).unwrap();
        assert_eq!(out_schema.names(), vec!["tags", "tag"]);
        let row = Row::new(vec![Value::String("a,b,c".into())]);
        match t.transform(row).unwrap() {
            TransformOutcome::Expand(rows) => {
                assert_eq!(rows.len(), 3);
                assert_eq!(rows[1].get(1), Some(&Value::String("b".into())));
            }
            _ => panic!("expected an expansion"),
        }
    }
}
