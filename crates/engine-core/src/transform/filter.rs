//! `--filter expr` (spec §4.2): drops the row if `expr` evaluates falsy. No
//! schema effect.

use model::core::schema::Schema;
use model::execution::job::TransformerConfig;
use model::records::row::Row;

use crate::context::RowEvalContext;
use crate::error::EngineError;
use crate::transform::{TransformOutcome, Transformer};
use expression_engine::{DefaultScriptEngine, ScriptEngine};

pub struct FilterTransformer {
    expr: String,
    schema: Schema,
    engine: DefaultScriptEngine,
}

impl FilterTransformer {
    pub fn new(group: &[TransformerConfig]) -> Result<Self, EngineError> {
        let expr = group
            .iter()
            .flat_map(|c| c.args.iter())
            .next()
            .cloned()
            .ok_or_else(|| EngineError::Fatal("filter transformer requires a predicate expression".to_string()))?;
        Ok(Self {
            expr,
            schema: Schema::empty(),
            engine: DefaultScriptEngine::new(),
        })
    }
}

impl Transformer for FilterTransformer {
    fn initialize(&mut self, schema_in: &Schema) -> Result<Schema, EngineError> {
        self.schema = schema_in.clone();
        Ok(schema_in.clone())
    }

    fn transform(&mut self, row: Row) -> Result<TransformOutcome, EngineError> {
        let ctx = RowEvalContext::new(&row, &self.schema);
        if self.engine.predicate(&self.expr, &ctx)? {
            Ok(TransformOutcome::Row(row))
        } else {
            Ok(TransformOutcome::Filter)
        }
    }
}
