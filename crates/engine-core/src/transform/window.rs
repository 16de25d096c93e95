//! `--window N` (spec §4.2): buffers rows until `N` have accumulated, then
//! releases them together — a stand-in for a real batch-level script
//! evaluator (out of scope per spec §1: "the JavaScript evaluator embedded
//! by scripting transformers"), so this implementation's window closes by
//! passing its buffered rows through unchanged rather than running an
//! aggregate computation over them. No schema effect.

use model::core::schema::Schema;
use model::execution::job::TransformerConfig;
use model::records::row::Row;

use crate::error::EngineError;
use crate::transform::{TransformOutcome, Transformer};

pub struct WindowTransformer {
    size: usize,
    buffer: Vec<Row>,
}

impl WindowTransformer {
    pub fn new(group: &[TransformerConfig]) -> Result<Self, EngineError> {
        let size = group
            .iter()
            .flat_map(|c| c.args.iter())
            .next()
            .and_then(|s| s.parse::<usize>().ok())
            .filter(|&n| n > 0)
            .ok_or_else(|| EngineError::Fatal("window transformer requires a positive integer size".to_string()))?;
        Ok(Self {
            size,
            buffer: Vec::new(),
        })
    }
}

impl Transformer for WindowTransformer {
    fn initialize(&mut self, schema_in: &Schema) -> Result<Schema, EngineError> {
        Ok(schema_in.clone())
    }

    fn transform(&mut self, row: Row) -> Result<TransformOutcome, EngineError> {
        self.buffer.push(row);
        if self.buffer.len() >= self.size {
            Ok(TransformOutcome::Expand(std::mem::take(&mut self.buffer)))
        } else {
            Ok(TransformOutcome::Filter)
        }
    }

    fn finish(&mut self) -> Result<Vec<Row>, EngineError> {
        Ok(std::mem::take(&mut self.buffer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::core::value::Value;

    #[test]
    fn releases_rows_once_the_window_fills() {
        let group = vec![TransformerConfig::new("window", vec!["2".into()])];
        let mut t = WindowTransformer::new(&group).unwrap();
        t.initialize(&Schema::empty()).unwrap();
        assert!(matches!(t.transform(Row::new(vec![Value::Int64(1)])).unwrap(), TransformOutcome::Filter));
        match t.transform(Row::new(vec![Value::Int64(2)])).unwrap() {
            TransformOutcome::Expand(rows) => assert_eq!(rows.len(), 2),
            _ => panic!("expected an expansion"),
        }
    }

    #[test]
    fn finish_flushes_a_partial_window() {
        let group = vec![TransformerConfig::new("window", vec!["5".into()])];
        let mut t = WindowTransformer::new(&group).unwrap();
        t.initialize(&Schema::empty()).unwrap();
        t.transform(Row::new(vec![Value::Int64(1)])).unwrap();
        let flushed = t.finish().unwrap();
        assert_eq!(flushed.len(), 1);
    }
}
