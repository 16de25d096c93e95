//! The Transformer Composition Model (spec §4.2): a `TransformerConfig` list
//! is grouped into runs of consecutive identical `kind`s, each run becoming
//! one transformer instance built over its whole argument set — two
//! `--mask` flags that are not adjacent in the CLI/YAML directive order
//! become two separate `mask` transformers, not one.

mod compute;
mod drop_columns;
mod expand;
mod fake;
mod filter;
mod format;
mod mask;
mod null;
mod overwrite;
mod window;

use model::core::schema::Schema;
use model::execution::job::TransformerConfig;
use model::records::row::Row;

use crate::error::EngineError;

/// What a transformer did with one input row.
pub enum TransformOutcome {
    /// Replace the input row with this one row.
    Row(Row),
    /// Drop the input row; it produces no output.
    Filter,
    /// Replace the input row with zero or more rows (cardinality change).
    Expand(Vec<Row>),
}

/// One transformer instance in the chain (spec §4.2). `initialize` is
/// called once per run, left-to-right, threading the schema through the
/// whole chain before any row flows; `transform` is called once per row in
/// input order.
pub trait Transformer: Send {
    fn initialize(&mut self, schema_in: &Schema) -> Result<Schema, EngineError>;

    fn transform(&mut self, row: Row) -> Result<TransformOutcome, EngineError>;

    /// Drains any rows buffered internally (only `window` uses this).
    /// Called once after the input stream is exhausted, before the
    /// writer's `complete`.
    fn finish(&mut self) -> Result<Vec<Row>, EngineError> {
        Ok(Vec::new())
    }
}

/// Builds the transformer chain from the job's ordered `TransformerConfig`
/// list, applying the grouping rule above.
pub fn build_pipeline(configs: &[TransformerConfig]) -> Result<Vec<Box<dyn Transformer>>, EngineError> {
    let mut pipeline: Vec<Box<dyn Transformer>> = Vec::new();
    let mut i = 0;
    while i < configs.len() {
        let kind = configs[i].kind.as_str();
        let mut j = i + 1;
        while j < configs.len() && configs[j].kind == kind {
            j += 1;
        }
        pipeline.push(build_group(kind, &configs[i..j])?);
        i = j;
    }
    Ok(pipeline)
}

fn build_group(kind: &str, group: &[TransformerConfig]) -> Result<Box<dyn Transformer>, EngineError> {
    match kind {
        "null" => Ok(Box::new(null::NullTransformer::new(group))),
        "overwrite" => Ok(Box::new(overwrite::OverwriteTransformer::new(group)?)),
        "mask" => Ok(Box::new(mask::MaskTransformer::new(group)?)),
        "fake" => fake::FakeTransformer::new(group).map(|t| Box::new(t) as Box<dyn Transformer>),
        "format" => format::FormatTransformer::new(group).map(|t| Box::new(t) as Box<dyn Transformer>),
        "compute" => compute::ComputeTransformer::new(group).map(|t| Box::new(t) as Box<dyn Transformer>),
        "filter" => filter::FilterTransformer::new(group).map(|t| Box::new(t) as Box<dyn Transformer>),
        "expand" => expand::ExpandTransformer::new(group).map(|t| Box::new(t) as Box<dyn Transformer>),
        "window" => window::WindowTransformer::new(group).map(|t| Box::new(t) as Box<dyn Transformer>),
        "drop" => Ok(Box::new(drop_columns::DropTransformer::new(group))),
        other => Err(EngineError::Fatal(format!("unknown transformer kind `{other}`"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_only_adjacent_runs_of_the_same_kind() {
        let configs = vec![
            TransformerConfig::new("null", vec!["a".into()]),
            TransformerConfig::new("null", vec!["b".into()]),
            TransformerConfig::new("drop", vec!["c".into()]),
            TransformerConfig::new("null", vec!["d".into()]),
        ];
        // two `null` runs separated by a `drop` must build three instances,
        // not one `null` instance collecting all three columns.
        let pipeline = build_pipeline(&configs).unwrap();
        assert_eq!(pipeline.len(), 3);
    }

    #[test]
    fn unknown_kind_is_a_fatal_build_error() {
        let configs = vec![TransformerConfig::new("bogus", vec![])];
        assert!(build_pipeline(&configs).is_err());
    }
}
