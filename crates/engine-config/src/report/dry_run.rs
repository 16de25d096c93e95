//! The dry-run tracer (spec §4.1 "dry-run count", §4.4): runs a bounded
//! sample of rows through the reader and transformer chain without ever
//! touching a writer, recording the schema at each stage and, when a
//! target is supplied, the Schema & Constraint Validator's findings.

use connectors::reader::{Reader, ReaderOptions};
use engine_core::error::EngineError;
use engine_core::transform::{TransformOutcome, Transformer};
use model::core::schema::{Schema, TargetSchemaInfo};
use model::records::row::Row;
use planner::Dialect;

use crate::validation::{validate_row_sample, validate_schema, RowFinding, SchemaValidationReport};

/// The schema produced after `stage` (`"reader"` or a 1-based transformer
/// index) — spec §4.2's schema-evolution contract made observable without
/// running the whole job.
#[derive(Debug, Clone)]
pub struct StageSchema {
    pub stage: String,
    pub schema: Schema,
}

#[derive(Debug, Clone)]
pub struct DryRunReport {
    pub rows_sampled: usize,
    pub stages: Vec<StageSchema>,
    pub sample_rows: Vec<Vec<String>>,
    pub schema_report: Option<SchemaValidationReport>,
    pub row_findings: Vec<RowFinding>,
}

impl DryRunReport {
    pub fn has_errors(&self) -> bool {
        self.schema_report.as_ref().is_some_and(|r| r.has_errors())
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("dry run: sampled {} row(s)\n", self.rows_sampled));
        for stage in &self.stages {
            out.push_str(&format!("  [{}] columns: {}\n", stage.stage, stage.schema.names().join(", ")));
        }
        for (i, row) in self.sample_rows.iter().enumerate() {
            out.push_str(&format!("  row {i}: {}\n", row.join(", ")));
        }
        if let Some(report) = &self.schema_report {
            out.push_str("schema validation:\n");
            out.push_str(&report.render());
        }
        for finding in &self.row_findings {
            out.push_str(&format!("  [row {}] {}: {}\n", finding.row_index, finding.column, finding.detail));
        }
        out
    }
}

pub struct DryRunTracer;

impl DryRunTracer {
    /// Opens `reader`, threads its schema through `transformers`
    /// (recording each stage), pulls up to `sample_size` final rows, and —
    /// when `target`/`dialect` are supplied — runs the Schema & Constraint
    /// Validator against the final schema and the sampled rows.
    pub async fn trace(
        reader: &mut dyn Reader,
        reader_opts: &ReaderOptions,
        transformers: &mut [Box<dyn Transformer>],
        target: Option<&TargetSchemaInfo>,
        dialect: Option<&dyn Dialect>,
        sample_size: u64,
    ) -> Result<DryRunReport, EngineError> {
        let mut stages = Vec::with_capacity(transformers.len() + 1);
        let source_schema = reader.open(reader_opts).await?;
        stages.push(StageSchema { stage: "reader".into(), schema: source_schema.clone() });

        let mut schema = source_schema;
        for (i, transformer) in transformers.iter_mut().enumerate() {
            schema = transformer.initialize(&schema)?;
            stages.push(StageSchema { stage: format!("transform[{i}]"), schema: schema.clone() });
        }
        let final_schema = schema;

        let mut collected: Vec<Row> = Vec::new();
        loop {
            if collected.len() as u64 >= sample_size {
                break;
            }
            let batch = reader.read_batch(sample_size as usize).await?;
            let exhausted = batch.exhausted;
            for row in batch.rows {
                if collected.len() as u64 >= sample_size {
                    break;
                }
                collected.extend(apply_chain(transformers, row)?);
            }
            if exhausted {
                break;
            }
        }
        collected.truncate(sample_size as usize);

        let sample_rows = collected.iter().map(|row| row.values().iter().map(model::Value::as_display_string).collect()).collect();

        let schema_report = match (target, dialect) {
            (Some(target), Some(dialect)) => Some(validate_schema(&final_schema, target, dialect)),
            _ => None,
        };
        let row_findings = match target {
            Some(target) => validate_row_sample(&final_schema, target, &collected),
            None => Vec::new(),
        };

        Ok(DryRunReport {
            rows_sampled: collected.len(),
            stages,
            sample_rows,
            schema_report,
            row_findings,
        })
    }
}

/// Threads one row through the transformer chain, matching
/// `engine_core::kernel`'s cardinality rules (filter short-circuits,
/// expand fans out) — duplicated rather than exported because the kernel
/// keeps this as a private implementation detail of the real run loop.
fn apply_chain(transformers: &mut [Box<dyn Transformer>], row: Row) -> Result<Vec<Row>, EngineError> {
    match transformers.split_first_mut() {
        None => Ok(vec![row]),
        Some((first, rest)) => match first.transform(row)? {
            TransformOutcome::Filter => Ok(Vec::new()),
            TransformOutcome::Row(row) => apply_chain(rest, row),
            TransformOutcome::Expand(rows) => {
                let mut out = Vec::with_capacity(rows.len());
                for row in rows {
                    out.extend(apply_chain(rest, row)?);
                }
                Ok(out)
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use connectors::error::Result as ConnResult;
    use connectors::reader::ReadResult;
    use model::core::data_type::LogicalType;
    use model::core::schema::PipeColumnInfo;
    use model::Value;

    struct FixedReader {
        schema: Schema,
        rows: Vec<Row>,
    }

    #[async_trait]
    impl Reader for FixedReader {
        async fn open(&mut self, _opts: &ReaderOptions) -> ConnResult<Schema> {
            Ok(self.schema.clone())
        }

        async fn read_batch(&mut self, batch_size: usize) -> ConnResult<ReadResult> {
            let take = self.rows.len().min(batch_size);
            let rows = self.rows.drain(..take).collect::<Vec<_>>();
            Ok(ReadResult { exhausted: self.rows.is_empty(), rows })
        }

        async fn close(&mut self) -> ConnResult<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn traces_reader_schema_with_no_transformers() {
        let mut reader = FixedReader {
            schema: Schema::new(vec![PipeColumnInfo::new("id", LogicalType::Int64, false)]),
            rows: vec![Row::new(vec![Value::Int64(1)]), Row::new(vec![Value::Int64(2)])],
        };
        let mut chain: Vec<Box<dyn Transformer>> = Vec::new();
        let report = DryRunTracer::trace(&mut reader, &ReaderOptions::default(), &mut chain, None, None, 1)
            .await
            .unwrap();
        assert_eq!(report.rows_sampled, 1);
        assert_eq!(report.stages.len(), 1);
        assert!(!report.has_errors());
    }
}
