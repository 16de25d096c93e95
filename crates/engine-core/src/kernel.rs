//! The Pipeline Kernel (spec §4.1): `PreExec -> ReaderOpen -> WriterPrepare
//! -> Loop{ReadBatch -> Transform -> WriteBatch} -> WriterComplete ->
//! PostExec -> Finally`, with `OnError` firing on a non-cancellation fatal
//! failure and `Finally` always running — including when `PreExec` itself
//! fails, a deliberate reading of the state machine recorded in the design
//! ledger.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use connectors::reader::{ReaderOptions, Reader};
use model::execution::job::{LifecycleHooks, RetryPolicyConfig};
use model::execution::metrics::PipelineMetrics;
use model::progress::{ProgressService, RunStage};
use model::records::batch::Batch;
use model::records::row::Row;
use model::{SamplingConfig, Schema};
use tokio_util::sync::CancellationToken;

use crate::error::EngineError;
use crate::hooks;
use crate::retry::with_retry;
use crate::sampling::Sampler;
use crate::transform::{TransformOutcome, Transformer};

/// The write side of the kernel loop. Implemented by `engine-runtime` for
/// both database sinks (wrapping a `connectors::sql::SqlAdapter` through
/// the Writer Strategy Engine's state machine) and file sinks (wrapping
/// `connectors::writer::FileSink`).
#[async_trait]
pub trait Writer: Send {
    /// Prepares the sink for the incoming schema: introspects, creates, or
    /// validates the target, per the configured write strategy. Runs
    /// strictly before the read loop starts (spec §8 scenario 4: a
    /// strict-schema mismatch must be fatal before any `ReadBatch` call).
    async fn initialize(&mut self, schema: &Schema, strict_schema: bool) -> Result<(), EngineError>;

    async fn write_batch(&mut self, batch: &Batch) -> Result<(), EngineError>;

    async fn complete(&mut self) -> Result<(), EngineError>;
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub batch_size: usize,
    pub limit: Option<u64>,
    pub sampling: Option<SamplingConfig>,
    pub retry: RetryPolicyConfig,
    pub hooks: LifecycleHooks,
    pub strict_schema: bool,
}

#[derive(Debug, Clone, Default)]
pub struct RunResult {
    pub rows_in: u64,
    pub rows_out: u64,
    pub rows_filtered: u64,
    pub batches: u64,
    pub duration: Duration,
}

/// Runs one job end to end. Owns reader open/close, threading the schema
/// through the transformer chain's `initialize`, writer prepare/write/
/// complete, retrying transient reader/writer failures, honoring
/// cancellation between batches, and firing the four lifecycle hooks.
pub async fn run(
    reader: &mut dyn Reader,
    reader_opts: &ReaderOptions,
    transformers: &mut [Box<dyn Transformer>],
    writer: &mut dyn Writer,
    options: &RunOptions,
    metrics: &PipelineMetrics,
    progress: &ProgressService,
    cancellation: &CancellationToken,
) -> Result<RunResult, EngineError> {
    let start = Instant::now();
    progress.set_stage(RunStage::PreExec);

    let body = run_body(reader, reader_opts, transformers, writer, options, metrics, progress, cancellation).await;

    match &body {
        Ok(_) => {
            progress.set_stage(RunStage::PostExec);
            if let Some(script) = &options.hooks.post_exec {
                hooks::run_best_effort(script).await;
            }
        }
        Err(err) if !err.is_cancelled() => {
            if let Some(script) = &options.hooks.on_error_exec {
                hooks::run_best_effort(script).await;
            }
        }
        Err(_) => {}
    }

    progress.set_stage(RunStage::Finally);
    if let Some(script) = &options.hooks.finally_exec {
        hooks::run_best_effort(script).await;
    }

    match body {
        Ok(mut result) => {
            result.duration = start.elapsed();
            progress.set_stage(RunStage::Done);
            Ok(result)
        }
        Err(err) => {
            progress.set_stage(RunStage::Failed);
            Err(err)
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_body(
    reader: &mut dyn Reader,
    reader_opts: &ReaderOptions,
    transformers: &mut [Box<dyn Transformer>],
    writer: &mut dyn Writer,
    options: &RunOptions,
    metrics: &PipelineMetrics,
    progress: &ProgressService,
    cancellation: &CancellationToken,
) -> Result<RunResult, EngineError> {
    if let Some(script) = &options.hooks.pre_exec {
        hooks::run_fatal(script).await?;
    }

    progress.set_stage(RunStage::ReaderOpen);
    let source_schema = with_retry(&options.retry, metrics, || reader.open(reader_opts)).await?;

    let mut schema = source_schema;
    for transformer in transformers.iter_mut() {
        schema = transformer.initialize(&schema)?;
    }
    let output_schema = schema;

    progress.set_stage(RunStage::WriterPrepare);
    writer.initialize(&output_schema, options.strict_schema).await?;

    progress.set_stage(RunStage::Streaming);
    let mut sampler = options.sampling.as_ref().filter(|s| s.is_active()).map(Sampler::new);

    let mut rows_in: u64 = 0;
    let mut rows_out: u64 = 0;
    let mut rows_filtered: u64 = 0;
    let mut batches: u64 = 0;
    let mut limit_reached = false;

    loop {
        if cancellation.is_cancelled() {
            return Err(EngineError::Cancelled);
        }

        let read_result = with_retry(&options.retry, metrics, || reader.read_batch(options.batch_size)).await?;
        rows_in += read_result.rows.len() as u64;
        metrics.record_rows_read(read_result.rows.len() as u64);

        let mut out_rows = Vec::with_capacity(read_result.rows.len());
        'rows: for row in read_result.rows {
            if let Some(sampler) = sampler.as_mut() {
                if !sampler.keep() {
                    rows_filtered += 1;
                    metrics.record_rows_filtered(1);
                    continue 'rows;
                }
            }
            let mut chain_filtered = 0u64;
            let produced_rows = apply_chain(transformers, row, &mut chain_filtered)?;
            if chain_filtered > 0 {
                rows_filtered += chain_filtered;
                metrics.record_rows_filtered(chain_filtered);
            }
            for produced in produced_rows {
                out_rows.push(produced);
                rows_out += 1;
                if let Some(limit) = options.limit {
                    if rows_out >= limit {
                        limit_reached = true;
                        break 'rows;
                    }
                }
            }
        }

        write_if_any(writer, &output_schema, out_rows, options, metrics, &mut batches).await?;
        progress.set_rows(rows_in, rows_out);

        if read_result.exhausted || limit_reached {
            break;
        }
    }

    let mut flush_filtered = 0u64;
    let flushed = remaining_after_limit(flush_chain(transformers, &mut flush_filtered)?, rows_out, options.limit);
    if flush_filtered > 0 {
        rows_filtered += flush_filtered;
        metrics.record_rows_filtered(flush_filtered);
    }
    if !flushed.is_empty() {
        rows_out += flushed.len() as u64;
        write_if_any(writer, &output_schema, flushed, options, metrics, &mut batches).await?;
    }

    progress.set_stage(RunStage::WriterComplete);
    writer.complete().await?;
    reader.close().await?;

    Ok(RunResult {
        rows_in,
        rows_out,
        rows_filtered,
        batches,
        duration: Duration::default(),
    })
}

fn remaining_after_limit(rows: Vec<Row>, rows_out_so_far: u64, limit: Option<u64>) -> Vec<Row> {
    match limit {
        Some(limit) => {
            let remaining = limit.saturating_sub(rows_out_so_far) as usize;
            rows.into_iter().take(remaining).collect()
        }
        None => rows,
    }
}

async fn write_if_any(
    writer: &mut dyn Writer,
    schema: &Schema,
    rows: Vec<Row>,
    options: &RunOptions,
    metrics: &PipelineMetrics,
    batches: &mut u64,
) -> Result<(), EngineError> {
    if rows.is_empty() {
        return Ok(());
    }
    let batch = Batch::new(schema.clone(), rows);
    with_retry(&options.retry, metrics, || writer.write_batch(&batch)).await?;
    metrics.record_batch();
    metrics.record_rows_written(batch.len() as u64);
    metrics.record_bytes_written(batch.size_bytes() as u64);
    *batches += 1;
    Ok(())
}

/// Threads one row through the transformer chain starting at `transformers[0]`,
/// fanning out recursively on `Expand` and short-circuiting on `Filter`.
/// Every `Filter` outcome reached along the way — including ones produced
/// from an upstream `Expand`'s fan-out — increments `filtered`, so the
/// caller can feed the row-conservation invariant (spec §8) the same way it
/// already does for sampling drops.
fn apply_chain(transformers: &mut [Box<dyn Transformer>], row: Row, filtered: &mut u64) -> Result<Vec<Row>, EngineError> {
    match transformers.split_first_mut() {
        None => Ok(vec![row]),
        Some((first, rest)) => match first.transform(row)? {
            TransformOutcome::Filter => {
                *filtered += 1;
                Ok(Vec::new())
            }
            TransformOutcome::Row(row) => apply_chain(rest, row, filtered),
            TransformOutcome::Expand(rows) => {
                let mut out = Vec::with_capacity(rows.len());
                for row in rows {
                    out.extend(apply_chain(rest, row, filtered)?);
                }
                Ok(out)
            }
        },
    }
}

/// Drains each transformer's buffered trailing rows (only `window` holds
/// any), threading each drained row through the remainder of the chain
/// from that transformer's own position forward.
fn flush_chain(transformers: &mut [Box<dyn Transformer>], filtered: &mut u64) -> Result<Vec<Row>, EngineError> {
    let mut accumulated = Vec::new();
    for i in 0..transformers.len() {
        let drained = transformers[i].finish()?;
        if drained.is_empty() {
            continue;
        }
        let rest = &mut transformers[i + 1..];
        for row in drained {
            accumulated.extend(apply_chain(rest, row, filtered)?);
        }
    }
    Ok(accumulated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use connectors::error::ConnectorError;
    use connectors::reader::ReadResult;
    use model::core::data_type::LogicalType;
    use model::core::schema::PipeColumnInfo;
    use model::core::value::Value;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct VecReader {
        schema: Schema,
        batches: Mutex<Vec<Vec<Row>>>,
        opened: AtomicUsize,
    }

    #[async_trait]
    impl Reader for VecReader {
        async fn open(&mut self, _opts: &ReaderOptions) -> connectors::error::Result<Schema> {
            self.opened.fetch_add(1, Ordering::SeqCst);
            Ok(self.schema.clone())
        }

        async fn read_batch(&mut self, _batch_size: usize) -> connectors::error::Result<ReadResult> {
            let mut batches = self.batches.lock().unwrap();
            if batches.is_empty() {
                return Ok(ReadResult { rows: Vec::new(), exhausted: true });
            }
            let rows = batches.remove(0);
            let exhausted = batches.is_empty();
            Ok(ReadResult { rows, exhausted })
        }

        async fn close(&mut self) -> connectors::error::Result<()> {
            Ok(())
        }
    }

    struct RecordingWriter {
        written: Mutex<Vec<Row>>,
        fail_first: AtomicUsize,
    }

    #[async_trait]
    impl Writer for RecordingWriter {
        async fn initialize(&mut self, _schema: &Schema, _strict_schema: bool) -> Result<(), EngineError> {
            Ok(())
        }

        async fn write_batch(&mut self, batch: &Batch) -> Result<(), EngineError> {
            if self.fail_first.load(Ordering::SeqCst) > 0 {
                self.fail_first.fetch_sub(1, Ordering::SeqCst);
                return Err(EngineError::Transient("connection reset".into()));
            }
            self.written.lock().unwrap().extend(batch.rows().iter().cloned());
            Ok(())
        }

        async fn complete(&mut self) -> Result<(), EngineError> {
            Ok(())
        }
    }

    fn schema() -> Schema {
        Schema::new(vec![PipeColumnInfo::new("id", LogicalType::Int64, false)])
    }

    fn rows(ids: &[i64]) -> Vec<Row> {
        ids.iter().map(|id| Row::new(vec![Value::Int64(*id)])).collect()
    }

    #[tokio::test]
    async fn streams_all_batches_through_to_the_writer() {
        let mut reader = VecReader {
            schema: schema(),
            batches: Mutex::new(vec![rows(&[1, 2]), rows(&[3])]),
            opened: AtomicUsize::new(0),
        };
        let mut writer = RecordingWriter {
            written: Mutex::new(Vec::new()),
            fail_first: AtomicUsize::new(0),
        };
        let options = RunOptions {
            batch_size: 2,
            limit: None,
            sampling: None,
            retry: RetryPolicyConfig::default(),
            hooks: LifecycleHooks::default(),
            strict_schema: true,
        };
        let metrics = PipelineMetrics::new();
        let progress = ProgressService::new();
        let cancellation = CancellationToken::new();
        let mut chain: Vec<Box<dyn Transformer>> = Vec::new();

        let result = run(&mut reader, &ReaderOptions::default(), &mut chain, &mut writer, &options, &metrics, &progress, &cancellation)
            .await
            .unwrap();

        assert_eq!(result.rows_in, 3);
        assert_eq!(result.rows_out, 3);
        assert_eq!(writer.written.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn limit_stops_the_stream_early() {
        let mut reader = VecReader {
            schema: schema(),
            batches: Mutex::new(vec![rows(&[1, 2, 3, 4, 5])]),
            opened: AtomicUsize::new(0),
        };
        let mut writer = RecordingWriter {
            written: Mutex::new(Vec::new()),
            fail_first: AtomicUsize::new(0),
        };
        let options = RunOptions {
            batch_size: 10,
            limit: Some(2),
            sampling: None,
            retry: RetryPolicyConfig::default(),
            hooks: LifecycleHooks::default(),
            strict_schema: true,
        };
        let metrics = PipelineMetrics::new();
        let progress = ProgressService::new();
        let cancellation = CancellationToken::new();
        let mut chain: Vec<Box<dyn Transformer>> = Vec::new();

        let result = run(&mut reader, &ReaderOptions::default(), &mut chain, &mut writer, &options, &metrics, &progress, &cancellation)
            .await
            .unwrap();

        assert_eq!(result.rows_out, 2);
        assert_eq!(writer.written.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn transient_write_failure_is_retried() {
        let mut reader = VecReader {
            schema: schema(),
            batches: Mutex::new(vec![rows(&[1])]),
            opened: AtomicUsize::new(0),
        };
        let mut writer = RecordingWriter {
            written: Mutex::new(Vec::new()),
            fail_first: AtomicUsize::new(1),
        };
        let options = RunOptions {
            batch_size: 10,
            limit: None,
            sampling: None,
            retry: RetryPolicyConfig {
                max_retries: 2,
                retry_delay_ms: 0,
            },
            hooks: LifecycleHooks::default(),
            strict_schema: true,
        };
        let metrics = PipelineMetrics::new();
        let progress = ProgressService::new();
        let cancellation = CancellationToken::new();
        let mut chain: Vec<Box<dyn Transformer>> = Vec::new();

        let result = run(&mut reader, &ReaderOptions::default(), &mut chain, &mut writer, &options, &metrics, &progress, &cancellation)
            .await
            .unwrap();

        assert_eq!(result.rows_out, 1);
        assert_eq!(metrics.snapshot().retries, 1);
    }

    struct DropOddTransformer;

    impl Transformer for DropOddTransformer {
        fn initialize(&mut self, schema_in: &Schema) -> Result<Schema, EngineError> {
            Ok(schema_in.clone())
        }

        fn transform(&mut self, row: Row) -> Result<TransformOutcome, EngineError> {
            match row.get(0) {
                Some(Value::Int64(id)) if id % 2 == 1 => Ok(TransformOutcome::Filter),
                _ => Ok(TransformOutcome::Row(row)),
            }
        }
    }

    #[tokio::test]
    async fn predicate_filtered_rows_are_counted_in_rows_filtered_and_metrics() {
        let mut reader = VecReader {
            schema: schema(),
            batches: Mutex::new(vec![rows(&[1, 2, 3, 4, 5])]),
            opened: AtomicUsize::new(0),
        };
        let mut writer = RecordingWriter {
            written: Mutex::new(Vec::new()),
            fail_first: AtomicUsize::new(0),
        };
        let options = RunOptions {
            batch_size: 10,
            limit: None,
            sampling: None,
            retry: RetryPolicyConfig::default(),
            hooks: LifecycleHooks::default(),
            strict_schema: true,
        };
        let metrics = PipelineMetrics::new();
        let progress = ProgressService::new();
        let cancellation = CancellationToken::new();
        let mut chain: Vec<Box<dyn Transformer>> = vec![Box::new(DropOddTransformer)];

        let result = run(&mut reader, &ReaderOptions::default(), &mut chain, &mut writer, &options, &metrics, &progress, &cancellation)
            .await
            .unwrap();

        assert_eq!(result.rows_in, 5);
        assert_eq!(result.rows_out, 2);
        assert_eq!(result.rows_filtered, 3);
        assert_eq!(metrics.snapshot().rows_filtered, 3);
        // row conservation (spec §8): rowsRead - rowsFiltered + rowsExpanded == rowsWritten + rowsRejected
        assert_eq!(result.rows_in - result.rows_filtered, result.rows_out);
    }

    #[tokio::test]
    async fn cancellation_stops_the_loop() {
        let mut reader = VecReader {
            schema: schema(),
            batches: Mutex::new(vec![rows(&[1]), rows(&[2])]),
            opened: AtomicUsize::new(0),
        };
        let mut writer = RecordingWriter {
            written: Mutex::new(Vec::new()),
            fail_first: AtomicUsize::new(0),
        };
        let options = RunOptions {
            batch_size: 1,
            limit: None,
            sampling: None,
            retry: RetryPolicyConfig::default(),
            hooks: LifecycleHooks::default(),
            strict_schema: true,
        };
        let metrics = PipelineMetrics::new();
        let progress = ProgressService::new();
        let cancellation = CancellationToken::new();
        cancellation.cancel();
        let mut chain: Vec<Box<dyn Transformer>> = Vec::new();

        let result = run(&mut reader, &ReaderOptions::default(), &mut chain, &mut writer, &options, &metrics, &progress, &cancellation).await;

        assert!(matches!(result, Err(EngineError::Cancelled)));
    }

    #[allow(dead_code)]
    fn assert_connector_error_converts(err: ConnectorError) -> EngineError {
        EngineError::from(err)
    }
}
