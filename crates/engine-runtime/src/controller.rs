//! The Job Controller (spec §4.1 step 0, §3): turns a frozen `JobDefinition`
//! into an open reader, a built transformer chain, and the right `Writer`
//! for the output endpoint's kind, then drives `engine_core::kernel::run`.
//! Owns the one invariant the kernel itself cannot enforce — staging-table
//! cleanup must happen whether the run succeeds or fails (spec §8: "no
//! staging tables... remain" at job end either way) — by retaining the
//! concrete `WriterStrategyEngine` alongside the `&mut dyn Writer` it hands
//! to the kernel.

use connectors::reader::ReaderOptions;
use connectors::{open_file_sink, open_reader, open_sql_adapter};
use engine_core::error::EngineError;
use engine_core::kernel::{self, RunOptions, RunResult, Writer};
use engine_core::transform::build_pipeline;
use model::execution::endpoint::EndpointKind;
use model::execution::job::JobDefinition;
use model::execution::metrics::PipelineMetrics;
use model::progress::ProgressService;
use tokio_util::sync::CancellationToken;

use crate::file_writer::FileWriter;
use crate::writer_engine::WriterStrategyEngine;

/// Either side of the one staging-cleanup fork: database sinks carry a
/// `WriterStrategyEngine` that may have left a staging table behind on
/// failure; file sinks have no such state to clean up.
enum Sink {
    Database(WriterStrategyEngine),
    File(FileWriter),
}

impl Sink {
    fn as_writer(&mut self) -> &mut dyn Writer {
        match self {
            Sink::Database(w) => w,
            Sink::File(w) => w,
        }
    }

    async fn cleanup_staging(&mut self) {
        if let Sink::Database(writer) = self {
            let _ = writer.cleanup_staging().await;
        }
    }
}

/// The outcome of one `execute_job` call: the kernel's row/batch counters
/// plus the metrics and progress services the caller may want to inspect
/// or render (e.g. for `--metrics-out` or the CLI's summary line).
#[derive(Debug)]
pub struct JobOutcome {
    pub result: RunResult,
    pub metrics: PipelineMetrics,
}

/// Builds the reader, transformer chain, and writer for `job` and runs it
/// through `engine_core::kernel::run`. Staging cleanup runs unconditionally
/// after the kernel returns, on both the success and failure paths.
pub async fn execute_job(job: &JobDefinition, cancellation: &CancellationToken) -> Result<JobOutcome, EngineError> {
    job.validate()?;

    let mut reader = open_reader(&job.input, job.query.as_deref()).await?;
    let reader_opts = ReaderOptions {
        connection_timeout_ms: job.timeouts.connection_timeout_ms,
        query_timeout_ms: job.timeouts.query_timeout_ms,
        fetch_size: Some(job.batch_size),
        array_binding: matches!(job.insert_mode, model::execution::job::InsertMode::Bulk),
    };

    let mut transformers = build_pipeline(&job.transformers)?;

    let mut sink = open_sink(job).await?;

    let run_options = RunOptions {
        batch_size: job.batch_size,
        limit: job.limit,
        sampling: job.sampling,
        retry: job.retry,
        hooks: job.hooks.clone(),
        strict_schema: job.strict_schema,
    };
    let metrics = PipelineMetrics::new();
    let progress = ProgressService::new();

    let run = kernel::run(
        reader.as_mut(),
        &reader_opts,
        &mut transformers,
        sink.as_writer(),
        &run_options,
        &metrics,
        &progress,
        cancellation,
    )
    .await;

    sink.cleanup_staging().await;

    let result = run?;
    Ok(JobOutcome { result, metrics })
}

async fn open_sink(job: &JobDefinition) -> Result<Sink, EngineError> {
    match job.output.kind {
        EndpointKind::Postgres | EndpointKind::MsSql | EndpointKind::Oracle | EndpointKind::DuckDb | EndpointKind::Sqlite => {
            let adapter = open_sql_adapter(&job.output).await?;
            let target_table = job
                .target_table
                .clone()
                .ok_or_else(|| EngineError::Fatal("database sink requires a target table".into()))?;
            Ok(Sink::Database(WriterStrategyEngine::new(
                adapter,
                target_table,
                job.strategy,
                job.insert_mode,
                job.key_columns.clone(),
                job.auto_migrate,
            )))
        }
        EndpointKind::Csv | EndpointKind::Parquet | EndpointKind::Arrow => {
            let file_sink = open_file_sink(&job.output).await?;
            Ok(Sink::File(FileWriter::new(file_sink, job.strategy)))
        }
        EndpointKind::Generate => Err(EngineError::Fatal("generate is a source-only endpoint, not a valid sink".into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::execution::endpoint::Endpoint;
    use model::execution::job::{InsertMode, LifecycleHooks, RetryPolicyConfig, TimeoutConfig, WriteStrategy};

    fn base_job() -> JobDefinition {
        JobDefinition {
            input: Endpoint {
                kind: EndpointKind::Generate,
                location: "0".into(),
            },
            output: Endpoint {
                kind: EndpointKind::Generate,
                location: "x".into(),
            },
            query: None,
            unsafe_query: false,
            timeouts: TimeoutConfig::default(),
            batch_size: 100,
            limit: None,
            sampling: None,
            retry: RetryPolicyConfig::default(),
            strategy: WriteStrategy::Append,
            insert_mode: InsertMode::Standard,
            target_table: None,
            key_columns: vec![],
            hooks: LifecycleHooks::default(),
            strict_schema: false,
            auto_migrate: false,
            metrics_path: None,
            dry_run_count: None,
            transformers: vec![],
        }
    }

    #[tokio::test]
    async fn generate_output_is_rejected_as_a_sink() {
        let job = base_job();
        let cancellation = CancellationToken::new();
        let err = execute_job(&job, &cancellation).await.unwrap_err();
        assert!(matches!(err, EngineError::Fatal(_)));
    }

    #[tokio::test]
    async fn database_sink_without_target_table_is_rejected_before_any_read() {
        let mut job = base_job();
        job.output = Endpoint {
            kind: EndpointKind::Sqlite,
            location: ":memory:".into(),
        };
        job.target_table = None;
        let cancellation = CancellationToken::new();
        let err = execute_job(&job, &cancellation).await.unwrap_err();
        assert!(matches!(err, EngineError::Fatal(_)));
    }

    #[tokio::test]
    async fn zero_batch_size_fails_validation_before_opening_anything() {
        let mut job = base_job();
        job.batch_size = 0;
        let cancellation = CancellationToken::new();
        let err = execute_job(&job, &cancellation).await.unwrap_err();
        assert!(matches!(err, EngineError::Fatal(_)));
    }
}
