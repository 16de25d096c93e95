use std::process;
use std::sync::Mutex;

use clap::Parser;
use connectors::sql::SqlAdapter;
use connectors::{open_reader, open_sql_adapter};
use engine_config::report::dry_run::DryRunTracer;
use engine_config::report::metrics::write_metrics_file;
use engine_config::report::summary::SummaryReport;
use engine_config::settings::{load_job_file, save_job_file};
use engine_core::transform::build_pipeline;
use engine_runtime::execute_job;
use model::execution::endpoint::EndpointKind;
use model::{JobDefinition, TargetSchemaInfo};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

mod args;
mod directives;
mod error;
mod job_build;

use args::Args;
use error::CliError;

#[tokio::main]
async fn main() {
    let argv: Vec<String> = std::env::args().skip(1).collect();

    let (transformers, remaining) = match directives::extract(&argv) {
        Ok(parsed) => parsed,
        Err(e) => {
            eprintln!("dtpipe: {e}");
            process::exit(1);
        }
    };

    let mut full_argv = vec!["dtpipe".to_string()];
    full_argv.extend(remaining);
    let args = match Args::try_parse_from(full_argv) {
        Ok(args) => args,
        Err(e) => e.exit(),
    };

    init_tracing(args.log.as_deref());

    let exit_code = match run(args, transformers).await {
        Ok(()) => 0,
        Err(e) => {
            if e.is_cancellation() {
                info!("run cancelled");
            } else {
                error!("{e}");
            }
            e.exit_code()
        }
    };

    process::exit(exit_code);
}

fn init_tracing(log_path: Option<&str>) {
    let builder = tracing_subscriber::fmt().with_max_level(tracing::Level::INFO);
    match log_path {
        Some(path) => match std::fs::File::create(path) {
            Ok(file) => builder.with_writer(Mutex::new(file)).init(),
            Err(e) => {
                builder.init();
                error!("failed to open log file `{path}`: {e}, logging to stderr instead");
            }
        },
        None => builder.with_writer(std::io::stderr).init(),
    }
}

async fn run(args: Args, transformers: Vec<model::TransformerConfig>) -> Result<(), CliError> {
    let base = match &args.job {
        Some(path) => Some(load_job_file(path)?),
        None => None,
    };

    let job = job_build::build(&args, base, transformers)?;

    if let Some(path) = &args.export_job {
        save_job_file(path, &job)?;
        info!("exported resolved job to {path}");
    }

    match job.dry_run_count {
        Some(sample_size) => run_dry_run(&job, sample_size).await,
        None => run_job(&job).await,
    }
}

async fn run_dry_run(job: &JobDefinition, sample_size: u64) -> Result<(), CliError> {
    let reader_opts = connectors::reader::ReaderOptions {
        connection_timeout_ms: job.timeouts.connection_timeout_ms,
        query_timeout_ms: job.timeouts.query_timeout_ms,
        fetch_size: Some(job.batch_size),
        array_binding: false,
    };
    let mut reader = open_reader(&job.input, job.query.as_deref()).await?;
    let mut transformers = build_pipeline(&job.transformers)?;

    let sql_sink = matches!(
        job.output.kind,
        EndpointKind::Postgres | EndpointKind::MsSql | EndpointKind::Oracle | EndpointKind::DuckDb | EndpointKind::Sqlite
    );
    let (target, dialect) = if sql_sink {
        if let Some(table) = &job.target_table {
            let adapter = open_sql_adapter(&job.output).await?;
            let target = if adapter.table_exists(table).await? {
                adapter.introspect_table(table).await?
            } else {
                TargetSchemaInfo::missing()
            };
            (Some(target), Some(planner::dialect_for(job.output.kind)?))
        } else {
            (None, None)
        }
    } else {
        (None, None)
    };

    let report = DryRunTracer::trace(
        reader.as_mut(),
        &reader_opts,
        &mut transformers,
        target.as_ref(),
        dialect.as_deref(),
        sample_size,
    )
    .await?;

    println!("{}", report.render());

    if job.strict_schema && report.has_errors() {
        return Err(CliError::Engine(engine_core::error::EngineError::Fatal(
            "strict schema validation failed against the dry-run sample".into(),
        )));
    }
    Ok(())
}

async fn run_job(job: &JobDefinition) -> Result<(), CliError> {
    let cancellation = CancellationToken::new();
    {
        let cancellation = cancellation.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancellation.cancel();
            }
        });
    }

    let start = std::time::Instant::now();
    let outcome = execute_job(job, &cancellation).await?;
    let elapsed_ms = start.elapsed().as_millis() as u64;

    let snapshot = outcome.metrics.snapshot();
    let summary = SummaryReport::from_snapshot(&snapshot, outcome.result.batches, elapsed_ms);
    eprintln!("{}", summary.render());

    if let Some(path) = &job.metrics_path {
        write_metrics_file(path, snapshot, Vec::new())?;
    }

    Ok(())
}
