//! Reconciles parsed CLI flags, an optional `--job` YAML file, and the
//! transformer directives pulled from raw argv into one frozen
//! `JobDefinition`. CLI flags always win over the YAML file field by field
//! (spec §8's round-trip law only requires that *resolved* configuration
//! round-trips, not that the file itself is authoritative once flags are
//! layered on top of it).

use model::execution::job::validate_query_safety;
use model::{Endpoint, JobDefinition, LifecycleHooks, RetryPolicyConfig, SamplingConfig, TimeoutConfig, TransformerConfig};

use crate::args::Args;
use crate::error::CliError;

/// Builds the final `JobDefinition` from `args` and whichever fields
/// `base` (loaded via `--job`, if any) supplies. Every CLI-specified value
/// overrides its YAML counterpart; unspecified CLI fields fall back to the
/// YAML value and then to a hardcoded default.
pub fn build(args: &Args, base: Option<JobDefinition>, transformers: Vec<TransformerConfig>) -> Result<JobDefinition, CliError> {
    let mut job = base.unwrap_or_else(default_job);

    if let Some(input) = &args.input {
        job.input = Endpoint::parse(input)?;
    }
    if let Some(output) = &args.output {
        job.output = Endpoint::parse(output)?;
    }
    if let Some(query) = &args.query {
        job.query = Some(query.clone());
    }
    if args.unsafe_query {
        job.unsafe_query = true;
    }
    if let Some(table) = &args.table {
        job.target_table = Some(table.clone());
    }
    if let Some(strategy) = args.strategy {
        job.strategy = strategy.into();
    }
    if let Some(insert_mode) = args.insert_mode {
        job.insert_mode = insert_mode.into();
    }
    if !args.key.is_empty() {
        job.key_columns = args.key.clone();
    }
    if let Some(batch_size) = args.batch_size {
        job.batch_size = batch_size;
    }
    if let Some(limit) = args.limit {
        job.limit = Some(limit);
    }
    if let Some(rate) = args.sampling_rate {
        let seed = args.sampling_seed.or(job.sampling.map(|s| s.seed)).unwrap_or(0);
        job.sampling = Some(SamplingConfig {
            rate_per_million: (rate.clamp(0.0, 1.0) * 1_000_000.0).round() as u32,
            seed,
        });
    } else if let Some(seed) = args.sampling_seed {
        if let Some(sampling) = &mut job.sampling {
            sampling.seed = seed;
        }
    }
    if let Some(max_retries) = args.max_retries {
        job.retry.max_retries = max_retries;
    }
    if let Some(retry_delay_ms) = args.retry_delay_ms {
        job.retry.retry_delay_ms = retry_delay_ms;
    }
    if let Some(ms) = args.connection_timeout_ms {
        job.timeouts.connection_timeout_ms = Some(ms);
    }
    if let Some(ms) = args.query_timeout_ms {
        job.timeouts.query_timeout_ms = Some(ms);
    }
    if let Some(cmd) = &args.pre_exec {
        job.hooks.pre_exec = Some(cmd.clone());
    }
    if let Some(cmd) = &args.post_exec {
        job.hooks.post_exec = Some(cmd.clone());
    }
    if let Some(cmd) = &args.on_error_exec {
        job.hooks.on_error_exec = Some(cmd.clone());
    }
    if let Some(cmd) = &args.finally_exec {
        job.hooks.finally_exec = Some(cmd.clone());
    }
    if args.strict_schema {
        job.strict_schema = true;
    }
    if args.auto_migrate {
        job.auto_migrate = true;
    }
    if let Some(path) = &args.metrics_path {
        job.metrics_path = Some(path.clone());
    }
    if let Some(count) = args.dry_run {
        job.dry_run_count = Some(count);
    }
    if !transformers.is_empty() {
        job.transformers = transformers;
    }

    if let Some(query) = &job.query {
        validate_query_safety(query, job.unsafe_query).map_err(|e| CliError::QuerySafety(e.to_string()))?;
    }

    Ok(job)
}

fn default_job() -> JobDefinition {
    JobDefinition {
        input: Endpoint {
            kind: model::EndpointKind::Generate,
            location: "0".into(),
        },
        output: Endpoint {
            kind: model::EndpointKind::Generate,
            location: "0".into(),
        },
        query: None,
        unsafe_query: false,
        timeouts: TimeoutConfig::default(),
        batch_size: 1000,
        limit: None,
        sampling: None,
        retry: RetryPolicyConfig::default(),
        strategy: model::WriteStrategy::Append,
        insert_mode: model::InsertMode::Standard,
        target_table: None,
        key_columns: Vec::new(),
        hooks: LifecycleHooks::default(),
        strict_schema: false,
        auto_migrate: false,
        metrics_path: None,
        dry_run_count: None,
        transformers: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn parse(tokens: &[&str]) -> Args {
        let mut full = vec!["dtpipe".to_string()];
        full.extend(tokens.iter().map(|t| t.to_string()));
        Args::parse_from(full)
    }

    #[test]
    fn cli_endpoints_override_defaults() {
        let args = parse(&["--input", "csv:in.csv", "--output", "csv:out.csv"]);
        let job = build(&args, None, Vec::new()).unwrap();
        assert_eq!(job.input.location, "in.csv");
        assert_eq!(job.output.location, "out.csv");
    }

    #[test]
    fn cli_flags_override_a_loaded_job() {
        let args = parse(&["--batch-size", "50"]);
        let mut base = default_job();
        base.batch_size = 500;
        let job = build(&args, Some(base), Vec::new()).unwrap();
        assert_eq!(job.batch_size, 50);
    }

    #[test]
    fn unsafe_query_allows_ddl() {
        let args = parse(&["--query", "DROP TABLE x", "--unsafe-query"]);
        assert!(build(&args, None, Vec::new()).is_ok());
    }

    #[test]
    fn unsanctioned_ddl_query_is_rejected() {
        let args = parse(&["--query", "DROP TABLE x"]);
        let err = build(&args, None, Vec::new()).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
