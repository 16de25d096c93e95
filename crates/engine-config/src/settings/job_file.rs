use model::execution::job::JobDefinition;

use crate::error::{ConfigError, Result};

/// Loads a `JobDefinition` from a `--job <yaml>` file.
pub fn load_job_file(path: &str) -> Result<JobDefinition> {
    let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Read(path.to_string(), e))?;
    let job = serde_yaml::from_str(&raw)?;
    Ok(job)
}

/// Writes a `JobDefinition` to a `--export-job <yaml>` file, round-trippable
/// back through `load_job_file` (spec §8 round-trip law).
pub fn save_job_file(path: &str, job: &JobDefinition) -> Result<()> {
    let yaml = serde_yaml::to_string(job)?;
    std::fs::write(path, yaml).map_err(|e| ConfigError::Write(path.to_string(), e))
}
