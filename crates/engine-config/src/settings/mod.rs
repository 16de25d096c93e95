//! The `--job`/`--export-job` YAML round trip (spec §6, §8 "`--export-job`
//! then `--job` is a behavioral identity"). `JobDefinition` is already
//! `Serialize`/`Deserialize`; this module is the thin, fallible I/O shim
//! around that — CLI-flag/YAML-field reconciliation (CLI taking
//! precedence) happens in `cli`, which owns the flag definitions.

mod job_file;

pub use job_file::{load_job_file, save_job_file};
