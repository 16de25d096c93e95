//! Shell lifecycle hooks (spec §4.1 algorithm, steps 1 and 7): `pre_exec`
//! is run through the platform shell before the reader opens and its
//! non-zero exit is fatal; the other three are best-effort — a failure is
//! logged and otherwise ignored, since by the time they run the pipeline
//! has already committed to succeeding, failing, or being cancelled.

use tokio::process::Command;

use crate::error::EngineError;

#[cfg(unix)]
fn shell_command(script: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(script);
    cmd
}

#[cfg(not(unix))]
fn shell_command(script: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.arg("/C").arg(script);
    cmd
}

/// Runs `script`, returning a fatal `EngineError` if it exits non-zero or
/// fails to spawn.
pub async fn run_fatal(script: &str) -> Result<(), EngineError> {
    let status = shell_command(script)
        .status()
        .await
        .map_err(|err| EngineError::Fatal(format!("hook `{script}` failed to spawn: {err}")))?;
    if status.success() {
        Ok(())
    } else {
        Err(EngineError::Fatal(format!("hook `{script}` exited with {status}")))
    }
}

/// Runs `script`, logging but swallowing any failure.
pub async fn run_best_effort(script: &str) {
    match shell_command(script).status().await {
        Ok(status) if status.success() => {}
        Ok(status) => tracing::warn!(script, %status, "lifecycle hook exited non-zero"),
        Err(err) => tracing::warn!(script, %err, "lifecycle hook failed to spawn"),
    }
}
