//! Subprocess invocation with combined output capture.
//!
//! Exit status is the only success signal; captured output is diagnostic
//! text and substring matching for known failure modes.

use anyhow::{Context, Result};
use tokio::process::Command;

/// Result of a finished subprocess.
#[derive(Debug)]
pub(crate) struct CmdOutput {
    /// Whether the process exited with status zero.
    pub success: bool,
    /// Interleaved stdout + stderr, lossily decoded.
    pub text: String,
}

impl CmdOutput {
    /// Trimmed output for inclusion in error messages.
    pub fn trimmed(&self) -> &str {
        self.text.trim()
    }
}

/// Run a command to completion and capture its combined output.
///
/// Spawn failures (e.g. the binary is not installed) are errors; a
/// nonzero exit is a normal `CmdOutput` with `success == false`.
pub(crate) async fn run(program: &str, args: &[&str]) -> Result<CmdOutput> {
    tracing::debug!(program, ?args, "running command");
    let output = Command::new(program)
        .args(args)
        .output()
        .await
        .with_context(|| format!("failed to run {program}"))?;

    let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
    text.push_str(&String::from_utf8_lossy(&output.stderr));

    Ok(CmdOutput {
        success: output.status.success(),
        text,
    })
}

/// Run a pre-built command (for callers that need env vars or an
/// arch prefix) and capture its combined output.
pub(crate) async fn run_command(mut cmd: Command, what: &str) -> Result<CmdOutput> {
    let output = cmd
        .output()
        .await
        .with_context(|| format!("failed to run {what}"))?;

    let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
    text.push_str(&String::from_utf8_lossy(&output.stderr));

    Ok(CmdOutput {
        success: output.status.success(),
        text,
    })
}
