pub mod autopep8;
pub mod pycodestyle;
#[cfg(test)]
pub mod testing;

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{AppError, Result};

/// Name the checker sees for the file under review. Its output lines are
/// prefixed with this name.
pub const CHECKED_FILE_NAME: &str = "file_to_check.py";

/// Name the formatter sees for the file being fixed. Diff headers it
/// produces carry this name.
pub const FIXED_FILE_NAME: &str = "file_to_fix.py";

/// External style checker.
#[async_trait]
pub trait StyleChecker: Send + Sync {
    /// Check `content` and return the raw output lines.
    async fn run(&self, content: &str, args: &[String]) -> Result<Vec<String>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatMode {
    /// Unified diff of the proposed fixes.
    Diff,
    /// The whole corrected file.
    Rewrite,
}

/// External auto-formatter.
#[async_trait]
pub trait Formatter: Send + Sync {
    async fn run(&self, content: &str, args: &[String], mode: FormatMode) -> Result<String>;
}

/// Output of a finished tool process.
pub(crate) struct ToolRun {
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

/// Write `content` to a scratch directory as `file_name` and run `program`
/// there with `args`. The file is removed when the run finishes.
pub(crate) async fn run_on_scratch_file(
    program: &str,
    args: &[String],
    file_name: &str,
    content: &str,
    timeout: Duration,
) -> Result<ToolRun> {
    let invocation_error = |reason: String| AppError::CheckerInvocation {
        tool: program.to_string(),
        reason,
    };

    let scratch = tempfile::tempdir()
        .map_err(|e| invocation_error(format!("failed to create scratch dir: {e}")))?;
    tokio::fs::write(scratch.path().join(file_name), content)
        .await
        .map_err(|e| invocation_error(format!("failed to write scratch file: {e}")))?;

    let mut command = tokio::process::Command::new(program);
    command
        .args(args)
        .current_dir(scratch.path())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let output = match tokio::time::timeout(timeout, command.output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => return Err(invocation_error(format!("failed to start: {e}"))),
        Err(_) => {
            return Err(invocation_error(format!(
                "timed out after {}s",
                timeout.as_secs()
            )))
        }
    };

    Ok(ToolRun {
        status: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}
