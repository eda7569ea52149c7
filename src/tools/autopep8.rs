use std::time::Duration;

use async_trait::async_trait;

use crate::config::ToolsConfig;
use crate::error::{AppError, Result};
use crate::tools::{run_on_scratch_file, FormatMode, Formatter, FIXED_FILE_NAME};

/// Runs the `autopep8` executable without `--in-place`, so the result is
/// always read from stdout.
pub struct Autopep8 {
    program: String,
    timeout: Duration,
}

impl Autopep8 {
    pub fn new(config: &ToolsConfig) -> Self {
        Self {
            program: config.autopep8.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }
}

fn build_args(args: &[String], mode: FormatMode) -> Vec<String> {
    let mut full_args = vec![FIXED_FILE_NAME.to_string()];
    if mode == FormatMode::Diff {
        full_args.push("--diff".to_string());
    }
    full_args.extend(args.iter().cloned());
    full_args
}

#[async_trait]
impl Formatter for Autopep8 {
    async fn run(&self, content: &str, args: &[String], mode: FormatMode) -> Result<String> {
        let run = run_on_scratch_file(
            &self.program,
            &build_args(args, mode),
            FIXED_FILE_NAME,
            content,
            self.timeout,
        )
        .await?;

        if run.status != Some(0) {
            return Err(AppError::CheckerInvocation {
                tool: self.program.clone(),
                reason: format!("exited with {:?}: {}", run.status, run.stderr.trim()),
            });
        }
        Ok(run.stdout)
    }
}
