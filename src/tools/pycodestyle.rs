use std::time::Duration;

use async_trait::async_trait;

use crate::config::ToolsConfig;
use crate::error::{AppError, Result};
use crate::tools::{run_on_scratch_file, StyleChecker, CHECKED_FILE_NAME};

/// Runs the `pycodestyle` executable.
pub struct Pycodestyle {
    program: String,
    timeout: Duration,
}

impl Pycodestyle {
    pub fn new(config: &ToolsConfig) -> Self {
        Self {
            program: config.pycodestyle.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }
}

#[async_trait]
impl StyleChecker for Pycodestyle {
    async fn run(&self, content: &str, args: &[String]) -> Result<Vec<String>> {
        let mut full_args = args.to_vec();
        full_args.push(CHECKED_FILE_NAME.to_string());

        let run = run_on_scratch_file(
            &self.program,
            &full_args,
            CHECKED_FILE_NAME,
            content,
            self.timeout,
        )
        .await?;

        // Exit status 1 only means violations were found.
        match run.status {
            Some(0) | Some(1) => Ok(run.stdout.lines().map(str::to_string).collect()),
            status => Err(AppError::CheckerInvocation {
                tool: self.program.clone(),
                reason: format!("exited with {status:?}: {}", run.stderr.trim()),
            }),
        }
    }
}
