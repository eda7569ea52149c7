//! Scripted stand-ins for the external tools.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{AppError, Result};
use crate::tools::{FormatMode, Formatter, StyleChecker};

/// Answers with canned output keyed by the file content it is handed.
#[derive(Default)]
pub struct ScriptedChecker {
    outputs: HashMap<String, String>,
    failing: Vec<String>,
    delays: HashMap<String, Duration>,
    finished: Mutex<Vec<String>>,
}

impl ScriptedChecker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn output(mut self, content: &str, output: &str) -> Self {
        self.outputs.insert(content.to_string(), output.to_string());
        self
    }

    pub fn failing_on(mut self, content: &str) -> Self {
        self.failing.push(content.to_string());
        self
    }

    pub fn delayed(mut self, content: &str, delay: Duration) -> Self {
        self.delays.insert(content.to_string(), delay);
        self
    }

    /// Contents in the order their runs completed.
    pub fn finish_order(&self) -> Vec<String> {
        self.finished.lock().unwrap().clone()
    }
}

#[async_trait]
impl StyleChecker for ScriptedChecker {
    async fn run(&self, content: &str, _args: &[String]) -> Result<Vec<String>> {
        if let Some(delay) = self.delays.get(content) {
            tokio::time::sleep(*delay).await;
        }
        self.finished.lock().unwrap().push(content.to_string());
        if self.failing.iter().any(|c| c == content) {
            return Err(AppError::CheckerInvocation {
                tool: "pycodestyle".to_string(),
                reason: "exit status 2".to_string(),
            });
        }
        Ok(self
            .outputs
            .get(content)
            .map(|out| out.lines().map(str::to_string).collect())
            .unwrap_or_default())
    }
}

/// Returns the same output for every file and records how it was called.
pub struct ScriptedFormatter {
    output: String,
    seen: Mutex<Vec<(Vec<String>, FormatMode)>>,
}

impl ScriptedFormatter {
    pub fn new(output: &str) -> Self {
        Self {
            output: output.to_string(),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn seen_args(&self) -> Vec<Vec<String>> {
        self.seen.lock().unwrap().iter().map(|(a, _)| a.clone()).collect()
    }

    pub fn seen_modes(&self) -> Vec<FormatMode> {
        self.seen.lock().unwrap().iter().map(|(_, m)| *m).collect()
    }
}

#[async_trait]
impl Formatter for ScriptedFormatter {
    async fn run(&self, _content: &str, args: &[String], mode: FormatMode) -> Result<String> {
        self.seen.lock().unwrap().push((args.to_vec(), mode));
        Ok(self.output.clone())
    }
}
