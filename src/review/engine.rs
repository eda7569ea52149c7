use std::collections::BTreeSet;

use futures::stream::{self, StreamExt};
use regex::Regex;

use crate::error::{AppError, Result};
use crate::platform::Platform;
use crate::review::diff::FileChangeSet;
use crate::review::rules::RuleConfig;
use crate::review::{blob_link, FileReviewResult, Violation};
use crate::tools::{FormatMode, Formatter, StyleChecker, CHECKED_FILE_NAME, FIXED_FILE_NAME};

/// Split raw checker output into violations and everything else.
///
/// Only lines of the form `<checked_name>:<line>:<col>: <W|E><digits> <message>`
/// are violations. All other lines, including well-formed violations that
/// name a different file, are returned untouched as extra output.
pub fn parse_checker_output(lines: &[String], checked_name: &str) -> (Vec<Violation>, Vec<String>) {
    let pattern = format!(
        r"^{}:(\d+):(\d+):\s([WE]\d+)\s(.*)$",
        regex::escape(checked_name)
    );
    let Ok(re) = Regex::new(&pattern) else {
        return (Vec::new(), lines.to_vec());
    };

    let mut violations = Vec::new();
    let mut extra = Vec::new();
    for line in lines {
        let parsed = re.captures(line).and_then(|caps| {
            Some(Violation {
                line: caps[1].parse().ok()?,
                column: caps[2].parse().ok()?,
                code: caps[3].to_string(),
                message: caps[4].to_string(),
            })
        });
        match parsed {
            Some(violation) => violations.push(violation),
            None => extra.push(line.clone()),
        }
    }
    (violations, extra)
}

/// Keep only violations on lines the pull request added.
pub fn retain_added_lines(violations: Vec<Violation>, added: &BTreeSet<u32>) -> Vec<Violation> {
    violations
        .into_iter()
        .filter(|v| added.contains(&v.line))
        .collect()
}

/// A file that could not be reviewed. It is logged and left out of the
/// comment; the other files are unaffected.
#[derive(Debug)]
pub struct FileFailure {
    pub path: String,
    pub error: AppError,
}

#[derive(Debug, Default)]
pub struct CheckOutcome {
    /// Results in the order of the change set.
    pub results: Vec<FileReviewResult>,
    pub failures: Vec<FileFailure>,
}

/// Formatter output for one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormattedFile {
    pub path: String,
    /// A unified diff in [`FormatMode::Diff`], the corrected file otherwise.
    pub output: String,
    pub link: String,
}

#[derive(Debug, Default)]
pub struct FormatOutcome {
    pub files: Vec<FormattedFile>,
    pub failures: Vec<FileFailure>,
}

/// Runs the checker (or formatter) over every file of a change set.
pub struct StyleCheckEngine<'a> {
    platform: &'a dyn Platform,
    web_base: &'a str,
    max_concurrent: usize,
}

impl<'a> StyleCheckEngine<'a> {
    pub fn new(platform: &'a dyn Platform, web_base: &'a str, max_concurrent: usize) -> Self {
        Self {
            platform,
            web_base,
            max_concurrent: max_concurrent.max(1),
        }
    }

    /// Check every file at `sha`. Files are processed concurrently, up to
    /// the configured limit, but results keep the change-set order.
    pub async fn check(
        &self,
        checker: &dyn StyleChecker,
        repository: &str,
        sha: &str,
        files: &FileChangeSet,
        rules: &RuleConfig,
    ) -> CheckOutcome {
        let args = rules.checker_args();
        let args = args.as_slice();
        let diff_only = rules.scanner.diff_only;
        let jobs: Vec<(String, BTreeSet<u32>)> = files
            .iter()
            .map(|(path, added)| (path.to_string(), added.clone()))
            .collect();

        let outcomes: Vec<(String, Result<FileReviewResult>)> = stream::iter(jobs)
            .map(|(path, added)| async move {
                let result = self
                    .check_file(checker, repository, sha, &path, &added, args, diff_only)
                    .await;
                (path, result)
            })
            .buffered(self.max_concurrent)
            .collect()
            .await;

        let mut outcome = CheckOutcome::default();
        for (path, result) in outcomes {
            match result {
                Ok(result) => outcome.results.push(result),
                Err(error) => outcome.failures.push(skipped(repository, path, error)),
            }
        }
        outcome
    }

    #[allow(clippy::too_many_arguments)]
    async fn check_file(
        &self,
        checker: &dyn StyleChecker,
        repository: &str,
        sha: &str,
        path: &str,
        added: &BTreeSet<u32>,
        args: &[String],
        diff_only: bool,
    ) -> Result<FileReviewResult> {
        let content = self.platform.get_raw_file(repository, sha, path).await?;
        let output = checker.run(&content, args).await?;

        let (mut violations, extra) = parse_checker_output(&output, CHECKED_FILE_NAME);
        if diff_only {
            violations = retain_added_lines(violations, added);
        }

        Ok(FileReviewResult {
            path: path.to_string(),
            violations,
            extra,
            link: blob_link(self.web_base, repository, sha, path),
        })
    }

    /// Run the formatter over every file at `sha`. Only the ignore list is
    /// passed on and no diff-only filtering applies.
    pub async fn format(
        &self,
        formatter: &dyn Formatter,
        repository: &str,
        sha: &str,
        files: &FileChangeSet,
        rules: &RuleConfig,
        mode: FormatMode,
    ) -> FormatOutcome {
        let args = rules.formatter_args();
        let args = args.as_slice();
        let jobs: Vec<String> = files.paths().map(str::to_string).collect();

        let outcomes: Vec<(String, Result<FormattedFile>)> = stream::iter(jobs)
            .map(|path| async move {
                let result = self
                    .format_file(formatter, repository, sha, &path, args, mode)
                    .await;
                (path, result)
            })
            .buffered(self.max_concurrent)
            .collect()
            .await;

        let mut outcome = FormatOutcome::default();
        for (path, result) in outcomes {
            match result {
                Ok(file) => outcome.files.push(file),
                Err(error) => outcome.failures.push(skipped(repository, path, error)),
            }
        }
        outcome
    }

    async fn format_file(
        &self,
        formatter: &dyn Formatter,
        repository: &str,
        sha: &str,
        path: &str,
        args: &[String],
        mode: FormatMode,
    ) -> Result<FormattedFile> {
        let content = self.platform.get_raw_file(repository, sha, path).await?;
        let mut output = formatter.run(&content, args, mode).await?;
        if mode == FormatMode::Diff {
            output = output.replace(FIXED_FILE_NAME, path);
        }
        Ok(FormattedFile {
            path: path.to_string(),
            output,
            link: blob_link(self.web_base, repository, sha, path),
        })
    }
}

fn skipped(repository: &str, path: String, error: AppError) -> FileFailure {
    tracing::warn!(repo = %repository, path = %path, error = %error, "Skipping file");
    FileFailure { path, error }
}
