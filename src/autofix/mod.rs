//! Fork-and-pull-request flow that commits formatter fixes back to a
//! pull request's head branch.
//!
//! The job moves `Idle → Forked → BranchCreated → FilesPatched → PrCreated`
//! and can fail at any step. Nothing is rolled back on failure; the
//! leftover fork is removed by [`cleanup_previous_fork`] before the next job.

mod job;

pub use job::{cleanup_previous_fork, AutoFixJob};

use std::time::Duration;

use thiserror::Error;

use crate::config::AutoFixConfig;

/// Repository and branch the fixes are proposed against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixTarget {
    pub repository: String,
    pub branch: String,
}

impl FixTarget {
    /// Branch the fixes are committed to in the fork.
    pub fn patch_branch(&self) -> String {
        format!("{}-pep8-patch", self.branch)
    }

    /// Description set on the fork so cleanup can find it again.
    pub fn fork_description(&self) -> String {
        fork_description(&self.repository)
    }
}

pub(crate) fn fork_description(repository: &str) -> String {
    let owner = repository
        .split_once('/')
        .map_or(repository, |(owner, _)| owner);
    format!("Forked from @{owner}'s {repository}")
}

/// Corrected content for one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchedFile {
    pub path: String,
    pub content: String,
}

/// How long to wait for a fork to appear.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForkPollPolicy {
    pub attempts: u32,
    pub interval: Duration,
}

impl From<&AutoFixConfig> for ForkPollPolicy {
    fn from(config: &AutoFixConfig) -> Self {
        Self {
            attempts: config.fork_poll_attempts,
            interval: Duration::from_secs(config.fork_poll_interval_secs),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FixError {
    #[error("could not fork {repository}: {reason}")]
    ForkRejected { repository: String, reason: String },

    #[error("fork {fork} did not appear after {attempts} checks")]
    ForkTimeout { fork: String, attempts: u32 },

    #[error("could not create branch {branch} in {fork}: {reason}")]
    BranchCreation {
        fork: String,
        branch: String,
        reason: String,
    },

    #[error("could not commit {path}: {reason}")]
    Patch { path: String, reason: String },

    #[error("pull request could not be created: {reason}")]
    PullRequest { reason: String },
}

impl FixError {
    /// Stage of the flow the error belongs to.
    pub fn stage(&self) -> &'static str {
        match self {
            FixError::ForkRejected { .. } | FixError::ForkTimeout { .. } => "forking",
            FixError::BranchCreation { .. } => "branch_creation",
            FixError::Patch { .. } => "patching",
            FixError::PullRequest { .. } => "pr_creation",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobState {
    Idle,
    Forked,
    BranchCreated,
    FilesPatched,
    PrCreated { url: String },
    Failed(FixError),
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::PrCreated { .. } | JobState::Failed(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_names() {
        let target = FixTarget {
            repository: "alice/widgets".to_string(),
            branch: "feature".to_string(),
        };
        assert_eq!(target.patch_branch(), "feature-pep8-patch");
        assert_eq!(
            target.fork_description(),
            "Forked from @alice's alice/widgets"
        );
    }

    #[test]
    fn test_error_stages() {
        let timeout = FixError::ForkTimeout {
            fork: "bot/widgets".to_string(),
            attempts: 10,
        };
        assert_eq!(timeout.stage(), "forking");
        assert_eq!(
            FixError::PullRequest {
                reason: "422".to_string()
            }
            .stage(),
            "pr_creation"
        );
    }

    #[test]
    fn test_poll_policy_from_config() {
        let policy = ForkPollPolicy::from(&AutoFixConfig::default());
        assert_eq!(policy.attempts, 10);
        assert_eq!(policy.interval, Duration::from_secs(5));
    }
}
