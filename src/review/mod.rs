//! Diff-scoped style review: the pipeline that turns a pull request into a
//! single summary comment.
//!
//! Stages are plain functions over explicit values. Each stage takes what it
//! needs by argument and returns its own record, so nothing is accumulated on
//! a shared request object:
//!
//! `rules::resolve` → `diff::FileChangeSet::parse` → `engine::StyleCheckEngine`
//! → `compose::compose` → `comment_state::publish`.

pub mod comment_state;
pub mod compose;
pub mod diff;
pub mod engine;
pub mod rules;

use serde::{Deserialize, Serialize};

/// Identity the bot comments under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotIdentity {
    /// Numeric account id. Comment ownership is decided on this alone.
    pub id: u64,
    pub login: String,
}

impl BotIdentity {
    pub fn mention(&self) -> String {
        format!("@{}", self.login)
    }

    /// Whether `text` mentions the bot (logins are case-insensitive).
    pub fn is_mentioned_in(&self, text: &str) -> bool {
        text.to_lowercase().contains(&self.mention().to_lowercase())
    }
}

/// Pull request action that triggered a review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrAction {
    Opened,
    Synchronize,
    Reopened,
    Other,
}

impl PrAction {
    pub fn parse(action: &str) -> Self {
        match action {
            "opened" => PrAction::Opened,
            "synchronize" => PrAction::Synchronize,
            "reopened" => PrAction::Reopened,
            _ => PrAction::Other,
        }
    }

    /// Actions that (re)trigger a review.
    pub fn is_reviewable(self) -> bool {
        !matches!(self, PrAction::Other)
    }
}

/// Identity of one pull-request review. Built once from the webhook payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewRequest {
    pub repository: String,
    pub pr_number: u64,
    pub head_sha: String,
    pub base_branch: String,
    pub action: PrAction,
    pub author: String,
    pub pr_title: String,
    pub pr_description: String,
    pub commits_url: String,
    pub diff_url: String,
}

/// One style violation reported by the checker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub line: u32,
    pub column: u32,
    pub code: String,
    pub message: String,
}

/// Checker results for one file of the pull request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileReviewResult {
    pub path: String,
    pub violations: Vec<Violation>,
    /// Output lines that are not violations (statistics, counts, source).
    pub extra: Vec<String>,
    /// Link to the file at the reviewed commit.
    pub link: String,
}

impl FileReviewResult {
    pub fn has_violations(&self) -> bool {
        !self.violations.is_empty()
    }
}

/// Browser link to `path` in `repository` at `git_ref`.
pub fn blob_link(web_base: &str, repository: &str, git_ref: &str, path: &str) -> String {
    format!(
        "{}/{repository}/blob/{git_ref}/{path}",
        web_base.trim_end_matches('/')
    )
}
