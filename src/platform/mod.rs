pub mod github;
pub mod types;

#[cfg(test)]
pub mod fake;

use async_trait::async_trait;

use crate::error::Result;
use types::*;

/// The hosting-service operations the bot needs, and nothing more.
#[async_trait]
pub trait Platform: Send + Sync {
    /// Unified diff of a pull request.
    async fn get_pull_request_diff(&self, repo_full_name: &str, pr_number: u64) -> Result<String>;

    /// Fetch a pull request.
    async fn get_pull_request(&self, repo_full_name: &str, pr_number: u64) -> Result<PullRequest>;

    /// Raw content of `path` at `git_ref`.
    async fn get_raw_file(&self, repo_full_name: &str, git_ref: &str, path: &str)
        -> Result<String>;

    /// Raw content of the repository's review config, `None` if it has none.
    async fn get_repo_config(
        &self,
        repo_full_name: &str,
        branch: &str,
        path: &str,
    ) -> Result<Option<String>>;

    /// All comments on an issue or PR, oldest first.
    async fn list_comments(&self, repo_full_name: &str, issue_number: u64) -> Result<Vec<Comment>>;

    /// Messages of every commit behind a PR's `commits_url`.
    async fn list_commit_messages(&self, commits_url: &str) -> Result<Vec<String>>;

    /// Post a comment on an issue or PR.
    async fn create_comment(
        &self,
        repo_full_name: &str,
        issue_number: u64,
        body: &str,
    ) -> Result<Comment>;

    /// Replace the body of an existing comment.
    async fn update_comment(
        &self,
        repo_full_name: &str,
        comment_id: u64,
        body: &str,
    ) -> Result<Comment>;

    /// Ask for a fork into the bot account. Returns the fork's full name;
    /// the fork itself is created asynchronously.
    async fn fork_repository(&self, repo_full_name: &str) -> Result<String>;

    async fn repository_exists(&self, repo_full_name: &str) -> Result<bool>;

    async fn update_repository_description(
        &self,
        repo_full_name: &str,
        name: &str,
        description: &str,
    ) -> Result<()>;

    async fn list_branch_heads(&self, repo_full_name: &str) -> Result<Vec<BranchHead>>;

    /// Create `refs/heads/<branch>` at `sha`.
    async fn create_branch(&self, repo_full_name: &str, branch: &str, sha: &str) -> Result<()>;

    /// Blob sha of `path` on `branch`, `None` if the file does not exist.
    async fn get_file_sha(
        &self,
        repo_full_name: &str,
        path: &str,
        branch: &str,
    ) -> Result<Option<String>>;

    async fn put_file(&self, repo_full_name: &str, update: &FileUpdate) -> Result<()>;

    /// Create a pull request.
    async fn create_pull_request(
        &self,
        repo_full_name: &str,
        pr: &CreatePullRequest,
    ) -> Result<PullRequest>;

    /// Repositories owned by the bot account.
    async fn list_own_repositories(&self) -> Result<Vec<OwnedRepo>>;

    async fn delete_repository(&self, repo_full_name: &str) -> Result<()>;

    /// Create a gist and return its browser URL.
    async fn create_gist(&self, gist: &CreateGist) -> Result<String>;
}
