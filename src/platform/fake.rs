//! In-memory [`Platform`] used by the workflow tests. Every call is logged
//! so tests can assert on what was (and was not) attempted.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{AppError, Result};
use crate::platform::types::*;
use crate::platform::Platform;

/// Account id the fake posts its own comments under.
pub const FAKE_BOT_ID: u64 = 4242;

#[derive(Default)]
pub struct FakeState {
    pub diffs: HashMap<(String, u64), String>,
    pub pull_requests: HashMap<(String, u64), PullRequest>,
    /// (repo, ref, path) -> content
    pub files: HashMap<(String, String, String), String>,
    pub repo_configs: HashMap<(String, String), String>,
    pub comments: HashMap<(String, u64), Vec<Comment>>,
    pub commit_messages: HashMap<String, Vec<String>>,
    pub next_comment_id: u64,

    pub fork_name: Option<String>,
    /// Existence checks to answer `false` before the fork appears.
    /// `None` means the fork never appears.
    pub fork_ready_after: Option<u32>,
    pub existence_checks: u32,
    pub branch_heads: HashMap<String, Vec<BranchHead>>,
    pub fail_branch_creation: bool,
    pub fail_put_for: Vec<String>,
    pub fail_pull_request: bool,
    pub fail_description_update: bool,
    pub own_repos: Vec<OwnedRepo>,
    pub gist_url: String,

    pub created_branches: Vec<(String, String, String)>,
    pub puts: Vec<(String, FileUpdate)>,
    pub created_prs: Vec<(String, CreatePullRequest)>,
    pub deleted_repos: Vec<String>,
    pub gists: Vec<CreateGist>,
    pub calls: Vec<String>,
}

#[derive(Default)]
pub struct FakePlatform {
    pub state: Mutex<FakeState>,
}

impl FakePlatform {
    pub fn new() -> Self {
        let platform = Self::default();
        {
            let mut state = platform.state.lock().unwrap();
            state.next_comment_id = 1000;
            state.fork_ready_after = Some(0);
            state.gist_url = "https://gist.github.com/pep8scout/abc".to_string();
        }
        platform
    }

    pub fn with<F: FnOnce(&mut FakeState)>(self, f: F) -> Self {
        f(&mut self.state.lock().unwrap());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn comments(&self, repo: &str, number: u64) -> Vec<Comment> {
        self.state
            .lock()
            .unwrap()
            .comments
            .get(&(repo.to_string(), number))
            .cloned()
            .unwrap_or_default()
    }

    fn log(&self, call: String) {
        self.state.lock().unwrap().calls.push(call);
    }
}

fn not_found(what: String) -> AppError {
    AppError::GitHubApi(format!("404 Not Found: {what}"))
}

#[async_trait]
impl Platform for FakePlatform {
    async fn get_pull_request_diff(&self, repo: &str, pr_number: u64) -> Result<String> {
        self.log(format!("get_pull_request_diff {repo}#{pr_number}"));
        let state = self.state.lock().unwrap();
        state
            .diffs
            .get(&(repo.to_string(), pr_number))
            .cloned()
            .ok_or_else(|| not_found(format!("diff {repo}#{pr_number}")))
    }

    async fn get_pull_request(&self, repo: &str, pr_number: u64) -> Result<PullRequest> {
        self.log(format!("get_pull_request {repo}#{pr_number}"));
        let state = self.state.lock().unwrap();
        state
            .pull_requests
            .get(&(repo.to_string(), pr_number))
            .cloned()
            .ok_or_else(|| not_found(format!("pull request {repo}#{pr_number}")))
    }

    async fn get_raw_file(&self, repo: &str, git_ref: &str, path: &str) -> Result<String> {
        self.log(format!("get_raw_file {repo}@{git_ref}:{path}"));
        let state = self.state.lock().unwrap();
        state
            .files
            .get(&(repo.to_string(), git_ref.to_string(), path.to_string()))
            .cloned()
            .ok_or_else(|| AppError::FileFetch {
                path: path.to_string(),
                reason: "404".to_string(),
            })
    }

    async fn get_repo_config(
        &self,
        repo: &str,
        branch: &str,
        _path: &str,
    ) -> Result<Option<String>> {
        self.log(format!("get_repo_config {repo}@{branch}"));
        let state = self.state.lock().unwrap();
        Ok(state
            .repo_configs
            .get(&(repo.to_string(), branch.to_string()))
            .cloned())
    }

    async fn list_comments(&self, repo: &str, issue_number: u64) -> Result<Vec<Comment>> {
        self.log(format!("list_comments {repo}#{issue_number}"));
        Ok(self.comments(repo, issue_number))
    }

    async fn list_commit_messages(&self, commits_url: &str) -> Result<Vec<String>> {
        self.log(format!("list_commit_messages {commits_url}"));
        let state = self.state.lock().unwrap();
        Ok(state
            .commit_messages
            .get(commits_url)
            .cloned()
            .unwrap_or_default())
    }

    async fn create_comment(&self, repo: &str, issue_number: u64, body: &str) -> Result<Comment> {
        self.log(format!("create_comment {repo}#{issue_number}"));
        let mut state = self.state.lock().unwrap();
        state.next_comment_id += 1;
        let comment = Comment {
            id: state.next_comment_id,
            author: "pep8scout".to_string(),
            author_id: FAKE_BOT_ID,
            body: body.to_string(),
        };
        state
            .comments
            .entry((repo.to_string(), issue_number))
            .or_default()
            .push(comment.clone());
        Ok(comment)
    }

    async fn update_comment(&self, repo: &str, comment_id: u64, body: &str) -> Result<Comment> {
        self.log(format!("update_comment {repo} {comment_id}"));
        let mut state = self.state.lock().unwrap();
        for comments in state.comments.values_mut() {
            if let Some(comment) = comments.iter_mut().find(|c| c.id == comment_id) {
                comment.body = body.to_string();
                return Ok(comment.clone());
            }
        }
        Err(not_found(format!("comment {comment_id}")))
    }

    async fn fork_repository(&self, repo: &str) -> Result<String> {
        self.log(format!("fork_repository {repo}"));
        let state = self.state.lock().unwrap();
        state
            .fork_name
            .clone()
            .ok_or_else(|| AppError::GitHubApi("403 fork forbidden".to_string()))
    }

    async fn repository_exists(&self, repo: &str) -> Result<bool> {
        self.log(format!("repository_exists {repo}"));
        let mut state = self.state.lock().unwrap();
        let checks_before = state.existence_checks;
        state.existence_checks += 1;
        Ok(state
            .fork_ready_after
            .map_or(false, |after| checks_before >= after))
    }

    async fn update_repository_description(
        &self,
        repo: &str,
        _name: &str,
        description: &str,
    ) -> Result<()> {
        self.log(format!("update_repository_description {repo}: {description}"));
        if self.state.lock().unwrap().fail_description_update {
            return Err(AppError::GitHubApi("422 Unprocessable".to_string()));
        }
        Ok(())
    }

    async fn list_branch_heads(&self, repo: &str) -> Result<Vec<BranchHead>> {
        self.log(format!("list_branch_heads {repo}"));
        let state = self.state.lock().unwrap();
        Ok(state.branch_heads.get(repo).cloned().unwrap_or_default())
    }

    async fn create_branch(&self, repo: &str, branch: &str, sha: &str) -> Result<()> {
        self.log(format!("create_branch {repo} {branch}"));
        let mut state = self.state.lock().unwrap();
        if state.fail_branch_creation {
            return Err(AppError::GitHubApi("422 Reference already exists".to_string()));
        }
        state
            .created_branches
            .push((repo.to_string(), branch.to_string(), sha.to_string()));
        Ok(())
    }

    async fn get_file_sha(&self, repo: &str, path: &str, branch: &str) -> Result<Option<String>> {
        self.log(format!("get_file_sha {repo}@{branch}:{path}"));
        Ok(Some(format!("blob-{path}")))
    }

    async fn put_file(&self, repo: &str, update: &FileUpdate) -> Result<()> {
        self.log(format!("put_file {repo}:{}", update.path));
        let mut state = self.state.lock().unwrap();
        if state.fail_put_for.contains(&update.path) {
            return Err(AppError::GitHubApi("409 Conflict".to_string()));
        }
        state.puts.push((repo.to_string(), update.clone()));
        Ok(())
    }

    async fn create_pull_request(&self, repo: &str, pr: &CreatePullRequest) -> Result<PullRequest> {
        self.log(format!("create_pull_request {repo}"));
        let mut state = self.state.lock().unwrap();
        if state.fail_pull_request {
            return Err(AppError::GitHubApi("422 No commits between".to_string()));
        }
        state.created_prs.push((repo.to_string(), pr.clone()));
        Ok(PullRequest {
            number: 77,
            title: pr.title.clone(),
            body: pr.body.clone(),
            author: "bot".to_string(),
            head_branch: pr.head.clone(),
            head_sha: "f00".to_string(),
            head_repo: None,
            base_branch: pr.base_branch.clone(),
            html_url: format!("https://github.com/{repo}/pull/77"),
        })
    }

    async fn list_own_repositories(&self) -> Result<Vec<OwnedRepo>> {
        self.log("list_own_repositories".to_string());
        Ok(self.state.lock().unwrap().own_repos.clone())
    }

    async fn delete_repository(&self, repo: &str) -> Result<()> {
        self.log(format!("delete_repository {repo}"));
        let mut state = self.state.lock().unwrap();
        state.deleted_repos.push(repo.to_string());
        state.own_repos.retain(|r| r.full_name != repo);
        Ok(())
    }

    async fn create_gist(&self, gist: &CreateGist) -> Result<String> {
        self.log("create_gist".to_string());
        let mut state = self.state.lock().unwrap();
        state.gists.push(gist.clone());
        Ok(state.gist_url.clone())
    }
}
