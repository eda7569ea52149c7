use crate::error::{AppError, Result};
use crate::platform::types::{CreatePullRequest, FileUpdate};
use crate::platform::Platform;

use super::{fork_description, FixError, FixTarget, ForkPollPolicy, JobState, PatchedFile};

const PR_TITLE: &str = "Fix pep8 errors";
const PR_BODY: &str = "The changes are suggested by autopep8";

/// One run of the fork-and-pull-request flow.
#[derive(Debug, Clone)]
pub struct AutoFixJob {
    pub target: FixTarget,
    pub state: JobState,
    pub fork: Option<String>,
    pub branch: Option<String>,
    /// Files that could not be committed. They do not stop the job.
    pub patch_failures: Vec<FixError>,
    /// Non-fatal problems worth reporting.
    pub warnings: Vec<String>,
}

impl AutoFixJob {
    pub fn new(target: FixTarget) -> Self {
        Self {
            target,
            state: JobState::Idle,
            fork: None,
            branch: None,
            patch_failures: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Drive the job until it reaches a terminal state.
    pub async fn run(
        mut self,
        platform: &dyn Platform,
        bot_login: &str,
        files: &[PatchedFile],
        policy: ForkPollPolicy,
    ) -> Self {
        while !self.state.is_terminal() {
            let next = match self.state {
                JobState::Idle => self.fork(platform, policy).await,
                JobState::Forked => self.create_branch(platform).await,
                JobState::BranchCreated => self.patch(platform, files).await,
                JobState::FilesPatched => self.open_pull_request(platform, bot_login).await,
                JobState::PrCreated { .. } | JobState::Failed(_) => break,
            };
            self.state = match next {
                Ok(state) => state,
                Err(error) => {
                    tracing::warn!(
                        repo = %self.target.repository,
                        stage = error.stage(),
                        error = %error,
                        "Auto-fix failed"
                    );
                    JobState::Failed(error)
                }
            };
            tracing::debug!(repo = %self.target.repository, state = ?self.state, "Auto-fix advanced");
        }
        self
    }

    async fn fork(
        &mut self,
        platform: &dyn Platform,
        policy: ForkPollPolicy,
    ) -> std::result::Result<JobState, FixError> {
        let repository = &self.target.repository;
        let fork = platform
            .fork_repository(repository)
            .await
            .map_err(|e| FixError::ForkRejected {
                repository: repository.clone(),
                reason: e.to_string(),
            })?;

        // Forking is asynchronous on the hosting side.
        let mut appeared = false;
        for attempt in 0..policy.attempts {
            if attempt > 0 {
                tokio::time::sleep(policy.interval).await;
            }
            match platform.repository_exists(&fork).await {
                Ok(true) => {
                    appeared = true;
                    break;
                }
                Ok(false) => {}
                Err(e) => {
                    tracing::debug!(fork = %fork, attempt, error = %e, "Fork existence check failed");
                }
            }
        }
        if !appeared {
            return Err(FixError::ForkTimeout {
                fork,
                attempts: policy.attempts,
            });
        }

        let name = fork.split_once('/').map_or(fork.as_str(), |(_, name)| name);
        if let Err(e) = platform
            .update_repository_description(&fork, name, &self.target.fork_description())
            .await
        {
            self.warnings
                .push(format!("Could not update description of the fork: {e}"));
        }

        tracing::info!(repo = %repository, fork = %fork, "Fork ready");
        self.fork = Some(fork);
        Ok(JobState::Forked)
    }

    async fn create_branch(
        &mut self,
        platform: &dyn Platform,
    ) -> std::result::Result<JobState, FixError> {
        let fork = self.fork.clone().unwrap_or_default();
        let branch = self.target.patch_branch();
        let failed = |reason: String| FixError::BranchCreation {
            fork: fork.clone(),
            branch: branch.clone(),
            reason,
        };

        let heads = platform
            .list_branch_heads(&fork)
            .await
            .map_err(|e| failed(e.to_string()))?;
        let sha = heads
            .into_iter()
            .find(|head| head.name == self.target.branch)
            .map(|head| head.sha)
            .ok_or_else(|| failed(format!("branch {} not found", self.target.branch)))?;

        platform
            .create_branch(&fork, &branch, &sha)
            .await
            .map_err(|e| failed(e.to_string()))?;

        self.branch = Some(branch);
        Ok(JobState::BranchCreated)
    }

    async fn patch(
        &mut self,
        platform: &dyn Platform,
        files: &[PatchedFile],
    ) -> std::result::Result<JobState, FixError> {
        let fork = self.fork.clone().unwrap_or_default();
        let branch = self.branch.clone().unwrap_or_default();

        for file in files {
            if let Err(e) = commit_file(platform, &fork, &branch, file).await {
                tracing::warn!(fork = %fork, path = %file.path, error = %e, "Could not commit fix");
                self.patch_failures.push(FixError::Patch {
                    path: file.path.clone(),
                    reason: e.to_string(),
                });
            }
        }
        Ok(JobState::FilesPatched)
    }

    async fn open_pull_request(
        &mut self,
        platform: &dyn Platform,
        bot_login: &str,
    ) -> std::result::Result<JobState, FixError> {
        let branch = self.branch.clone().unwrap_or_default();
        let request = CreatePullRequest {
            title: PR_TITLE.to_string(),
            body: PR_BODY.to_string(),
            head: format!("{bot_login}:{branch}"),
            base_branch: self.target.branch.clone(),
        };

        let pr = platform
            .create_pull_request(&self.target.repository, &request)
            .await
            .map_err(|e| FixError::PullRequest {
                reason: e.to_string(),
            })?;

        tracing::info!(repo = %self.target.repository, pr = pr.number, "Opened fix pull request");
        Ok(JobState::PrCreated { url: pr.html_url })
    }
}

async fn commit_file(
    platform: &dyn Platform,
    fork: &str,
    branch: &str,
    file: &PatchedFile,
) -> Result<()> {
    let sha = platform.get_file_sha(fork, &file.path, branch).await?;
    platform
        .put_file(
            fork,
            &FileUpdate {
                path: file.path.clone(),
                message: format!("Fix pep8 errors in {}", file.path),
                content: file.content.clone(),
                sha,
                branch: branch.to_string(),
            },
        )
        .await
}

/// Delete any fork the bot still holds for `repository`, found by its
/// description. Returns the deleted repositories.
pub async fn cleanup_previous_fork(platform: &dyn Platform, repository: &str) -> Result<Vec<String>> {
    let owned = platform.list_own_repositories().await?;
    let expected = fork_description(repository);
    let mut deleted = Vec::new();
    for repo in owned {
        let references_target = repo
            .description
            .as_deref()
            .map_or(false, |d| d.trim() == expected);
        if !references_target {
            continue;
        }
        platform.delete_repository(&repo.full_name).await.map_err(|e| {
            AppError::GitHubApi(format!("Failed to delete fork {}: {e}", repo.full_name))
        })?;
        tracing::info!(fork = %repo.full_name, "Deleted previous fork");
        deleted.push(repo.full_name);
    }
    Ok(deleted)
}
