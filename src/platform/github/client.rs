use async_trait::async_trait;
use base64::Engine;
use octocrab::models::CommentId;
use octocrab::{Octocrab, Page};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;

use crate::config::GitHubConfig;
use crate::error::{AppError, Result};
use crate::platform::types::*;
use crate::platform::Platform;

use super::mapper;

/// GitHub implementation of [`Platform`], acting as the bot account.
///
/// API calls go through octocrab. Raw file content is fetched with plain
/// authenticated requests through reqwest.
pub struct GitHubPlatform {
    config: GitHubConfig,
    client: Octocrab,
    http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct GitRef {
    #[serde(rename = "ref")]
    ref_name: String,
    object: GitObject,
}

#[derive(Debug, Deserialize)]
struct GitObject {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct ContentEntry {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct CommitEntry {
    commit: CommitDetail,
}

#[derive(Debug, Deserialize)]
struct CommitDetail {
    message: String,
}

impl GitHubPlatform {
    pub fn new(config: &GitHubConfig) -> Result<Self> {
        let client = Octocrab::builder()
            .personal_token(config.token.clone())
            .base_uri(config.api_base.as_str())
            .map_err(|e| AppError::Config(format!("Invalid GitHub API base URL: {e}")))?
            .build()
            .map_err(|e| AppError::GitHubApi(format!("Failed to build octocrab client: {e}")))?;

        let http = reqwest::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            config: config.clone(),
            client,
            http,
        })
    }

    fn parse_repo(repo_full_name: &str) -> Result<(&str, &str)> {
        repo_full_name
            .split_once('/')
            .filter(|(owner, repo)| !owner.is_empty() && !repo.is_empty())
            .ok_or_else(|| AppError::GitHubApi(format!("Invalid repo name: {repo_full_name}")))
    }

    fn raw_url(&self, repo_full_name: &str, git_ref: &str, path: &str) -> String {
        format!(
            "{}/{repo_full_name}/{git_ref}/{}",
            self.config.raw_base.trim_end_matches('/'),
            encode_path(path)
        )
    }

    async fn get_authenticated(&self, url: &str) -> Result<reqwest::Response> {
        let response = self
            .http
            .get(url)
            .header("Authorization", format!("token {}", self.config.token))
            .send()
            .await?;
        Ok(response)
    }
}

/// Percent-encode each segment of a repository path, keeping the slashes.
fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Route of an API url relative to the API base, as octocrab expects it.
fn api_route(api_base: &str, url: &str) -> Result<String> {
    if let Some(route) = url.strip_prefix(api_base.trim_end_matches('/')) {
        return Ok(route.to_string());
    }
    let parsed = reqwest::Url::parse(url)
        .map_err(|e| AppError::GitHubApi(format!("Invalid API url {url}: {e}")))?;
    Ok(parsed.path().to_string())
}

/// GitHub answered with an error status (as opposed to a transport failure).
fn is_status_error(e: &octocrab::Error) -> bool {
    matches!(e, octocrab::Error::GitHub { .. })
}

#[async_trait]
impl Platform for GitHubPlatform {
    async fn get_pull_request_diff(&self, repo_full_name: &str, pr_number: u64) -> Result<String> {
        let (owner, repo) = Self::parse_repo(repo_full_name)?;
        let diff = self.client.pulls(owner, repo).get_diff(pr_number).await?;
        Ok(diff)
    }

    async fn get_pull_request(&self, repo_full_name: &str, pr_number: u64) -> Result<PullRequest> {
        let (owner, repo) = Self::parse_repo(repo_full_name)?;
        let pr = self.client.pulls(owner, repo).get(pr_number).await?;
        Ok(mapper::map_pull_request(pr))
    }

    async fn get_raw_file(
        &self,
        repo_full_name: &str,
        git_ref: &str,
        path: &str,
    ) -> Result<String> {
        let fetch_error = |reason: String| AppError::FileFetch {
            path: path.to_string(),
            reason,
        };

        let response = self
            .get_authenticated(&self.raw_url(repo_full_name, git_ref, path))
            .await
            .map_err(|e| fetch_error(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(fetch_error(format!("raw content host returned {status}")));
        }
        response.text().await.map_err(|e| fetch_error(e.to_string()))
    }

    async fn get_repo_config(
        &self,
        repo_full_name: &str,
        branch: &str,
        path: &str,
    ) -> Result<Option<String>> {
        let response = self
            .get_authenticated(&self.raw_url(repo_full_name, branch, path))
            .await
            .map_err(|e| AppError::ConfigFetch(e.to_string()))?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let text = response
                    .text()
                    .await
                    .map_err(|e| AppError::ConfigFetch(e.to_string()))?;
                Ok(Some(text))
            }
            status => Err(AppError::ConfigFetch(format!(
                "raw content host returned {status}"
            ))),
        }
    }

    async fn list_comments(&self, repo_full_name: &str, issue_number: u64) -> Result<Vec<Comment>> {
        let (owner, repo) = Self::parse_repo(repo_full_name)?;

        let first_page = self
            .client
            .issues(owner, repo)
            .list_comments(issue_number)
            .per_page(100)
            .send()
            .await
            .map_err(|e| AppError::CommentApi(format!("Failed to list comments: {e}")))?;

        let comments = self
            .client
            .all_pages(first_page)
            .await
            .map_err(|e| AppError::CommentApi(format!("Failed to list comments: {e}")))?;

        Ok(comments.into_iter().map(mapper::map_comment).collect())
    }

    async fn list_commit_messages(&self, commits_url: &str) -> Result<Vec<String>> {
        let route = api_route(&self.config.api_base, commits_url)?;
        let first_page: Page<CommitEntry> = self
            .client
            .get(route, Some(&[("per_page", "100")]))
            .await?;
        let commits = self.client.all_pages(first_page).await?;
        Ok(commits.into_iter().map(|c| c.commit.message).collect())
    }

    async fn create_comment(
        &self,
        repo_full_name: &str,
        issue_number: u64,
        body: &str,
    ) -> Result<Comment> {
        let (owner, repo) = Self::parse_repo(repo_full_name)?;

        let comment = self
            .client
            .issues(owner, repo)
            .create_comment(issue_number, body)
            .await
            .map_err(|e| AppError::CommentApi(format!("Failed to create comment: {e}")))?;

        Ok(mapper::map_comment(comment))
    }

    async fn update_comment(
        &self,
        repo_full_name: &str,
        comment_id: u64,
        body: &str,
    ) -> Result<Comment> {
        let (owner, repo) = Self::parse_repo(repo_full_name)?;

        let comment = self
            .client
            .issues(owner, repo)
            .update_comment(CommentId(comment_id), body)
            .await
            .map_err(|e| AppError::CommentApi(format!("Failed to update comment: {e}")))?;

        Ok(mapper::map_comment(comment))
    }

    async fn fork_repository(&self, repo_full_name: &str) -> Result<String> {
        let (owner, repo) = Self::parse_repo(repo_full_name)?;

        let fork = self.client.repos(owner, repo).create_fork().send().await?;

        fork.full_name
            .ok_or_else(|| AppError::GitHubApi("Fork response has no full_name".to_string()))
    }

    async fn repository_exists(&self, repo_full_name: &str) -> Result<bool> {
        let (owner, repo) = Self::parse_repo(repo_full_name)?;

        match self.client.repos(owner, repo).get().await {
            Ok(_) => Ok(true),
            Err(e) if is_status_error(&e) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn update_repository_description(
        &self,
        repo_full_name: &str,
        name: &str,
        description: &str,
    ) -> Result<()> {
        let route = format!("/repos/{repo_full_name}");
        let _: serde_json::Value = self
            .client
            .patch(route, Some(&json!({ "name": name, "description": description })))
            .await?;
        Ok(())
    }

    async fn list_branch_heads(&self, repo_full_name: &str) -> Result<Vec<BranchHead>> {
        let route = format!("/repos/{repo_full_name}/git/refs/heads");
        let refs: Vec<GitRef> = self.client.get(route, None::<&()>).await?;

        Ok(refs
            .into_iter()
            .map(|r| BranchHead {
                name: r
                    .ref_name
                    .strip_prefix("refs/heads/")
                    .unwrap_or(&r.ref_name)
                    .to_string(),
                sha: r.object.sha,
            })
            .collect())
    }

    async fn create_branch(&self, repo_full_name: &str, branch: &str, sha: &str) -> Result<()> {
        let route = format!("/repos/{repo_full_name}/git/refs");
        let _: serde_json::Value = self
            .client
            .post(
                route,
                Some(&json!({ "ref": format!("refs/heads/{branch}"), "sha": sha })),
            )
            .await?;
        Ok(())
    }

    async fn get_file_sha(
        &self,
        repo_full_name: &str,
        path: &str,
        branch: &str,
    ) -> Result<Option<String>> {
        let route = format!("/repos/{repo_full_name}/contents/{}", encode_path(path));
        let entry: std::result::Result<ContentEntry, _> =
            self.client.get(route, Some(&[("ref", branch)])).await;

        match entry {
            Ok(entry) => Ok(Some(entry.sha)),
            Err(e) if is_status_error(&e) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn put_file(&self, repo_full_name: &str, update: &FileUpdate) -> Result<()> {
        let route = format!(
            "/repos/{repo_full_name}/contents/{}",
            encode_path(&update.path)
        );
        let mut body = json!({
            "path": update.path,
            "message": update.message,
            "content": base64::engine::general_purpose::STANDARD.encode(update.content.as_bytes()),
            "branch": update.branch,
        });
        if let Some(sha) = &update.sha {
            body["sha"] = json!(sha);
        }

        let _: serde_json::Value = self.client.put(route, Some(&body)).await?;
        Ok(())
    }

    async fn create_pull_request(
        &self,
        repo_full_name: &str,
        pr: &CreatePullRequest,
    ) -> Result<PullRequest> {
        let (owner, repo) = Self::parse_repo(repo_full_name)?;

        let created = self
            .client
            .pulls(owner, repo)
            .create(&pr.title, &pr.head, &pr.base_branch)
            .body(&pr.body)
            .send()
            .await?;

        Ok(mapper::map_pull_request(created))
    }

    async fn list_own_repositories(&self) -> Result<Vec<OwnedRepo>> {
        let first_page: Page<OwnedRepo> = self
            .client
            .get("/user/repos", Some(&[("affiliation", "owner"), ("per_page", "100")]))
            .await?;
        let repos = self.client.all_pages(first_page).await?;
        Ok(repos)
    }

    async fn delete_repository(&self, repo_full_name: &str) -> Result<()> {
        let (owner, repo) = Self::parse_repo(repo_full_name)?;
        self.client.repos(owner, repo).delete().await?;
        Ok(())
    }

    async fn create_gist(&self, gist: &CreateGist) -> Result<String> {
        let files: serde_json::Map<String, serde_json::Value> = gist
            .files
            .iter()
            .map(|f| (f.name.clone(), json!({ "content": f.content })))
            .collect();
        let body = json!({
            "description": gist.description,
            "public": gist.public,
            "files": files,
        });

        let response: serde_json::Value = self.client.post("/gists", Some(&body)).await?;

        response["html_url"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| AppError::GitHubApi("No html_url in gist response".to_string()))
    }
}
