use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: u64,
    pub author: String,
    /// Numeric account id of the author.
    pub author_id: u64,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    pub title: String,
    pub body: String,
    pub author: String,
    pub head_branch: String,
    pub head_sha: String,
    /// Repository the head branch lives in; `None` when it was deleted.
    pub head_repo: Option<String>,
    pub base_branch: String,
    pub html_url: String,
}

#[derive(Debug, Clone)]
pub struct CreatePullRequest {
    pub title: String,
    pub body: String,
    /// `owner:branch` when the branch lives in a fork.
    pub head: String,
    pub base_branch: String,
}

/// Tip of a branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchHead {
    pub name: String,
    pub sha: String,
}

/// Contents-API write of one file onto a branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUpdate {
    pub path: String,
    pub message: String,
    /// Raw (not yet encoded) file content.
    pub content: String,
    /// Blob sha being replaced; `None` creates the file.
    pub sha: Option<String>,
    pub branch: String,
}

/// A repository owned by the bot account.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OwnedRepo {
    pub full_name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GistFile {
    pub name: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateGist {
    pub description: String,
    pub public: bool,
    pub files: Vec<GistFile>,
}
