use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to fetch repository configuration: {0}")]
    ConfigFetch(String),

    #[error("Webhook verification failed: {0}")]
    WebhookVerification(String),

    #[error("GitHub API error: {0}")]
    GitHubApi(String),

    #[error("Failed to parse diff: {0}")]
    DiffParse(String),

    #[error("Failed to fetch {path}: {reason}")]
    FileFetch { path: String, reason: String },

    #[error("Failed to run {tool}: {reason}")]
    CheckerInvocation { tool: String, reason: String },

    #[error("Comment API error: {0}")]
    CommentApi(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<octocrab::Error> for AppError {
    fn from(e: octocrab::Error) -> Self {
        AppError::GitHubApi(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
