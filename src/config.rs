use serde::Deserialize;
use std::path::PathBuf;

use crate::error::{AppError, Result};

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    pub github: GitHubConfig,
    #[serde(default)]
    pub review: ReviewSettings,
    #[serde(default)]
    pub tools: ToolsConfig,
    #[serde(default)]
    pub autofix: AutoFixConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Deserialize, Clone)]
pub struct GitHubConfig {
    /// Personal access token of the bot account. Forks and gists are
    /// created under this account.
    pub token: String,
    pub webhook_secret: String,
    /// Numeric account id of the bot, used for comment ownership.
    pub bot_id: u64,
    #[serde(default = "default_bot_login")]
    pub bot_login: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_raw_base")]
    pub raw_base: String,
    #[serde(default = "default_web_base")]
    pub web_base: String,
}

// Manual Debug impl to avoid leaking the token and webhook secret
impl std::fmt::Debug for GitHubConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubConfig")
            .field("token", &"[REDACTED]")
            .field("webhook_secret", &"[REDACTED]")
            .field("bot_id", &self.bot_id)
            .field("bot_login", &self.bot_login)
            .field("api_base", &self.api_base)
            .field("raw_base", &self.raw_base)
            .field("web_base", &self.web_base)
            .finish()
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ReviewSettings {
    /// Repository-relative path of the per-repository YAML configuration.
    #[serde(default = "default_config_file")]
    pub config_file: String,
    #[serde(default = "default_max_concurrent_files")]
    pub max_concurrent_files: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ToolsConfig {
    #[serde(default = "default_pycodestyle")]
    pub pycodestyle: String,
    #[serde(default = "default_autopep8")]
    pub autopep8: String,
    #[serde(default = "default_tool_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AutoFixConfig {
    #[serde(default = "default_fork_poll_attempts")]
    pub fork_poll_attempts: u32,
    #[serde(default = "default_fork_poll_interval")]
    pub fork_poll_interval_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    #[serde(default = "default_installations_path")]
    pub installations_path: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for ReviewSettings {
    fn default() -> Self {
        Self {
            config_file: default_config_file(),
            max_concurrent_files: default_max_concurrent_files(),
        }
    }
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            pycodestyle: default_pycodestyle(),
            autopep8: default_autopep8(),
            timeout_secs: default_tool_timeout(),
        }
    }
}

impl Default for AutoFixConfig {
    fn default() -> Self {
        Self {
            fork_poll_attempts: default_fork_poll_attempts(),
            fork_poll_interval_secs: default_fork_poll_interval(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            installations_path: default_installations_path(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_bot_login() -> String {
    "pep8scout".to_string()
}

fn default_api_base() -> String {
    "https://api.github.com".to_string()
}

fn default_raw_base() -> String {
    "https://raw.githubusercontent.com".to_string()
}

fn default_web_base() -> String {
    "https://github.com".to_string()
}

fn default_config_file() -> String {
    ".pep8scout.yml".to_string()
}

fn default_max_concurrent_files() -> usize {
    4
}

fn default_pycodestyle() -> String {
    "pycodestyle".to_string()
}

fn default_autopep8() -> String {
    "autopep8".to_string()
}

fn default_tool_timeout() -> u64 {
    60
}

fn default_fork_poll_attempts() -> u32 {
    10
}

fn default_fork_poll_interval() -> u64 {
    5
}

fn default_installations_path() -> PathBuf {
    PathBuf::from("pep8scout-installations.json")
}

impl AppConfig {
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut builder = config::Config::builder();

        // Load from file if specified
        if let Some(path) = config_path {
            builder = builder.add_source(config::File::with_name(path));
        } else {
            builder = builder.add_source(config::File::with_name("pep8scout").required(false));
        }

        // Environment variable overrides with PEP8SCOUT_ prefix
        builder = builder.add_source(
            config::Environment::with_prefix("PEP8SCOUT")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder
            .build()
            .map_err(|e| AppError::Config(e.to_string()))?;

        config
            .try_deserialize()
            .map_err(|e| AppError::Config(e.to_string()))
    }

    pub fn webhook_secret(&self) -> &str {
        &self.github.webhook_secret
    }

    pub fn bot(&self) -> crate::review::BotIdentity {
        crate::review::BotIdentity {
            id: self.github.bot_id,
            login: self.github.bot_login.clone(),
        }
    }
}

/// Configuration for in-process tests: fake credentials, no fork poll delay.
#[cfg(test)]
pub fn test_config(installations_path: PathBuf) -> AppConfig {
    AppConfig {
        server: ServerConfig::default(),
        github: GitHubConfig {
            token: "test-token".to_string(),
            webhook_secret: "test-secret".to_string(),
            bot_id: crate::platform::fake::FAKE_BOT_ID,
            bot_login: default_bot_login(),
            api_base: default_api_base(),
            raw_base: default_raw_base(),
            web_base: default_web_base(),
        },
        review: ReviewSettings::default(),
        tools: ToolsConfig::default(),
        autofix: AutoFixConfig {
            fork_poll_attempts: 3,
            fork_poll_interval_secs: 0,
        },
        storage: StorageConfig { installations_path },
    }
}
