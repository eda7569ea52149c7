use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;

use crate::config::AppConfig;
use crate::platform::github::GitHubPlatform;
use crate::platform::Platform;
use crate::queue::TaskQueue;
use crate::storage::InstallationStore;
use crate::tools::autopep8::Autopep8;
use crate::tools::pycodestyle::Pycodestyle;
use crate::tools::{Formatter, StyleChecker};

pub struct AppState {
    pub config: AppConfig,
    pub platform: Arc<dyn Platform>,
    pub checker: Arc<dyn StyleChecker>,
    pub formatter: Arc<dyn Formatter>,
    pub installations: InstallationStore,
    pub task_queue: RwLock<TaskQueue>,
}

impl AppState {
    pub fn new(config: AppConfig) -> crate::error::Result<Self> {
        let platform = Arc::new(GitHubPlatform::new(&config.github)?);
        let checker = Arc::new(Pycodestyle::new(&config.tools));
        let formatter = Arc::new(Autopep8::new(&config.tools));
        Ok(Self::from_parts(config, platform, checker, formatter))
    }

    /// Assemble state around explicit collaborators.
    pub fn from_parts(
        config: AppConfig,
        platform: Arc<dyn Platform>,
        checker: Arc<dyn StyleChecker>,
        formatter: Arc<dyn Formatter>,
    ) -> Self {
        let installations = InstallationStore::new(&config.storage.installations_path);
        Self {
            config,
            platform,
            checker,
            formatter,
            installations,
            task_queue: RwLock::new(TaskQueue::new()),
        }
    }
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/webhooks/github", post(crate::webhook::handler::handle_webhook))
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "ok"
}
