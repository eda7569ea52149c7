use std::sync::Arc;

use tokio::signal;

use crate::server::AppState;

/// Wait for a shutdown signal (SIGINT or SIGTERM).
pub async fn wait_for_shutdown() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown...");
        }
    }
}

/// Report work that will not run. Queued tasks live in memory only; GitHub
/// sends a fresh event on the next push.
pub async fn graceful_shutdown(state: &Arc<AppState>) {
    tracing::info!("Starting graceful shutdown...");

    let pending = state.task_queue.read().await.len();
    if pending == 0 {
        tracing::info!("No queued tasks");
    } else {
        tracing::warn!(pending, "Dropping queued tasks");
    }

    tracing::info!("Graceful shutdown complete");
}
