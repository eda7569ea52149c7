use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use pep8scout::config::AppConfig;
use pep8scout::server::{create_router, AppState};
use pep8scout::shutdown::{graceful_shutdown, wait_for_shutdown};

#[derive(Parser)]
#[command(name = "pep8scout", about = "PEP 8 review bot for GitHub pull requests")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if cli.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    let config = AppConfig::load(cli.config.as_deref())?;

    tracing::info!(
        host = %config.server.host,
        port = %config.server.port,
        bot = %config.github.bot_login,
        "Starting pep8scout server"
    );

    let state = Arc::new(AppState::new(config.clone())?);

    let queue_state = Arc::clone(&state);
    tokio::spawn(async move {
        pep8scout::queue::run_queue_processor(queue_state).await;
    });

    let app = create_router(Arc::clone(&state));

    let listener = tokio::net::TcpListener::bind(format!(
        "{}:{}",
        config.server.host, config.server.port
    ))
    .await?;

    tracing::info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(wait_for_shutdown())
        .await?;

    graceful_shutdown(&state).await;

    Ok(())
}
