use anyhow::{Context, Result};
use github_api::{GitHubApiConfig, Settings};
use github_api_tools::api::{create_tools_router, ToolsAppState};
use github_api_tools::registry::get_all_tools;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "github_api_tools=info,github_api=info".into()),
        )
        .init();

    info!("GitHub API tools starting...");

    let config = Arc::new(GitHubApiConfig::from_env().context("Failed to load configuration")?);
    info!(
        settings_db = %config.storage.settings_db,
        tools_port = config.server.tools_port,
        "Configuration loaded"
    );

    // Shares the settings database with the settings service
    let settings = Settings::open(&config)?;
    info!(tools = get_all_tools().len(), "Settings store initialized");

    let router = create_tools_router(ToolsAppState {
        config: Arc::clone(&config),
        settings,
    });
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.server.tools_port))
        .await
        .context("Failed to bind tools port")?;
    info!(port = config.server.tools_port, "Tools page listening");

    let server_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router).await {
            tracing::error!(error = %e, "Tools server error");
        }
    });

    // Wait for shutdown signal
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl_c signal")?;
    info!("Shutdown signal received");

    server_handle.abort();
    info!("GitHub API tools stopped");

    Ok(())
}
