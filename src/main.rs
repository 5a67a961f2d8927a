use anyhow::{Context, Result};
use github_api::api::{create_settings_router, SettingsAppState};
use github_api::config::GitHubApiConfig;
use github_api::oauth::{run_state_cleanup, Authorizer, StateManager};
use github_api::settings::Settings;
use std::sync::Arc;
use tracing::info;

const STATE_CLEANUP_INTERVAL_SECONDS: u64 = 60;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "github_api=info".into()),
        )
        .init();

    info!("GitHub API settings service starting...");

    let config = Arc::new(GitHubApiConfig::from_env().context("Failed to load configuration")?);
    info!(
        settings_db = %config.storage.settings_db,
        encrypted = config.storage.encryption_key.is_some(),
        redirect_uri = %config.oauth.redirect_uri,
        port = config.server.port,
        "Configuration loaded"
    );

    let settings = Settings::open(&config)?;
    info!("Settings store initialized");

    let state_manager = StateManager::new(config.oauth.state_expiry_seconds);
    let cleanup_handle = tokio::spawn(run_state_cleanup(
        state_manager.clone(),
        STATE_CLEANUP_INTERVAL_SECONDS,
    ));

    let authorizer = Authorizer::new(Arc::clone(&config), settings.clone(), state_manager);
    let router = create_settings_router(SettingsAppState {
        settings,
        authorizer,
    });

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.server.port))
        .await
        .context("Failed to bind settings port")?;
    info!(port = config.server.port, "Settings page listening");

    let server_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router).await {
            tracing::error!(error = %e, "Settings server error");
        }
    });

    // Wait for shutdown signal
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl_c signal")?;
    info!("Shutdown signal received");

    server_handle.abort();
    cleanup_handle.abort();
    info!("GitHub API settings service stopped");

    Ok(())
}
