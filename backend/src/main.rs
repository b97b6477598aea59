//! Main entry point for the Estateflow backend.
//!
//! Loads configuration, opens and migrates the database, makes sure the
//! bootstrap administrator exists and serves the API until Ctrl-C.

use anyhow::Context;
use estateflow::config::Config;
use estateflow::database::Database;
use estateflow::services::user_service::UserService;
use estateflow::state::AppState;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;
    let db = Database::new(&config).await?;
    db.migrate().await?;

    let port = config.server_port;
    let state = AppState::new(db.pool().clone(), config)?;

    if let Some(admin) = state.config.bootstrap_admin.clone() {
        UserService::new(&state)
            .ensure_bootstrap_admin(&admin)
            .await?;
    }

    let app = estateflow::build_app(state);

    let bind_address = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", bind_address))?;

    info!("Starting Estateflow server on port {}", port);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    db.close().await;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    info!("Shutdown signal received");
}
