mod config;

use std::sync::Arc;

use tracing::{info, warn};

use nop_api::{AppStateInner, create_router};
use nop_db::{DatabaseConfig, SessionManager};

use crate::config::{Config, Environment};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "nop=debug,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env()?;
    if config.environment == Environment::Development {
        warn!("Running in development mode");
    }

    // Init database
    let sessions = SessionManager::initialize(
        DatabaseConfig::new(&config.database_url).with_pool_size(config.pool_size),
    )?;
    let migrator = sessions.clone();
    tokio::task::spawn_blocking(move || migrator.migrate()).await??;

    let state = Arc::new(AppStateInner {
        sessions,
        jwt_secret: config.jwt_secret,
    });
    let app = create_router(state);

    info!("nop server listening on {}", config.addr);

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Received Ctrl+C, shutting down...");
}
