// server/src/cli/handlers.rs

use anyhow::{Context, Result};
use tracing::{info, warn};

use lib::{open_storage, AppConfig, StorageEngine, StorageEngineType};
use rest_api::{start_server, AppState};

pub async fn handle_serve(mut config: AppConfig, port: Option<u16>, host: Option<String>) -> Result<()> {
    if let Some(port) = port {
        config.server.port = port;
    }
    if let Some(host) = host {
        config.server.host = host;
    }
    if config.storage.engine == StorageEngineType::Memory {
        warn!("Using the in-memory storage engine; data is lost on exit");
    }

    let storage = open_storage(&config)
        .await
        .context("Failed to open the storage engine")?;
    let state = AppState::new(config, storage)?;

    start_server(state, shutdown_signal()).await
}

pub async fn handle_migrate(config: AppConfig) -> Result<()> {
    if config.storage.engine != StorageEngineType::Postgres {
        warn!("The {} engine has no schema; nothing to migrate", config.storage.engine);
        return Ok(());
    }
    let storage = open_storage(&config)
        .await
        .context("Failed to connect to the database")?;
    storage.migrate().await.context("Failed to apply migrations")?;
    info!("Database schema is up to date");
    Ok(())
}

pub fn handle_config(config: &AppConfig) -> Result<()> {
    let rendered = serde_json::to_string_pretty(&config.redacted())
        .context("Failed to render the configuration")?;
    println!("{}", rendered);
    Ok(())
}

/// Resolves on Ctrl+C, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
