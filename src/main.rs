//! Sighting map server

use std::sync::Arc;

use sighting_map::{config::AppConfig, database::Database, errors::MapError, server::Server};
use tokio::signal;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), MapError> {
    #[cfg(feature = "dotenvy")]
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Configuration file first, environment variables on top
    let config = AppConfig::load()?;
    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        return Err(e);
    }

    let database = Database::connect(&config.database).await?;
    let server = Server::new(&config, Arc::new(database));

    server.run(shutdown_signal()).await?;
    Ok(())
}

/// Resolves on Ctrl+C, or SIGTERM on unix
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
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
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received shutdown signal");
        }
        _ = terminate => {
            info!("Received terminate signal");
        }
    }
}
