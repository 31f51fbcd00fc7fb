//! Horizon HTTP server binary
//!
//! # Environment Variables
//!
//! - `HORIZON_HOST` / `HORIZON_PORT`: listen address (default `127.0.0.1:3001`)
//! - `HORIZON_DB_PATH`: `memory` or a database path (default `~/.horizon/database/horizon.db`)
//! - `HORIZON_SYNC_MISSING_NODES`: `retain` or `deactivate`
//! - `RUST_LOG`: logging level (default `info`)

use std::sync::Arc;

use horizon_core::db::GraphStore;
use horizon_core::{GraphService, SurrealStore};
use horizon_server::{create_router, AppState, ServerConfig, StoreLocation};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::from_env()?;

    let store: Arc<dyn GraphStore> = match &config.store {
        StoreLocation::Memory => {
            tracing::warn!("Using in-memory database; data is discarded on exit");
            Arc::new(SurrealStore::new_in_memory().await?)
        }
        StoreLocation::Disk(path) => {
            tracing::info!("Database: {}", path.display());
            Arc::new(SurrealStore::new(path.clone()).await?)
        }
    };

    let service = GraphService::with_config(store, config.graph.clone())?;
    tracing::info!(
        "Missing-node policy for sync: {}",
        config.graph.missing_node_policy
    );

    let app = create_router(AppState::new(service));

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Horizon server listening on http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
