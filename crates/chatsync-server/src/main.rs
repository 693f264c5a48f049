//! # chatsync-server
//!
//! Real-time chat server.
//!
//! This binary provides:
//! - **REST API** (axum) for signup, contacts, groups, conversation lists,
//!   message history and sending
//! - **WebSocket push channel** that delivers new messages, new
//!   conversations, contact additions and presence changes
//! - **Connection registry** mapping each online user to their live socket

mod api;
mod auth;
mod config;
mod contacts;
mod emitter;
mod error;
mod fanout;
mod presence;
mod registry;
mod store;
mod ws;

#[cfg(test)]
mod testing;

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use chatsync_store::Database;

use crate::api::AppState;
use crate::config::ServerConfig;
use crate::store::SqliteStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Initialize tracing (respects RUST_LOG env var)
    // -----------------------------------------------------------------------
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,chatsync_server=debug")),
        )
        .init();

    info!("Starting chatsync server v{}", env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // 2. Load configuration
    // -----------------------------------------------------------------------
    let config = ServerConfig::from_env();
    info!(?config, "Loaded configuration");

    // -----------------------------------------------------------------------
    // 3. Open the durable store and wire the services
    // -----------------------------------------------------------------------
    let db = match &config.database_path {
        Some(path) => Database::open_at(path)?,
        None => Database::new()?,
    };
    info!(path = ?db.path(), "Database opened");

    let http_addr = config.http_addr;
    let state = AppState::new(Arc::new(SqliteStore::new(db)), config);
    let registry = state.registry.clone();

    // -----------------------------------------------------------------------
    // 4. Run the HTTP server until it fails or Ctrl+C arrives
    // -----------------------------------------------------------------------
    tokio::select! {
        result = api::serve(state, http_addr) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "HTTP server failed");
                registry.shutdown();
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    registry.shutdown();
    Ok(())
}
