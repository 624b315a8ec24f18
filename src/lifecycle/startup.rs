//! Startup orchestration.
//!
//! Subsystems start in dependency order and any failure is fatal: config
//! first, then metrics, then the listener. Traffic is only accepted once
//! everything else is ready.

use std::net::SocketAddr;

use thiserror::Error;
use tokio::net::TcpListener;

use crate::config::{validate_config, ConfigError, ProxyConfig};
use crate::http::{HttpServer, ServerError};
use crate::lifecycle::{signals, Shutdown};
use crate::observability::{metrics, PacketLogger};

/// Error type for startup.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Server(#[from] ServerError),
}

/// Bind the configured listener.
pub async fn bind(config: &ProxyConfig) -> Result<TcpListener, StartupError> {
    TcpListener::bind(&config.listener.bind_address)
        .await
        .map_err(|source| StartupError::Bind {
            addr: config.listener.bind_address.clone(),
            source,
        })
}

/// Start the relay and serve until shutdown.
///
/// OS signals are wired to `shutdown`; `POST /shutdown` uses the same
/// handle, so either path stops the server exactly once.
pub async fn run(
    config: ProxyConfig,
    logger: PacketLogger,
    shutdown: Shutdown,
) -> Result<(), StartupError> {
    validate_config(&config).map_err(ConfigError::Validation)?;

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse::<SocketAddr>() {
            metrics::init_metrics(addr);
        }
    }

    let listener = bind(&config).await?;
    let local_addr = listener.local_addr().map_err(ServerError::from)?;

    tracing::info!(
        address = %local_addr,
        upstream = %config.upstream.url,
        "Configuration loaded"
    );
    println!("\nStarting MCP proxy on http://{local_addr}/mcp\n");

    let signal_task = signals::spawn_signal_listener(shutdown.clone());
    let server = HttpServer::new(config, logger, shutdown)?;
    let result = server.run(listener).await;

    signal_task.abort();
    result.map_err(StartupError::from)
}
