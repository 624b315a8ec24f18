//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the relay and admin handlers
//! - Wire up middleware (tracing, body limit)
//! - Bind server to listener
//! - Stop accepting and drain when shutdown is requested

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    response::Response,
    routing::post,
    Router,
};
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::Instrument;

use crate::admin::setup_admin_router;
use crate::config::ProxyConfig;
use crate::http::relay::{Relay, RelayError};
use crate::http::request::request_id;
use crate::lifecycle::Shutdown;
use crate::observability::PacketLogger;
use crate::security::limits::body_limit;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub relay: Arc<Relay>,
    pub shutdown: Shutdown,
}

/// Error type for server operations.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Relay(#[from] RelayError),

    #[error("server I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// HTTP server for the MCP relay.
pub struct HttpServer {
    router: Router,
    config: Arc<ProxyConfig>,
    shutdown: Shutdown,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(
        config: ProxyConfig,
        logger: PacketLogger,
        shutdown: Shutdown,
    ) -> Result<Self, ServerError> {
        let relay = Relay::new(&config.upstream, logger, shutdown.clone())?;

        let state = AppState {
            relay: Arc::new(relay),
            shutdown: shutdown.clone(),
        };

        let router = Self::build_router(&config, state);
        Ok(Self {
            router,
            config: Arc::new(config),
            shutdown,
        })
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// No request timeout layer: relayed streams may stay open indefinitely.
    fn build_router(config: &ProxyConfig, state: AppState) -> Router {
        Router::new()
            .route("/mcp", post(mcp_handler))
            .merge(setup_admin_router())
            .with_state(state)
            .layer(body_limit(config.security.max_body_size))
            .layer(TraceLayer::new_for_http())
    }

    /// A clone of the router, for serving it elsewhere or driving it in tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server, accepting connections on the given listener.
    ///
    /// Returns once shutdown has been requested and in-flight relays have
    /// finished.
    pub async fn run(self, listener: TcpListener) -> Result<(), ServerError> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            upstream = %self.config.upstream.url,
            "HTTP server starting"
        );

        let shutdown = self.shutdown.clone();
        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }
}

/// `POST /mcp`: relay one JSON-RPC request to the upstream.
async fn mcp_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let request_id = request_id(&headers);
    let span = tracing::info_span!("mcp", request_id = %request_id);

    state
        .relay
        .handle(&request_id, &headers, body)
        .instrument(span)
        .await
}
