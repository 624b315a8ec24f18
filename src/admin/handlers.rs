use axum::{extract::State, Json};
use serde::Serialize;

use crate::http::server::AppState;

/// Acknowledgment returned by `POST /shutdown`.
pub const SHUTDOWN_ACK: &str = "Proxy shutting down...";

#[derive(Debug, Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub upstream: String,
}

/// Trigger shutdown on a separate task so this response is sent first.
pub async fn request_shutdown(State(state): State<AppState>) -> &'static str {
    let shutdown = state.shutdown.clone();
    tokio::spawn(async move {
        shutdown.trigger("admin request");
    });
    SHUTDOWN_ACK
}

pub async fn get_status(State(state): State<AppState>) -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: if state.shutdown.is_triggered() {
            "shutting_down"
        } else {
            "operational"
        },
        upstream: state.relay.upstream_url().to_string(),
    })
}
