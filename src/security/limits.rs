//! Inbound request size limits.
//!
//! JSON-RPC control requests are small and are buffered whole before being
//! relayed, so the buffer needs an upper bound. Oversized bodies are
//! rejected with `413 Payload Too Large` before the relay sees them.

use axum::extract::DefaultBodyLimit;
use tower_http::limit::RequestBodyLimitLayer;

/// Layers enforcing `max_body_size` on inbound bodies.
///
/// Axum's own default limit is disabled so that the configured value is
/// the only one in effect.
pub fn body_limit(max_body_size: usize) -> (DefaultBodyLimit, RequestBodyLimitLayer) {
    (
        DefaultBodyLimit::disable(),
        RequestBodyLimitLayer::new(max_body_size),
    )
}
