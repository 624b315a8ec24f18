//! Request identification.
//!
//! Each relayed request carries an ID through the operational logs. A
//! client-supplied `x-request-id` is reused; otherwise a UUID v4 is minted.

use axum::http::HeaderMap;
use uuid::Uuid;

/// Header carrying the request ID.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Request ID for an inbound request.
pub fn request_id(headers: &HeaderMap) -> String {
    headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}
