//! Header manipulation for cross-hop forwarding.
//!
//! # Responsibilities
//! - Strip hop-by-hop headers before a header map crosses the proxy
//! - Build the outbound header set sent to the upstream
//! - Build the response header set mirrored back to the client
//!
//! # Design Decisions
//! - Filtering copies; the source map is never touched
//! - Matching is ASCII case-insensitive on the header name

use axum::http::header::{
    HeaderMap, HeaderValue, ACCEPT, ACCEPT_ENCODING, CONTENT_LENGTH, CONTENT_TYPE, HOST,
};

/// Headers meaningful only to a single connection.
pub const HOP_BY_HOP_HEADERS: [&str; 8] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailers",
    "transfer-encoding",
    "upgrade",
];

/// `Accept` value forced on every upstream request.
pub const UPSTREAM_ACCEPT: &str = "application/json, text/event-stream";

/// `Content-Type` forced on every upstream request.
pub const UPSTREAM_CONTENT_TYPE: &str = "application/json";

/// Returns true if `name` is a hop-by-hop header.
pub fn is_hop_by_hop(name: &str) -> bool {
    HOP_BY_HOP_HEADERS
        .iter()
        .any(|hop| hop.eq_ignore_ascii_case(name))
}

/// Copy `headers`, leaving out every hop-by-hop entry.
///
/// Multi-valued headers keep all their values, in order.
pub fn strip_hop_by_hop(headers: &HeaderMap) -> HeaderMap {
    let mut filtered = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        if !is_hop_by_hop(name.as_str()) {
            filtered.append(name.clone(), value.clone());
        }
    }
    filtered
}

/// Headers for the request sent upstream.
///
/// Starts from the filtered inbound set, drops the entries the HTTP client
/// regenerates for its own connection, then forces the MCP content
/// negotiation headers.
pub fn upstream_request_headers(inbound: &HeaderMap) -> HeaderMap {
    let mut headers = strip_hop_by_hop(inbound);
    headers.remove(HOST);
    headers.remove(CONTENT_LENGTH);
    // Ask for identity encoding so the packet log sees plain text.
    headers.remove(ACCEPT_ENCODING);
    headers.insert(ACCEPT, HeaderValue::from_static(UPSTREAM_ACCEPT));
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(UPSTREAM_CONTENT_TYPE));
    headers
}

/// Headers for the streamed response sent back to the client.
///
/// `Content-Length` is dropped because the body is re-framed line by line;
/// a missing `Content-Type` defaults to `text/event-stream`.
pub fn client_response_headers(upstream: &HeaderMap) -> HeaderMap {
    let mut headers = strip_hop_by_hop(upstream);
    headers.remove(CONTENT_LENGTH);
    if !headers.contains_key(CONTENT_TYPE) {
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/event-stream"));
    }
    headers
}
