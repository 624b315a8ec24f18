//! Metrics collection and exposition.
//!
//! # Metrics
//! - `mcp_relay_requests_total` (counter): relayed requests by outcome
//! - `mcp_relay_chunks_total` (counter): upstream chunks forwarded
//! - `mcp_relay_upstream_errors_total` (counter): failures by kind
//! - `mcp_relay_request_duration_seconds` (histogram): time to end of stream
//!
//! All recording goes through the `metrics` facade and is a no-op until a
//! recorder is installed with [`init_metrics`].

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter with a scrape endpoint on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => {
            describe();
            tracing::info!(address = %addr, "Metrics exporter listening");
        }
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

fn describe() {
    metrics::describe_counter!("mcp_relay_requests_total", "Relayed requests by outcome");
    metrics::describe_counter!("mcp_relay_chunks_total", "Upstream chunks forwarded to clients");
    metrics::describe_counter!("mcp_relay_upstream_errors_total", "Upstream failures by kind");
    metrics::describe_histogram!(
        "mcp_relay_request_duration_seconds",
        "Time from request receipt to end of the relayed stream"
    );
}

/// Record a finished relay.
pub fn record_request(outcome: &'static str, start: Instant) {
    metrics::counter!("mcp_relay_requests_total", "outcome" => outcome).increment(1);
    metrics::histogram!("mcp_relay_request_duration_seconds").record(start.elapsed().as_secs_f64());
}

/// Record one forwarded chunk.
pub fn record_chunk() {
    metrics::counter!("mcp_relay_chunks_total").increment(1);
}

/// Record an upstream failure.
pub fn record_upstream_error(kind: &'static str) {
    metrics::counter!("mcp_relay_upstream_errors_total", "kind" => kind).increment(1);
}
