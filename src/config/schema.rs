//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the relay.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the MCP relay.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// The single upstream MCP server.
    pub upstream: UpstreamConfig,

    /// Packet log rendering.
    pub logging: LoggingConfig,

    /// Inbound request limits.
    pub security: SecurityConfig,

    /// Metrics settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:9000").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:9000".to_string(),
        }
    }
}

/// Upstream server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Full URL every `/mcp` request is posted to.
    pub url: String,

    /// Connection establishment timeout in seconds.
    ///
    /// Only the connect phase is bounded; response bodies may stream forever.
    pub connect_timeout_secs: u64,

    /// Route upstream traffic through `HTTP_PROXY`/`HTTPS_PROXY` when set.
    pub use_env_proxy: bool,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:8030/mcp".to_string(),
            connect_timeout_secs: 10,
            use_env_proxy: true,
        }
    }
}

/// Packet log configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Wrap packet log lines in ANSI colour sequences.
    pub color: bool,

    /// Pretty-print request bodies that parse as JSON.
    pub pretty_json: bool,

    /// Filter for operational logs (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            color: true,
            pretty_json: false,
            log_level: "info".to_string(),
        }
    }
}

/// Inbound request limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Maximum inbound body size in bytes.
    pub max_body_size: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_body_size: 2 * 1024 * 1024, // 2MB
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Enable the Prometheus scrape endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9464".to_string(),
        }
    }
}
