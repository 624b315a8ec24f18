//! Configuration validation.
//!
//! Serde handles the syntactic checks; this module checks values that parse
//! but cannot work (bad socket addresses, non-HTTP upstreams). All problems
//! are reported at once, not just the first.

use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::ProxyConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.bind_address `{0}` is not a socket address")]
    InvalidBindAddress(String),

    #[error("upstream.url `{0}` is not a valid URL")]
    InvalidUpstreamUrl(String),

    #[error("upstream.url scheme `{0}` is not http or https")]
    UnsupportedUpstreamScheme(String),

    #[error("security.max_body_size must be greater than zero")]
    ZeroBodyLimit,

    #[error("observability.metrics_address `{0}` is not a socket address")]
    InvalidMetricsAddress(String),
}

/// Validate a configuration, returning every problem found.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    match Url::parse(&config.upstream.url) {
        Ok(url) => {
            if url.scheme() != "http" && url.scheme() != "https" {
                errors.push(ValidationError::UnsupportedUpstreamScheme(
                    url.scheme().to_string(),
                ));
            }
        }
        Err(_) => errors.push(ValidationError::InvalidUpstreamUrl(
            config.upstream.url.clone(),
        )),
    }

    if config.security.max_body_size == 0 {
        errors.push(ValidationError::ZeroBodyLimit);
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
