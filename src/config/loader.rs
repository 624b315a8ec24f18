//! Configuration loading from disk and the environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::ProxyConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Environment variable overriding `listener.bind_address`.
pub const ENV_BIND_ADDRESS: &str = "MCP_RELAY_BIND_ADDRESS";

/// Environment variable overriding `upstream.url`.
pub const ENV_UPSTREAM_URL: &str = "MCP_RELAY_UPSTREAM_URL";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ProxyConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: ProxyConfig = toml::from_str(&content)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Apply `MCP_RELAY_*` environment overrides on top of a loaded config.
pub fn apply_env_overrides(config: &mut ProxyConfig) {
    apply_overrides(config, |key| std::env::var(key).ok());
}

fn apply_overrides<F>(config: &mut ProxyConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(addr) = lookup(ENV_BIND_ADDRESS).filter(|v| !v.trim().is_empty()) {
        config.listener.bind_address = addr.trim().to_string();
    }
    if let Some(url) = lookup(ENV_UPSTREAM_URL).filter(|v| !v.trim().is_empty()) {
        config.upstream.url = url.trim().to_string();
    }
}
