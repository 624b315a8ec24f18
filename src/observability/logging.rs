//! Operational logging.
//!
//! Startup, shutdown and failure events go through `tracing` to stderr.
//! Stdout is reserved for the packet log (see `packet.rs`), so the two
//! streams can be redirected independently.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global `tracing` subscriber.
///
/// `RUST_LOG` takes precedence over `default_level`. Calling this twice is
/// harmless; the second call leaves the first subscriber in place.
pub fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("mcp_relay={default_level},tower_http={default_level}")));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}
