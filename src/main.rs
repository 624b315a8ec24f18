//! MCP streaming relay.
//!
//! # Architecture Overview
//!
//! ```text
//!                 ┌──────────────────────────────────────────────────────┐
//!                 │                      MCP RELAY (B)                    │
//!  Client (A)     │  ┌─────────┐    ┌──────────┐    ┌──────────────┐     │   Upstream (C)
//!  POST /mcp ─────┼─▶│  http   │───▶│ security │───▶│    relay     │─────┼──▶ POST <url>
//!                 │  │ server  │    │ headers  │    │  (reqwest)   │     │
//!                 │  └─────────┘    └──────────┘    └──────┬───────┘     │
//!                 │                                        │ line stream │
//!  ◀──────────────┼────────────────────────────────────────┴─────────────┼─── SSE / JSON
//!                 │                                        │             │
//!                 │                            ┌───────────▼─────────┐   │
//!                 │                            │ observability        │   │
//!                 │                            │ truncate → packet log│──┼──▶ stdout
//!                 │                            └─────────────────────┘   │
//!                 │  lifecycle: Ctrl+C / SIGTERM / POST /shutdown         │
//!                 └──────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use mcp_relay::config::{apply_env_overrides, load_config, ProxyConfig};
use mcp_relay::lifecycle::{startup, Shutdown};
use mcp_relay::observability::logging::init_tracing;
use mcp_relay::PacketLogger;

#[derive(Parser)]
#[command(name = "mcp-relay")]
#[command(about = "Streaming MCP reverse proxy with packet logging", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address, e.g. 0.0.0.0:9000.
    #[arg(short, long)]
    listen: Option<String>,

    /// Upstream MCP endpoint URL.
    #[arg(short, long)]
    upstream: Option<String>,

    /// Disable ANSI colours in the packet log.
    #[arg(long)]
    no_color: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ProxyConfig::default(),
    };
    apply_env_overrides(&mut config);
    if let Some(listen) = cli.listen {
        config.listener.bind_address = listen;
    }
    if let Some(upstream) = cli.upstream {
        config.upstream.url = upstream;
    }
    if cli.no_color {
        config.logging.color = false;
    }

    init_tracing(&config.logging.log_level);
    tracing::info!("mcp-relay v{} starting", env!("CARGO_PKG_VERSION"));

    let logger = PacketLogger::stdout()
        .with_color(config.logging.color)
        .with_pretty_json(config.logging.pretty_json);

    startup::run(config, logger, Shutdown::new()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
