//! MCP streaming relay library.
//!
//! A reverse proxy for the Model Context Protocol's streamable HTTP
//! transport. Every `POST /mcp` is forwarded to one fixed upstream, the
//! upstream's (often SSE) response is streamed back line by line, and each
//! hop is written to a colour-coded packet log on stdout.

pub mod admin;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod security;

pub use config::schema::ProxyConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use observability::PacketLogger;
