//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → limits.rs (cap inbound body size)
//!     → headers.rs (strip hop-by-hop, force MCP negotiation headers)
//!     → Pass to the relay
//! ```
//!
//! # Design Decisions
//! - Both ends are trusted: no authentication, no rate limiting
//! - Payloads are never inspected or validated, only size-capped

pub mod headers;
pub mod limits;

pub use headers::{is_hop_by_hop, strip_hop_by_hop, HOP_BY_HOP_HEADERS};
