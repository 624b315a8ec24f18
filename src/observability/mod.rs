//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Relay hops (A→B, B→C, C→B, ERROR):
//!     → truncate.rs (size-bound non-JSON fragments)
//!     → packet.rs (timestamped, coloured records on stdout)
//!
//! Operational events:
//!     → logging.rs (tracing, stderr)
//!     → metrics.rs (counters, histogram, optional Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - The packet log is a console view of the traffic, never a data path
//! - Truncation applies to the log copy only
//! - One lock around each packet record; nothing else is shared

pub mod logging;
pub mod metrics;
pub mod packet;
pub mod truncate;

pub use packet::{Color, Direction, PacketLogger, SharedBuffer};
pub use truncate::{truncate_for_log, MAX_VISIBLE_CHARS, TRUNCATION_MARKER};
