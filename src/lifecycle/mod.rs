//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Validate config → Metrics → Bind listener → Serve
//!
//! Shutdown (shutdown.rs):
//!     Signal or POST /shutdown → Stop accepting → Relays stop between chunks → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger shutdown
//! ```

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
