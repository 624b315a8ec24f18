//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, routes, graceful shutdown)
//!     → request.rs (request ID)
//!     → relay.rs (forward upstream, stream the response back)
//!     → framing.rs (split the upstream body into lines)
//!     → Send to client
//! ```

pub mod framing;
pub mod relay;
pub mod request;
pub mod server;

pub use relay::{Relay, RelayError};
pub use request::X_REQUEST_ID;
pub use server::{AppState, HttpServer, ServerError};
