//! Shutdown coordination for the relay.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

/// Coordinator for prompt shutdown.
///
/// Cloned into the listener and every relay at construction time. The flag
/// only ever goes from "running" to "stopping"; there is no reset.
#[derive(Debug, Clone, Default)]
pub struct Shutdown {
    token: CancellationToken,
    triggered: Arc<AtomicBool>,
}

impl Shutdown {
    /// Create a new shutdown coordinator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request shutdown.
    ///
    /// Idempotent and safe to call concurrently. Returns `true` only for the
    /// call that actually flipped the flag.
    pub fn trigger(&self, reason: &str) -> bool {
        if self.triggered.swap(true, Ordering::SeqCst) {
            tracing::debug!(reason, "Shutdown already requested");
            return false;
        }
        tracing::info!(reason, "Shutdown requested");
        self.token.cancel();
        true
    }

    /// Whether shutdown has been requested.
    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }

    /// Resolves once shutdown has been requested.
    pub async fn cancelled(&self) {
        self.token.cancelled().await;
    }
}
