//! OS signal handling.
//!
//! SIGINT (Ctrl+C) and, on unix, SIGTERM both map to a shutdown request.

use crate::lifecycle::Shutdown;

/// Wait for the first interrupt or terminate signal.
pub async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Interrupt signal received"),
        _ = terminate => tracing::info!("Terminate signal received"),
    }
}

/// Forward OS signals to `shutdown` from a background task.
///
/// The task also exits if shutdown is requested by other means.
pub fn spawn_signal_listener(shutdown: Shutdown) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            _ = wait_for_signal() => {
                shutdown.trigger("signal");
            }
            _ = shutdown.cancelled() => {}
        }
    })
}
