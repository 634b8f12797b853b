//! Signal handling for graceful shutdown.

use super::server::ServerHandle;

/// Stop the server on SIGTERM or SIGINT.
///
/// Runs in the background. The drain itself is logged by [`ServerHandle::stop`].
pub fn stop_on_signal(handle: ServerHandle) {
    tokio::spawn(async move {
        let signal = wait_for_signal().await;
        tracing::info!(signal, "Received stop signal");
        handle.stop();
    });
}

/// Resolves with the name of the first stop signal delivered.
async fn wait_for_signal() -> &'static str {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => "SIGINT",
        _ = terminate => "SIGTERM",
    }
}
