//! HTTP server lifecycle.
//!
//! [`StatusServer::start`] binds the configured address and serves until a
//! stop is requested through a [`ServerHandle`]. The server knows nothing
//! about signals; see [`super::shutdown`] for that wiring.

use std::net::SocketAddr;
use std::time::Duration;

use axum::Router;
use axum_server::Handle;

use crate::config::{HttpServerConfig, SHUTDOWN_GRACE_SECS};

/// Server startup error
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Failed to resolve {0}")]
    Resolve(String),

    #[error("Failed to bind server: {0}")]
    Bind(#[from] std::io::Error),
}

/// The HTTP listener for the status routes.
pub struct StatusServer {
    config: HttpServerConfig,
    handle: Handle,
}

/// Cloneable control for a running [`StatusServer`].
#[derive(Clone)]
pub struct ServerHandle {
    handle: Handle,
}

impl ServerHandle {
    /// Stop accepting connections and let in-flight requests drain.
    pub fn stop(&self) {
        self.handle
            .graceful_shutdown(Some(Duration::from_secs(SHUTDOWN_GRACE_SECS)));
        tracing::info!(
            "Graceful shutdown initiated, waiting up to {} seconds for connections to close",
            SHUTDOWN_GRACE_SECS
        );
    }

    /// Address the server is bound to, once it is listening.
    ///
    /// Returns `None` if the server stopped or failed before binding.
    pub async fn listening(&self) -> Option<SocketAddr> {
        self.handle.listening().await
    }
}

impl StatusServer {
    pub fn new(config: HttpServerConfig) -> Self {
        Self {
            config,
            handle: Handle::new(),
        }
    }

    pub fn handle(&self) -> ServerHandle {
        ServerHandle {
            handle: self.handle.clone(),
        }
    }

    pub fn stop(&self) {
        self.handle().stop();
    }

    /// Bind and serve `app`. Returns once the server has stopped.
    pub async fn start(self, app: Router) -> Result<(), ServerError> {
        let addr = resolve(&self.config).await?;
        tracing::info!(%addr, "Starting HTTP server");

        axum_server::bind(addr)
            .handle(self.handle)
            .serve(app.into_make_service())
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Resolve `host:port`. Host names are looked up; the first address wins.
async fn resolve(config: &HttpServerConfig) -> Result<SocketAddr, ServerError> {
    let target = format!("{}:{}", config.host, config.port);
    let addr = tokio::net::lookup_host(target.as_str())
        .await
        .map_err(|e| ServerError::Resolve(format!("{target}: {e}")))?
        .next();
    addr.ok_or(ServerError::Resolve(target))
}
