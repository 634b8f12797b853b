//! HTTP route handlers.
//!
//! Three exact paths are served: `/` (status page), `/healthz` (liveness) and
//! `/readyz` (readiness). Any method is accepted on each. Every response is
//! marked `no-store` since the incident log is re-read per request.
//!
//! Request tracing is enabled via middleware that generates a unique request ID
//! for each incoming request, allowing correlation of all logs within a request.

pub mod health;
pub mod status;

use axum::{middleware, routing::any, Router};
use axum::http::header::{HeaderValue, CACHE_CONTROL};
use tower_http::set_header::SetResponseHeaderLayer;

use crate::config::CACHE_CONTROL_NO_STORE;
use crate::error::IncidentError;
use crate::incidents::{self, IncidentReport};
use crate::middleware::request_id_layer;
use crate::state::AppState;

/// Load the incident report off the async runtime.
///
/// Existence checks, the file read and parsing are blocking, so they run on
/// the blocking pool. A failed task surfaces as [`IncidentError::Worker`].
pub async fn load_report(state: &AppState) -> Result<IncidentReport, IncidentError> {
    let source = state.source.clone();
    tokio::task::spawn_blocking(move || incidents::load_report(&source)).await?
}

/// Creates the Axum router with all routes and the no-store header.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", any(status::index))
        .route("/healthz", any(health::healthz))
        .route("/readyz", any(health::readyz))
        .with_state(state)
        .layer(SetResponseHeaderLayer::overriding(
            CACHE_CONTROL,
            HeaderValue::from_static(CACHE_CONTROL_NO_STORE),
        ))
        // Request ID middleware - creates root span with request_id for correlation
        .layer(middleware::from_fn(request_id_layer))
}
