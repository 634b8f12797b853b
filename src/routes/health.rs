//! Liveness and readiness endpoints for container orchestration.
//!
//! `/healthz` only proves the process can answer HTTP. `/readyz` additionally
//! requires the incident log to resolve, parse and contain at least one valid
//! date, so a load balancer can hold traffic until the status page is meaningful.

use axum::extract::State;

use super::load_report;
use crate::error::AppError;
use crate::state::AppState;

/// Liveness probe. Never touches the incident log.
pub async fn healthz() -> &'static str {
    "ok\n"
}

/// Readiness probe.
pub async fn readyz(State(state): State<AppState>) -> Result<&'static str, AppError> {
    load_report(&state).await.map_err(AppError::NotReady)?;
    Ok("ready\n")
}
