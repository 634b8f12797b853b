//! The "days since the last incident" page.

use axum::extract::State;
use chrono::Local;

use super::load_report;
use crate::error::AppError;
use crate::incidents::status_line;
use crate::state::AppState;

/// Status line followed by the raw incident file.
///
/// Days are counted against the server's local calendar day.
pub async fn index(State(state): State<AppState>) -> Result<String, AppError> {
    let report = load_report(&state).await.map_err(AppError::Status)?;
    let today = Local::now().date_naive();
    let days = report.days_since(today);

    tracing::debug!(latest = %report.latest, days, "Rendering status page");

    let mut body = status_line(days);
    body.push_str(&report.source.contents);
    Ok(body)
}
