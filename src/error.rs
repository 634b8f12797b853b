use axum::{
    http::{header::CONTENT_TYPE, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use std::io;
use std::path::PathBuf;

/// Content type of every response body
pub const TEXT_PLAIN_UTF8: &str = "text/plain; charset=utf-8";

/// Why the incident log could not produce a latest incident date.
#[derive(Debug, thiserror::Error)]
pub enum IncidentError {
    #[error("No incidents file found (expected {})", expected_files(.candidates))]
    SourceNotFound { candidates: Vec<PathBuf> },

    #[error("Failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Malformed incidents document: {0}")]
    MalformedDocument(String),

    #[error("No valid incident dates found")]
    NoValidDates,

    #[error("Incident loader failed: {0}")]
    Worker(String),
}

impl From<serde_yaml::Error> for IncidentError {
    fn from(err: serde_yaml::Error) -> Self {
        IncidentError::MalformedDocument(err.to_string())
    }
}

impl From<tokio::task::JoinError> for IncidentError {
    fn from(err: tokio::task::JoinError) -> Self {
        IncidentError::Worker(err.to_string())
    }
}

/// Render candidate paths by file name, joined with "or".
fn expected_files(candidates: &[PathBuf]) -> String {
    candidates
        .iter()
        .map(|path| {
            path.file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string())
        })
        .collect::<Vec<_>>()
        .join(" or ")
}

/// Handler-boundary error: which probe failed decides the status code and prefix.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Failure while rendering the status page
    #[error("error: {0}")]
    Status(IncidentError),

    /// Failure while answering the readiness probe
    #[error("not ready: {}", readiness_reason(.0))]
    NotReady(IncidentError),
}

fn readiness_reason(err: &IncidentError) -> String {
    match err {
        IncidentError::NoValidDates => "no valid incident dates".to_string(),
        other => other.to_string(),
    }
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Status(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::NotReady(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match &self {
            AppError::Status(IncidentError::Worker(_)) | AppError::NotReady(IncidentError::Worker(_)) => {
                tracing::error!(error = %self, "Incident loader task failed");
            }
            _ => {
                tracing::warn!(status = status.as_u16(), error = %self, "Incident log unavailable");
            }
        }

        let body = format!("{}\n", self);
        (
            status,
            [(CONTENT_TYPE, HeaderValue::from_static(TEXT_PLAIN_UTF8))],
            body,
        )
            .into_response()
    }
}
