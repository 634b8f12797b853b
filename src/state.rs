//! Shared application state for request handlers.

use std::sync::Arc;

use crate::config::AppConfig;
use crate::incidents::IncidentSource;

/// Shared application state, cloneable across handlers via Arc-wrapped fields.
///
/// Holds only the incident source. Nothing parsed from it is kept between
/// requests.
#[derive(Clone)]
pub struct AppState {
    pub source: Arc<IncidentSource>,
}

impl AppState {
    /// Creates a new application state reading from the given source.
    pub fn new(source: IncidentSource) -> Self {
        Self {
            source: Arc::new(source),
        }
    }

    /// Creates the state for the candidate files named by the configuration.
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(IncidentSource::new(config.candidate_paths()))
    }
}
