//! Incident status: a "days since the last incident" page.
//!
//! Serves a plain-text status page computed from a YAML incident log, plus
//! `/healthz` and `/readyz` probes. The log is re-read and re-parsed on every
//! request; nothing is cached.

pub mod config;
pub mod error;
pub mod http;
pub mod incidents;
pub mod middleware;
pub mod routes;
pub mod state;

pub use error::{AppError, IncidentError};
