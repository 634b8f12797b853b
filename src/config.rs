//! Configuration loading and constants.
//!
//! The service is configured from environment variables (`PORT`, `HOST`,
//! `LOG_FORMAT`) plus the data directory passed on the command line.
//! `AppConfig` is validated once, when it is built, so an invalid port aborts
//! startup before any listener exists.

use std::path::PathBuf;

// =============================================================================
// HTTP Server Defaults
// =============================================================================

/// Default bind address when `HOST` is not set
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default port when `PORT` is not set
pub const DEFAULT_PORT: u16 = 3000;

/// Seconds to wait for in-flight requests after a stop is requested
pub const SHUTDOWN_GRACE_SECS: u64 = 30;

/// The incident log is re-read on every request, so nothing may be cached
pub const CACHE_CONTROL_NO_STORE: &str = "no-store";

// =============================================================================
// Incident Data
// =============================================================================

/// Incident files, in lookup order. The first one that exists is used.
pub const CANDIDATE_FILES: [&str; 2] = ["incidents.yaml", "example_incidents.yaml"];

/// Default directory the candidate files are resolved against
pub const DEFAULT_DATA_DIR: &str = ".";

// =============================================================================
// Logging
// =============================================================================

/// Default log filter when neither `--log-level` nor `RUST_LOG` is set
pub const DEFAULT_LOG_FILTER: &str = "incident_status=info,tower_http=info";

/// Default log format (text or json)
pub const DEFAULT_LOG_FORMAT: &str = "text";

// Environment keys
pub const ENV_PORT: &str = "PORT";
pub const ENV_HOST: &str = "HOST";
pub const ENV_LOG_FORMAT: &str = "LOG_FORMAT";

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// HTTP server configuration
    pub http: HttpServerConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
    /// Directory containing the incident files
    pub data_dir: PathBuf,
}

/// HTTP server configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

/// Output format for log lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

/// Logging configuration
#[derive(Debug, Clone, Default)]
pub struct LoggingConfig {
    pub format: LogFormat,
}

impl AppConfig {
    /// Build the configuration from the process environment.
    pub fn from_env(data_dir: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok(), data_dir)
    }

    /// Build the configuration from an arbitrary key lookup.
    ///
    /// Absent keys fall back to their defaults; present keys must be valid.
    pub fn from_lookup<F>(lookup: F, data_dir: impl Into<PathBuf>) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = match lookup(ENV_PORT) {
            Some(raw) => parse_port(&raw)?,
            None => DEFAULT_PORT,
        };

        let host = lookup(ENV_HOST).unwrap_or_else(|| DEFAULT_HOST.to_string());
        if host.trim().is_empty() {
            return Err(ConfigError::InvalidHost);
        }

        let format = match lookup(ENV_LOG_FORMAT) {
            Some(raw) => parse_log_format(&raw)?,
            None => LogFormat::default(),
        };

        Ok(Self {
            http: HttpServerConfig { host, port },
            logging: LoggingConfig { format },
            data_dir: data_dir.into(),
        })
    }

    /// Full paths of the candidate incident files, in lookup order.
    pub fn candidate_paths(&self) -> Vec<PathBuf> {
        CANDIDATE_FILES
            .iter()
            .map(|name| self.data_dir.join(name))
            .collect()
    }
}

/// Parse a decimal port number. Surrounding whitespace is not accepted.
fn parse_port(raw: &str) -> Result<u16, ConfigError> {
    raw.parse::<u16>()
        .map_err(|_| ConfigError::InvalidPort(raw.to_string()))
}

fn parse_log_format(raw: &str) -> Result<LogFormat, ConfigError> {
    match raw.to_ascii_lowercase().as_str() {
        "text" => Ok(LogFormat::Text),
        "json" => Ok(LogFormat::Json),
        _ => Err(ConfigError::InvalidLogFormat(raw.to_string())),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("PORT must be an integer, got {0:?}")]
    InvalidPort(String),
    #[error("HOST must not be empty")]
    InvalidHost,
    #[error("LOG_FORMAT must be \"text\" or \"json\", got {0:?}")]
    InvalidLogFormat(String),
}
