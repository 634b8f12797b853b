//! Incident status server entry point.
//!
//! Initializes tracing, loads configuration from the environment, resolves the
//! incident source, sets up the Axum router and serves until SIGINT/SIGTERM.

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use incident_status::config::{AppConfig, LogFormat, DEFAULT_DATA_DIR, DEFAULT_LOG_FILTER};
use incident_status::http::{shutdown, StatusServer};
use incident_status::routes::create_router;
use incident_status::state::AppState;

/// Incident status: days since the last incident
#[derive(Parser, Debug)]
#[command(name = "incident-status", version, about)]
struct Args {
    /// Directory containing incidents.yaml or example_incidents.yaml
    #[arg(short, long, default_value = DEFAULT_DATA_DIR)]
    data_dir: PathBuf,

    /// Log level filter (e.g., "incident_status=debug,tower_http=info")
    #[arg(short, long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Invalid configuration aborts here, before anything is bound
    let config = match AppConfig::from_env(args.data_dir) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("incident-status: {e}");
            std::process::exit(1);
        }
    };

    // Initialize tracing with priority: CLI > env > default
    let log_filter = args
        .log_level
        .or_else(|| std::env::var("RUST_LOG").ok())
        .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());

    let registry =
        tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::new(&log_filter));
    match config.logging.format {
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init(),
        LogFormat::Text => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
    }

    tracing::info!(
        host = %config.http.host,
        port = config.http.port,
        data_dir = %config.data_dir.display(),
        "Loaded configuration"
    );

    let state = AppState::from_config(&config);
    match state.source.resolve() {
        Ok(path) => tracing::info!(path = %path.display(), "Incident source found"),
        Err(e) => tracing::warn!(error = %e, "Incident source missing, status page will fail until it appears"),
    }

    let app = create_router(state);

    let server = StatusServer::new(config.http.clone());
    shutdown::stop_on_signal(server.handle());
    server.start(app).await?;

    Ok(())
}
