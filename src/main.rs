use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

use fieldguard::config::{FieldguardConfig, LogFormat, LoggingConfig};
use fieldguard::http::{AppState, HttpServer};
use fieldguard::ratelimit::{PolicySet, RateLimitRegistry, Reclaimer};

/// In-memory abuse-control rate limiter.
#[derive(Parser, Debug)]
#[command(name = "fieldguard", version, about)]
struct Args {
    /// Path to a YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listen address
    #[arg(short, long)]
    listen: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => FieldguardConfig::load(path)?,
        None => FieldguardConfig::from_env()?,
    };
    if let Some(listen) = args.listen {
        config.server.listen_addr = listen;
    }

    init_tracing(&config.logging);

    info!("Starting Fieldguard Rate Limiting Service");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    match &args.config {
        Some(path) => info!(path = %path.display(), "Loaded configuration file"),
        None => info!("No configuration file given, using defaults and environment"),
    }
    info!(listen_addr = %config.server.listen_addr, "Configuration loaded");

    let policies = PolicySet::from_config(&config.policies)?;
    let registry = Arc::new(RateLimitRegistry::new().with_retention(config.reclaimer.retention()));
    info!("Rate limit registry initialized");

    let reclaimer = Reclaimer::new(registry.clone(), config.reclaimer.interval()).spawn();

    let server = HttpServer::new(config.server.listen_addr, AppState::new(registry, policies));

    // Run the server with graceful shutdown on Ctrl+C
    let served = server.serve_with_shutdown(shutdown_signal()).await;

    reclaimer.stop().await;
    served?;

    info!("Fieldguard Rate Limiting Service stopped");
    Ok(())
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(true);

    match logging.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}

/// Wait for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
