use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tracing::{debug, error, info, warn};

use regionpulse::config::AppConfig;
use regionpulse::logging::init_logging;
use regionpulse::probe::{HttpProber, SystemClock};
use regionpulse::services::MonitorService;
use regionpulse::store::StorePools;
use regionpulse::version::VERSION;
use regionpulse::web::create_axum_router;

const MARKER_PURGE_INTERVAL: Duration = Duration::from_secs(3600);

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args = Args::parse();

    // --- Config Setup ---
    // Logging needs the log directory, so config errors go straight to stderr.
    let config = match AppConfig::load(args.config.as_deref()) {
        Ok(config) => Arc::new(config),
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return Err(e.into());
        }
    };

    let _log_guard = init_logging(&config);
    info!(version = VERSION, "Starting regionpulse");
    info!(region = %config.region, environment = %config.node_env, "Configuration loaded");

    // --- Database Pool Setup ---
    let pools = StorePools::connect_lazy(&config);
    if let Err(e) = pools.ensure_schema().await {
        warn!(error = %e, "Could not ensure health_checks table; replication probes may fail");
    }

    // --- Monitor Service Setup ---
    let prober = HttpProber::new(config.peer_timeout())?;
    let monitor = Arc::new(MonitorService::new(
        &config,
        Arc::new(pools.writer.clone()),
        Arc::new(pools.reader.clone()),
        Arc::new(prober),
        Arc::new(SystemClock),
    ));

    // --- Marker Retention Task ---
    if let Some(hours) = config.marker_retention_hours {
        let monitor_for_purge = monitor.clone();
        let retention = Duration::from_secs(hours * 3600);
        tokio::spawn(async move {
            let mut interval = interval(MARKER_PURGE_INTERVAL);
            info!(retention_hours = hours, "Marker retention task started.");
            loop {
                interval.tick().await;
                match monitor_for_purge.purge_expired_markers(retention).await {
                    Ok(0) => debug!("No expired replication markers to purge."),
                    Ok(purged) => info!(count = purged, "Purged expired replication markers."),
                    Err(e) => error!(error = %e, "Error purging replication markers."),
                }
            }
        });
    }

    // --- Axum HTTP Server Setup ---
    let app = create_axum_router(config.clone(), monitor);
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(address = %addr, region = %config.region, "Backend API server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("HTTP server closed");
    pools.close().await;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("SIGINT signal received: closing HTTP server"),
        _ = terminate => info!("SIGTERM signal received: closing HTTP server"),
    }
}
