//! Radiocast Relay - Main entry point
//!
//! Loads configuration, builds the session registry with the ffmpeg decoder,
//! Opus encoder and file transport, and serves the HTTP control API until
//! Ctrl-C or SIGTERM. Every running session is stopped before exit.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use radiocast_common::config::{LogLevel, RelayConfig};
use radiocast_common::StationCatalog;
use radiocast_relay::api;
use radiocast_relay::audio::{FfmpegSpawner, OpusEncoderFactory};
use radiocast_relay::search::{RadioBrowserClient, StationSearch};
use radiocast_relay::session::{spawn_reaper, SessionRegistry, SessionSettings};
use radiocast_relay::transport::FileGateway;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Command-line arguments for radiocast-relay
#[derive(Parser, Debug)]
#[command(name = "radiocast-relay")]
#[command(about = "Relays internet radio streams into voice rooms")]
#[command(version)]
struct Args {
    /// Configuration file (TOML)
    #[arg(short, long, env = "RADIOCAST_CONFIG")]
    config: Option<PathBuf>,

    /// Address to bind the control API to
    #[arg(long, env = "RADIOCAST_HOST")]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "RADIOCAST_PORT")]
    port: Option<u16>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "RADIOCAST_LOG_LEVEL")]
    log_level: Option<LogLevel>,

    /// ffmpeg executable
    #[arg(long, env = "RADIOCAST_FFMPEG")]
    ffmpeg: Option<PathBuf>,

    /// Directory receiving per-room packet files
    #[arg(long, env = "RADIOCAST_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// JSON file custom stations are saved to
    #[arg(long, env = "RADIOCAST_STATIONS_FILE")]
    stations_file: Option<PathBuf>,
}

impl Args {
    /// Command-line values win over everything else
    fn apply_to(&self, config: &mut RelayConfig) {
        if let Some(host) = &self.host {
            config.server.host = host.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(level) = self.log_level {
            config.logging.level = level;
        }
        if let Some(ffmpeg) = &self.ffmpeg {
            config.decoder.ffmpeg_path = ffmpeg.clone();
        }
        if let Some(dir) = &self.output_dir {
            config.output.directory = dir.clone();
        }
        if let Some(file) = &self.stations_file {
            config.output.custom_stations_file = Some(file.clone());
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = RelayConfig::resolve(args.config.as_deref())
        .context("Failed to load configuration")?;
    args.apply_to(&mut config);
    config.validate().context("Invalid configuration")?;

    init_tracing(config.logging.level);

    info!(
        "Starting Radiocast Relay v{} ({}, built {})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP")
    );
    match &config.loaded_from {
        Some(path) => info!("Configuration loaded from {}", path.display()),
        None => info!("No configuration file found, using defaults"),
    }

    let mut catalog =
        StationCatalog::from_config(&config.stations).context("Invalid [stations] entry")?;
    if let Some(file) = &config.output.custom_stations_file {
        catalog = catalog
            .persist_to(file)
            .with_context(|| format!("Failed to load custom stations from {}", file.display()))?;
    }
    let stations = Arc::new(catalog);
    info!("{} stations available", stations.list().len());

    let directory = RadioBrowserClient::from_config(&config.search)
        .context("Failed to build station search client")?;
    let search = Arc::new(StationSearch::new(Arc::new(directory)));
    info!("Station search via {}", config.search.endpoint);

    let gateway = FileGateway::new(&config.output.directory, config.session.sink_queue_frames);
    info!("Writing room audio to {}", gateway.directory().display());

    let registry = Arc::new(SessionRegistry::new(
        Arc::new(gateway),
        Arc::new(FfmpegSpawner::new(&config.decoder)),
        Arc::new(OpusEncoderFactory),
        SessionSettings::from_config(&config),
    ));
    spawn_reaper(&registry);

    let app = api::create_router(api::AppState {
        registry: Arc::clone(&registry),
        stations,
        search,
        port: config.server.port,
    });

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    registry.shutdown().await;
    info!("Shutdown complete");
    Ok(())
}

/// `RUST_LOG` wins; otherwise the configured level for our crates
fn init_tracing(level: LogLevel) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = level.as_str();
        EnvFilter::new(format!(
            "radiocast_relay={level},radiocast_common={level},ffmpeg={level},tower_http={level}"
        ))
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
