//! Trending Hub service
//!
//! Features:
//! - Trending lists from tophub boards, EchoJS, Yuque, Maoyan, Xinquji,
//!   Hacker News and DEV
//! - Freshness-window response cache with coalesced misses
//! - Concurrent page fan-out for paged sources
//! - Semaphore-based upstream concurrency limiting
//! - Graceful shutdown with SIGTERM handling
//! - Correlation IDs and per-request spans
//! - Prometheus metrics

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{error, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use trending_hub::config::Config;
use trending_hub::server;
use trending_hub::service::TrendingService;
use trending_hub::sources::FetchParams;

/// Trending Hub - aggregated trending lists behind one endpoint
#[derive(Parser, Debug)]
#[command(name = "trending-hub")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Aggregated trending lists from news, tech and entertainment sites")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, default_value = "false", global = true)]
    json_logs: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Listen host (overrides LISTEN_HOST)
        #[arg(long)]
        host: Option<String>,

        /// Listen port (overrides LISTEN_PORT)
        #[arg(short, long)]
        port: Option<u16>,

        /// Freshness window, e.g. "30m" or "2h" (overrides CACHE_TTL_MS)
        #[arg(long, value_parser = humantime::parse_duration)]
        cache_ttl: Option<Duration>,
    },

    /// Fetch one target and print the envelope
    Fetch {
        /// Target name (see `targets`)
        target: String,

        /// Extra parameters as name=value, e.g. range=3
        #[arg(short, long = "param", value_parser = parse_param)]
        params: Vec<(String, String)>,

        /// Bypass the cache
        #[arg(long, default_value = "false")]
        refresh: bool,
    },

    /// List supported targets
    Targets,
}

fn parse_param(raw: &str) -> std::result::Result<(String, String), String> {
    raw.split_once('=')
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .ok_or_else(|| format!("expected name=value, got `{}`", raw))
}

/// Generates a new correlation ID for the session
fn generate_correlation_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Sets up structured logging with tracing
fn setup_logging(log_level: &str, json_output: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    if json_output {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_thread_ids(true))
            .init();
    }
}

/// Waits for SIGTERM/SIGINT and tells every listener to stop
async fn shutdown_signal(shutdown_tx: broadcast::Sender<()>) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
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
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown...");
        }
    }

    let _ = shutdown_tx.send(());
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(&cli.log_level, cli.json_logs);

    let correlation_id = generate_correlation_id();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        correlation_id = %correlation_id,
        "Starting Trending Hub"
    );

    let mut config = Config::load()?;
    if let Commands::Serve { host, port, cache_ttl } = &cli.command {
        if let Some(host) = host {
            config.listen_host = host.clone();
        }
        if let Some(port) = port {
            config.listen_port = *port;
        }
        if let Some(ttl) = cache_ttl {
            config.cache_ttl_ms = ttl.as_millis() as u64;
        }
    }
    config.validate()?;

    info!(
        cache_ttl_ms = config.cache_ttl_ms,
        max_concurrent = config.max_concurrent_requests,
        request_timeout_secs = ?config.request_timeout_secs,
        "Configuration loaded"
    );

    let service = Arc::new(TrendingService::from_config(&config)?);

    match cli.command {
        Commands::Serve { .. } => run_server(config, service).await?,

        Commands::Fetch { target, params, refresh } => {
            let params: FetchParams = params.into_iter().collect();
            let envelope = if refresh {
                service.refresh(Some(&target), &params).await
            } else {
                service.handle(Some(&target), &params).await
            };
            println!("{}", serde_json::to_string_pretty(&envelope)?);
        }

        Commands::Targets => {
            for name in service.supported_names() {
                println!("{}", name);
            }
        }
    }

    Ok(())
}

/// Runs the HTTP server until a shutdown signal arrives
async fn run_server(config: Config, service: Arc<TrendingService>) -> Result<()> {
    let addr = config.listen_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    let (shutdown_tx, _) = broadcast::channel::<()>(1);
    let shutdown_rx = shutdown_tx.subscribe();
    let shutdown_handle = tokio::spawn(shutdown_signal(shutdown_tx));

    server::serve(listener, service, config.metrics_enabled, shutdown_rx).await?;

    let _ = shutdown_handle.await;
    info!("Trending Hub stopped");
    Ok(())
}
