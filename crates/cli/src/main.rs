//! Realtime gateway entrypoint.

mod config;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use gateway::{Gateway, GatewayState, TokenVerifier};
use registry::RedisRegistry;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use config::Config;

/// Top-level command-line arguments for the gateway.
#[derive(Parser)]
#[command(name = "tidegate")]
#[command(about = "Multi-tenant realtime gateway", version = "0.1.0")]
struct Cli {
    /// Path to config file
    #[arg(short, long)]
    config: Option<std::path::PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Enable debug logging to ~/.tidegate/logs/debug.log
    #[arg(long, default_value_t = false)]
    debug: bool,
}

fn init_logging(cli: &Cli) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let console_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    let console = fmt::layer().with_target(false).with_filter(console_filter);

    if cli.debug {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        let log_dir = std::path::PathBuf::from(home).join(".tidegate").join("logs");
        std::fs::create_dir_all(&log_dir).ok();
        let appender = tracing_appender::rolling::daily(&log_dir, "debug.log");
        let (writer, guard) = tracing_appender::non_blocking(appender);

        // WorkerGuard must outlive main() so buffered file writes are flushed.
        let file = fmt::layer()
            .with_writer(writer)
            .with_target(true)
            .with_ansi(false)
            .with_filter(EnvFilter::new("debug"));
        tracing_subscriber::registry().with(console).with(file).init();
        Some(guard)
    } else {
        tracing_subscriber::registry().with(console).init();
        None
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _file_guard = init_logging(&cli);

    let config = Config::load(cli.config.as_deref()).context("loading configuration")?;

    // One shared store handle for all sessions, established once at startup.
    let registry = RedisRegistry::connect(&config.redis.url()).await;
    if registry.is_degraded() {
        error!("Connection registry is degraded; presence bookkeeping is disabled");
    }

    let state = Arc::new(GatewayState::new(
        TokenVerifier::new(&config.auth.secret),
        Arc::new(registry),
    ));

    let addr = config.gateway.addr().context("resolving listen address")?;
    info!(%addr, "Starting realtime gateway");

    Gateway::new(addr, config.gateway.cors_origins.clone(), state)
        .run()
        .await
        .context("running gateway")?;
    Ok(())
}
