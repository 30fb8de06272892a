//! Blobsync Daemon - Blob to SQL synchronization service
//!
//! Downloads a JSON document of user records from blob storage and upserts
//! it into the `Users` table, every 30 minutes and whenever an event
//! notification arrives. Failures are reported by email.

use blobsync_core::RunOutcome;
use blobsync_daemon::{DaemonConfig, DaemonError, DaemonResult, Server};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Blobsync Daemon CLI
#[derive(Parser)]
#[command(name = "blobsyncd")]
#[command(about = "Blobsync Daemon - Blob to SQL synchronization service", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "BLOBSYNC_CONFIG")]
    config: Option<String>,

    /// Listen address (overrides server.listen_addr)
    #[arg(short, long, env = "BLOBSYNC_LISTEN_ADDR")]
    listen: Option<String>,

    /// Log level (overrides logging.level)
    #[arg(long, env = "BLOBSYNC_LOG_LEVEL")]
    log_level: Option<String>,

    /// Enable JSON logging
    #[arg(long, env = "BLOBSYNC_LOG_JSON")]
    json: bool,

    /// Run one sync and exit
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> DaemonResult<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = DaemonConfig::load(cli.config.as_deref())?;

    // Initialize tracing
    let log_level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| config.logging.level.clone());
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| log_level.into());

    if cli.json || config.logging.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    // Override with CLI args
    if let Some(listen) = cli.listen.as_deref() {
        config.server.listen_addr = listen
            .parse()
            .map_err(|e| DaemonError::Config(format!("Invalid listen address: {}", e)))?;
    }

    tracing::info!(config = %config.redacted_summary(), "Configuration loaded");

    let server = Server::new(config.clone()).await?;

    if cli.once {
        let outcome = server.run_once().await;
        tracing::info!(?outcome, "Single run finished");
        if matches!(outcome, RunOutcome::Applied(_)) {
            return Ok(());
        }
        std::process::exit(1);
    }

    // Print startup banner
    println!(
        r#"
  blobsyncd {}
  Listening: {}
  Timer:     {}
"#,
        env!("CARGO_PKG_VERSION"),
        config.server.listen_addr,
        if config.schedule.enabled {
            format!("every {}s", config.schedule.interval().as_secs())
        } else {
            "disabled".to_string()
        }
    );

    server.run().await
}
