//! Server setup and lifecycle management

use crate::api::create_router;
use crate::api::rest::state::AppState;
use crate::config::DaemonConfig;
use crate::error::{DaemonError, DaemonResult};
use crate::pipeline::build_pipeline;
use crate::scheduler::TimerTrigger;
use blobsync_core::{RunOutcome, SyncPipeline, Trigger};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;

/// Blobsync daemon server
pub struct Server {
    config: DaemonConfig,
    pipeline: Arc<SyncPipeline>,
}

impl Server {
    /// Create a new server with the given configuration
    pub async fn new(config: DaemonConfig) -> DaemonResult<Self> {
        let pipeline = Arc::new(build_pipeline(&config).await?);
        Ok(Self { config, pipeline })
    }

    /// Run a single manual sync and return its outcome
    pub async fn run_once(&self) -> RunOutcome {
        self.pipeline.run(Trigger::Manual).await
    }

    /// Run the server
    pub async fn run(self) -> DaemonResult<()> {
        let addr = self.config.server.listen_addr;

        let state = AppState::new(self.pipeline.clone())
            .with_event_key(self.config.server.event_key.clone());
        if state.event_key.is_none() {
            tracing::warn!("No event key configured; the event endpoint accepts any caller");
        }
        let app = create_router(state);
        let listener = TcpListener::bind(addr).await?;

        tracing::info!("Blobsync daemon listening on {}", addr);

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let timer = if self.config.schedule.enabled {
            let trigger = TimerTrigger::new(self.config.schedule.clone(), self.pipeline.clone());
            Some(tokio::spawn(trigger.run(shutdown_rx)))
        } else {
            tracing::info!("Timer trigger disabled");
            None
        };

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| DaemonError::Server(e.to_string()))?;

        tracing::info!("Blobsync daemon shutting down");

        // A timer run in progress finishes before the task exits.
        let _ = shutdown_tx.send(true);
        if let Some(handle) = timer {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "Timer task ended abnormally");
            }
        }

        Ok(())
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
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
                tracing::error!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown");
        }
    }
}
