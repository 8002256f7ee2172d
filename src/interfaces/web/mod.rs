pub(crate) mod auth;
mod handlers;
mod router;

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Notify;
use tracing::{error, info, warn};

use crate::core::audit::AuditStore;
use crate::core::config::AppConfig;
use crate::core::pipeline::Pipeline;
use crate::core::watch::WatchList;

pub(crate) use router::build_router;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) config: Arc<AppConfig>,
    pub(crate) watch: Arc<WatchList>,
    pub(crate) pipeline: Arc<Pipeline>,
    pub(crate) audit: AuditStore,
}

impl AppState {
    pub(crate) fn new(config: Arc<AppConfig>, pipeline: Arc<Pipeline>, audit: AuditStore) -> Self {
        let watch = Arc::new(WatchList::from_config(&config.watch));
        Self {
            config,
            watch,
            pipeline,
            audit,
        }
    }
}

/// HTTP front door: webhook ingress and audit log reads.
pub struct WebhookServer {
    state: AppState,
}

impl WebhookServer {
    pub(crate) fn new(state: AppState) -> Self {
        Self { state }
    }

    /// Serve until Ctrl-C / SIGTERM, then drain in-flight requests for at most
    /// `server.shutdown_timeout_secs`.
    pub async fn run(self) -> Result<()> {
        let server = &self.state.config.server;
        let addr = format!("{}:{}", server.host, server.port);
        let shutdown_timeout = Duration::from_secs(server.shutdown_timeout_secs);

        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .with_context(|| format!("failed to bind {}", addr))?;
        info!("Server listening on http://{}", addr);

        let started = Instant::now();
        let app = build_router(self.state);
        let stop = Arc::new(Notify::new());
        let serve = axum::serve(listener, app).with_graceful_shutdown({
            let stop = stop.clone();
            async move { stop.notified().await }
        });
        let mut handle = tokio::spawn(async move { serve.await });

        tokio::select! {
            result = &mut handle => {
                info!("Application up-time: {:?}", started.elapsed());
                return match result {
                    Ok(Ok(())) => Ok(()),
                    Ok(Err(e)) => {
                        error!("Server error, shutting down: {}", e);
                        Err(e.into())
                    }
                    Err(e) => Err(e.into()),
                };
            }
            _ = shutdown_signal() => {
                info!("Stop signal received, gracefully shutting down the server");
            }
        }

        info!("Waiting at most {:?} for the server to shut down", shutdown_timeout);
        stop.notify_one();
        match tokio::time::timeout(shutdown_timeout, handle).await {
            Ok(Ok(Ok(()))) => info!("Server down"),
            Ok(Ok(Err(e))) => warn!("Server shutdown error: {}", e),
            Ok(Err(e)) => warn!("Server task failed: {}", e),
            Err(_) => warn!("Shutdown timed out, dropping open connections"),
        }
        info!("Application up-time: {:?}", started.elapsed());
        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
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
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
