//! Main uptime server implementation.

use crate::http_server::{ApiServer, AppState};
use crate::metrics::MetricsRegistry;
use crate::types::ServerConfig;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uptime::{HistoryStore, HttpProbe, ProbeHandler, Scheduler};

/// Uptime server
pub struct UptimeServer {
    config: ServerConfig,
    shutdown: CancellationToken,
}

impl UptimeServer {
    /// Create a new uptime server
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            shutdown: CancellationToken::new(),
        }
    }

    /// Token that stops [`run`](Self::run) like a termination signal
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Run the server until SIGINT, SIGTERM or the shutdown token fires
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        info!("Starting uptime server");

        // A broken store is fatal
        let store = HistoryStore::open(&self.config.db_path, self.config.history_size)?;
        let entries = store.verify()?;
        info!(
            path = %self.config.db_path.display(),
            entries,
            history_size = store.capacity(),
            "History store opened"
        );

        let endpoints = self.config.endpoints();
        if endpoints.is_empty() {
            warn!("No endpoints configured");
        }

        let metrics = if self.config.metrics_enabled {
            let registry = Arc::new(MetricsRegistry::new());
            registry.set_endpoints(endpoints.len());
            info!("Metrics enabled on /metrics");
            Some(registry)
        } else {
            info!("Metrics disabled");
            None
        };

        let executor = Arc::new(HttpProbe::new()?);
        let handler = Arc::new(ProbeHandler::new(executor, store.clone()));
        let scheduler = Scheduler::new(handler, self.config.interval, endpoints);

        let recorder = metrics
            .as_ref()
            .map(|registry| registry.clone().watch(scheduler.subscribe()));

        let state = AppState::new(store, &self.config.domains, metrics);
        let api = ApiServer::bind(&self.config.listen_addr, state).await?;
        let api_shutdown = CancellationToken::new();
        let mut api_handle = tokio::spawn(api.serve(api_shutdown.clone()));

        scheduler.start();
        info!("Uptime server running");

        let api_failed = tokio::select! {
            _ = shutdown_signal() => {
                info!("Shutdown signal received");
                false
            }
            _ = self.shutdown.cancelled() => {
                info!("Shutdown requested");
                false
            }
            result = &mut api_handle => {
                match result {
                    Ok(Ok(())) => error!("Query API exited unexpectedly"),
                    Ok(Err(e)) => error!(error = %e, "Query API failed"),
                    Err(e) => error!(error = %e, "Query API task failed"),
                }
                true
            }
        };

        if !scheduler.shutdown(self.config.drain_timeout).await {
            warn!(
                drain_timeout = ?self.config.drain_timeout,
                "In-flight probes cancelled during shutdown"
            );
        }

        if !api_failed {
            api_shutdown.cancel();
            match tokio::time::timeout(self.config.shutdown_timeout, &mut api_handle).await {
                Ok(Ok(Ok(()))) => {}
                Ok(Ok(Err(e))) => warn!(error = %e, "Query API shutdown error"),
                Ok(Err(e)) => warn!(error = %e, "Query API task failed"),
                Err(_) => {
                    warn!(
                        shutdown_timeout = ?self.config.shutdown_timeout,
                        "Query API did not stop in time, aborting"
                    );
                    api_handle.abort();
                }
            }
        }

        if let Some(recorder) = recorder {
            recorder.abort();
        }

        info!("Uptime server stopped");
        if api_failed {
            return Err("query API stopped unexpectedly".into());
        }
        Ok(())
    }
}

/// Resolves on SIGINT or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
