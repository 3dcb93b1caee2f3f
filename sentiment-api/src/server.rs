//! Server setup and lifecycle for the sentiment API.

use std::net::SocketAddr;
use std::sync::Arc;

use config::Config;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tokio::net::TcpListener;
use tokio::signal;
use tracing_subscriber::EnvFilter;

use crate::error::{ApiError, Result};
use crate::routes::create_router;
use crate::state::AppState;

/// The sentiment analysis HTTP server.
pub struct SentimentServer {
    state: Arc<AppState>,
}

impl SentimentServer {
    /// Creates a new server instance with the given configuration.
    ///
    /// Installs the global Prometheus recorder when metrics are enabled.
    pub fn new(config: Config) -> Result<Self> {
        let metrics_handle = if config.observability.metrics_enabled {
            Some(install_metrics_recorder()?)
        } else {
            None
        };

        let state = Arc::new(AppState::new(config, metrics_handle)?);
        Ok(Self { state })
    }

    /// Runs the HTTP server until Ctrl+C or SIGTERM.
    pub async fn run(self) -> Result<()> {
        let server = &self.state.config.server;
        let addr: SocketAddr = format!("{}:{}", server.host, server.port)
            .parse()
            .map_err(|e| ApiError::Configuration(format!("Invalid address: {e}")))?;

        let router = create_router(self.state.clone());

        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| ApiError::Server(format!("Failed to bind to {addr}: {e}")))?;

        tracing::info!(
            %addr,
            model = %self.state.analyzer.client().model(),
            "Sentiment API server starting"
        );

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| ApiError::Server(format!("Server error: {e}")))?;

        tracing::info!("Sentiment API server stopped");
        Ok(())
    }
}

fn install_metrics_recorder() -> Result<PrometheusHandle> {
    PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| ApiError::Configuration(format!("Failed to install metrics recorder: {e}")))
}

/// Signal handler for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        },
        () = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown");
        },
    }
}

/// Entry point for running the server from `.env`, the optional config file
/// and environment variables.
pub async fn run_from_env() -> Result<()> {
    let config = config::load().map_err(|e| ApiError::Configuration(e.to_string()))?;

    // RUST_LOG wins over the configured level.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.observability.logging_level)),
        )
        .init();

    tracing::debug!(?config, "Loaded configuration");
    SentimentServer::new(config)?.run().await
}
