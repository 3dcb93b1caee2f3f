//! Application state for the sentiment API.

use std::sync::Arc;

use analysis::{LlmClient, OpenAiCompatibleClient, SentimentAnalyzer};
use config::Config;
use metrics_exporter_prometheus::PrometheusHandle;

use crate::error::{ApiError, Result};

/// Shared application state for Axum handlers.
///
/// Read-only after startup; every request works on its own reviews.
pub struct AppState {
    pub analyzer: SentimentAnalyzer<dyn LlmClient>,
    pub config: Arc<Config>,
    /// Present when the Prometheus recorder was installed.
    pub metrics_handle: Option<PrometheusHandle>,
}

impl AppState {
    /// Builds the provider client and analyzer from configuration.
    pub fn new(config: Config, metrics_handle: Option<PrometheusHandle>) -> Result<Self> {
        let client: Arc<dyn LlmClient> = Arc::new(
            OpenAiCompatibleClient::from_config(&config.provider)
                .map_err(|e| ApiError::Configuration(e.to_string()))?,
        );
        Self::with_client(client, config, metrics_handle)
    }

    /// Creates state around an existing client (useful for testing).
    pub fn with_client(
        client: Arc<dyn LlmClient>,
        config: Config,
        metrics_handle: Option<PrometheusHandle>,
    ) -> Result<Self> {
        let analyzer = SentimentAnalyzer::from_config(client, &config)
            .map_err(|e| ApiError::Configuration(e.to_string()))?;

        Ok(Self {
            analyzer,
            config: Arc::new(config),
            metrics_handle,
        })
    }
}
