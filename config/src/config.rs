//! # Configuration Structures
//!
//! This module defines all configuration structures for the sentiment
//! analysis service.
//!
//! All configuration structures:
//! - Use `serde` for serialization/deserialization
//! - Use `validator` for input validation
//! - Carry field-level defaults so partial files and environments are valid

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

/// Main configuration structure for the sentiment analysis service.
///
/// ## Usage
/// ```rust,no_run
/// use config::Config;
///
/// let config = Config::default();
/// println!("Model: {}", config.provider.model);
/// ```
///
/// ## Fields
/// - `server`: HTTP listener and upload limits
/// - `provider`: Completion provider endpoint and request parameters
/// - `analysis`: Chunking budget, retry policy and aggregation options
/// - `observability`: Logging level and metrics export
#[derive(Debug, Clone, Serialize, Deserialize, Validate, Default, PartialEq)]
pub struct Config {
    /// HTTP server configuration
    #[serde(default)]
    #[validate(nested)]
    pub server: ServerConfig,

    /// Completion provider configuration
    #[serde(default)]
    #[validate(nested)]
    pub provider: ProviderConfig,

    /// Chunking, retry and aggregation configuration
    #[serde(default)]
    #[validate(nested)]
    pub analysis: AnalysisConfig,

    /// Observability configuration (logging, metrics)
    #[serde(default)]
    #[validate(nested)]
    pub observability: ObservabilityConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct ServerConfig {
    /// Host to bind the server to
    #[serde(default = "default_server_host")]
    #[validate(length(min = 1, max = 255))]
    pub host: String,

    /// Port to bind the server to
    #[serde(default = "default_server_port")]
    #[validate(range(min = 1, max = 65535))]
    pub port: u16,

    /// Maximum accepted request body size in bytes (uploads included)
    #[serde(default = "default_max_upload_bytes")]
    #[validate(range(min = 1024))]
    pub max_upload_bytes: usize,
}

fn default_server_host() -> String {
    "0.0.0.0".to_string()
}

fn default_server_port() -> u16 {
    8000
}

fn default_max_upload_bytes() -> usize {
    10 * 1024 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_server_host(),
            port: default_server_port(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

/// Completion provider configuration.
///
/// Any OpenAI-compatible chat completion endpoint works; the default points
/// at Groq's compatibility layer.
#[derive(Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct ProviderConfig {
    /// Base URL of the chat completion API (without `/chat/completions`)
    #[serde(default = "default_provider_base_url")]
    #[validate(length(min = 1))]
    pub base_url: String,

    /// Bearer token sent with every request
    #[serde(default)]
    pub api_key: Option<String>,

    /// Model identifier
    #[serde(default = "default_provider_model")]
    #[validate(length(min = 1, max = 255))]
    pub model: String,

    /// Sampling temperature
    #[serde(default)]
    #[validate(range(min = 0.0, max = 2.0))]
    pub temperature: f32,

    /// Maximum number of tokens the provider may generate per call
    #[serde(default = "default_provider_max_output_tokens")]
    #[validate(range(min = 1))]
    pub max_output_tokens: u32,

    /// Per-request timeout in seconds
    #[serde(default = "default_provider_request_timeout_secs")]
    #[validate(range(min = 1, max = 600))]
    pub request_timeout_secs: u64,
}

fn default_provider_base_url() -> String {
    "https://api.groq.com/openai/v1".to_string()
}

fn default_provider_model() -> String {
    "mixtral-8x7b-32768".to_string()
}

fn default_provider_max_output_tokens() -> u32 {
    2000
}

fn default_provider_request_timeout_secs() -> u64 {
    60
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: default_provider_base_url(),
            api_key: None,
            model: default_provider_model(),
            temperature: 0.0,
            max_output_tokens: default_provider_max_output_tokens(),
            request_timeout_secs: default_provider_request_timeout_secs(),
        }
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_output_tokens", &self.max_output_tokens)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

/// Chunking, retry and aggregation configuration.
///
/// ## Validation
/// `reserved_tokens` must leave room for reviews: it has to be strictly
/// smaller than `max_tokens`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
#[validate(schema(function = "validate_token_budget"))]
pub struct AnalysisConfig {
    /// Context window of the target model
    #[serde(default = "default_analysis_max_tokens")]
    #[validate(range(min = 1))]
    pub max_tokens: usize,

    /// Tokens held back for the instruction header and the response
    #[serde(default = "default_analysis_reserved_tokens")]
    pub reserved_tokens: usize,

    /// Maximum number of attempts per chunk
    #[serde(default = "default_analysis_max_retries")]
    #[validate(range(min = 1, max = 20))]
    pub max_retries: u32,

    /// First backoff delay in milliseconds; doubles on every retry
    #[serde(default = "default_analysis_backoff_base_ms")]
    pub backoff_base_ms: u64,

    /// Upper bound on a single backoff delay in milliseconds
    #[serde(default = "default_analysis_max_backoff_ms")]
    pub max_backoff_ms: u64,

    /// Whether responses carry the top-scoring reviews per label
    #[serde(default = "default_analysis_include_top_reviews")]
    pub include_top_reviews: bool,

    /// Number of representative reviews kept per label
    #[serde(default = "default_analysis_top_n")]
    #[validate(range(min = 1, max = 10))]
    pub top_n: usize,

    /// Token encoding used for budgeting
    #[serde(default = "default_analysis_encoding")]
    #[validate(custom(function = "validate_encoding"))]
    pub encoding: String,
}

fn default_analysis_max_tokens() -> usize {
    32768
}

fn default_analysis_reserved_tokens() -> usize {
    2000
}

fn default_analysis_max_retries() -> u32 {
    5
}

fn default_analysis_backoff_base_ms() -> u64 {
    1000
}

fn default_analysis_max_backoff_ms() -> u64 {
    60_000
}

fn default_analysis_include_top_reviews() -> bool {
    true
}

fn default_analysis_top_n() -> usize {
    3
}

fn default_analysis_encoding() -> String {
    "cl100k_base".to_string()
}

fn validate_encoding(value: &str) -> Result<(), ValidationError> {
    match value {
        "cl100k_base" | "o200k_base" | "heuristic" => Ok(()),
        _ => Err(ValidationError::new("Invalid token encoding")),
    }
}

fn validate_token_budget(config: &AnalysisConfig) -> Result<(), ValidationError> {
    if config.reserved_tokens >= config.max_tokens {
        return Err(ValidationError::new(
            "reserved_tokens must be smaller than max_tokens",
        ));
    }
    if config.max_backoff_ms < config.backoff_base_ms {
        return Err(ValidationError::new(
            "max_backoff_ms must not be smaller than backoff_base_ms",
        ));
    }
    Ok(())
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            max_tokens: default_analysis_max_tokens(),
            reserved_tokens: default_analysis_reserved_tokens(),
            max_retries: default_analysis_max_retries(),
            backoff_base_ms: default_analysis_backoff_base_ms(),
            max_backoff_ms: default_analysis_max_backoff_ms(),
            include_top_reviews: default_analysis_include_top_reviews(),
            top_n: default_analysis_top_n(),
            encoding: default_analysis_encoding(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct ObservabilityConfig {
    /// Logging level
    #[serde(default = "default_observability_logging_level")]
    #[validate(custom(function = "validate_logging_level"))]
    pub logging_level: String,

    /// Install the Prometheus recorder and serve `/metrics`
    #[serde(default = "default_observability_metrics_enabled")]
    pub metrics_enabled: bool,
}

fn default_observability_logging_level() -> String {
    "info".to_string()
}

fn default_observability_metrics_enabled() -> bool {
    true
}

fn validate_logging_level(value: &str) -> Result<(), ValidationError> {
    match value {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ValidationError::new("Invalid logging level")),
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            logging_level: default_observability_logging_level(),
            metrics_enabled: default_observability_metrics_enabled(),
        }
    }
}
