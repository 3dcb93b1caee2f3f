//! # Environment Variable Loader
//!
//! Loads configuration from environment variables following 12-factor app
//! principles.
//!
//! # Naming Convention
//! - `SA_*`: HTTP server settings
//! - `LLM_*`: Completion provider settings (`GROQ_API_KEY` is accepted as a
//!   fallback for the API key)
//! - `AN_*`: Chunking, retry and aggregation settings
//! - `OB_*`: Observability settings
//!
//! Only variables that are actually set end up in [`EnvOverrides`], so a
//! variable holding the default value still wins over a config file.

use crate::config::Config;
use std::env;
use std::str::FromStr;

/// A set environment variable whose value could not be used.
#[derive(Debug, thiserror::Error)]
#[error("Invalid value {value:?} for {key}: {reason}")]
pub struct EnvVarError {
    pub key: &'static str,
    pub value: String,
    pub reason: String,
}

/// Server settings present in the environment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServerOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub max_upload_bytes: Option<usize>,
}

/// Provider settings present in the environment.
#[derive(Clone, Default, PartialEq)]
pub struct ProviderOverrides {
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub max_output_tokens: Option<u32>,
    pub request_timeout_secs: Option<u64>,
}

impl std::fmt::Debug for ProviderOverrides {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderOverrides")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_output_tokens", &self.max_output_tokens)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

/// Analysis settings present in the environment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnalysisOverrides {
    pub max_tokens: Option<usize>,
    pub reserved_tokens: Option<usize>,
    pub max_retries: Option<u32>,
    pub backoff_base_ms: Option<u64>,
    pub max_backoff_ms: Option<u64>,
    pub include_top_reviews: Option<bool>,
    pub top_n: Option<usize>,
    pub encoding: Option<String>,
}

/// Observability settings present in the environment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObservabilityOverrides {
    pub logging_level: Option<String>,
    pub metrics_enabled: Option<bool>,
}

/// Configuration values taken from the environment, `None` where unset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnvOverrides {
    pub server: ServerOverrides,
    pub provider: ProviderOverrides,
    pub analysis: AnalysisOverrides,
    pub observability: ObservabilityOverrides,
}

impl EnvOverrides {
    /// Reads every supported variable from the process environment.
    pub fn from_env() -> Result<Self, EnvVarError> {
        Ok(Self {
            server: ServerOverrides {
                host: read_var("SA_HOST")?,
                port: parse_env("SA_PORT")?,
                max_upload_bytes: parse_env("SA_MAX_UPLOAD_BYTES")?,
            },
            provider: ProviderOverrides {
                base_url: read_var("LLM_BASE_URL")?,
                api_key: read_var("LLM_API_KEY")?
                    .or(read_var("GROQ_API_KEY")?)
                    .filter(|key| !key.trim().is_empty()),
                model: read_var("LLM_MODEL")?,
                temperature: parse_env("LLM_TEMPERATURE")?,
                max_output_tokens: parse_env("LLM_MAX_OUTPUT_TOKENS")?,
                request_timeout_secs: parse_env("LLM_REQUEST_TIMEOUT_SECS")?,
            },
            analysis: AnalysisOverrides {
                max_tokens: parse_env("AN_MAX_TOKENS")?,
                reserved_tokens: parse_env("AN_RESERVED_TOKENS")?,
                max_retries: parse_env("AN_MAX_RETRIES")?,
                backoff_base_ms: parse_env("AN_BACKOFF_BASE_MS")?,
                max_backoff_ms: parse_env("AN_MAX_BACKOFF_MS")?,
                include_top_reviews: parse_env("AN_INCLUDE_TOP_REVIEWS")?,
                top_n: parse_env("AN_TOP_N")?,
                encoding: read_var("AN_ENCODING")?,
            },
            observability: ObservabilityOverrides {
                logging_level: read_var("OB_LOGGING_LEVEL")?,
                metrics_enabled: parse_env("OB_METRICS_ENABLED")?,
            },
        })
    }
}

/// Load configuration from environment variables.
///
/// Unset variables fall back to the defaults of [`Config::default`]; a set
/// variable that does not parse is an error naming the variable.
///
/// ## Usage
/// ```rust,no_run
/// use config::load_from_env;
///
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = load_from_env()?;
///     println!("Listening on port {}", config.server.port);
///     Ok(())
/// }
/// ```
///
/// ## Environment Variables
/// ### Server Settings (`SA_*`)
/// - `SA_HOST`: Bind host (default: "0.0.0.0")
/// - `SA_PORT`: Bind port (default: 8000)
/// - `SA_MAX_UPLOAD_BYTES`: Request body limit (default: 10 MiB)
///
/// ### Provider Settings (`LLM_*`)
/// - `LLM_BASE_URL`: Chat completion base URL (default: Groq's OpenAI endpoint)
/// - `LLM_API_KEY` / `GROQ_API_KEY`: Bearer token
/// - `LLM_MODEL`: Model identifier (default: "mixtral-8x7b-32768")
/// - `LLM_TEMPERATURE`: Sampling temperature (default: 0.0)
/// - `LLM_MAX_OUTPUT_TOKENS`: Completion length limit (default: 2000)
/// - `LLM_REQUEST_TIMEOUT_SECS`: Per-call timeout (default: 60)
///
/// ### Analysis Settings (`AN_*`)
/// - `AN_MAX_TOKENS`: Model context window (default: 32768)
/// - `AN_RESERVED_TOKENS`: Tokens reserved for prompt and response (default: 2000)
/// - `AN_MAX_RETRIES`: Attempts per chunk (default: 5)
/// - `AN_BACKOFF_BASE_MS`: First backoff delay (default: 1000)
/// - `AN_MAX_BACKOFF_MS`: Backoff cap (default: 60000)
/// - `AN_INCLUDE_TOP_REVIEWS`: Emit top reviews per label (default: true)
/// - `AN_TOP_N`: Top reviews per label (default: 3)
/// - `AN_ENCODING`: Token encoding (default: "cl100k_base")
///
/// ### Observability Settings (`OB_*`)
/// - `OB_LOGGING_LEVEL`: Logging level (default: "info")
/// - `OB_METRICS_ENABLED`: Prometheus export (default: true)
pub fn load_from_env() -> Result<Config, EnvVarError> {
    let overrides = EnvOverrides::from_env()?;
    Ok(crate::precedence::apply_env(Config::default(), &overrides, "env"))
}

fn read_var(key: &'static str) -> Result<Option<String>, EnvVarError> {
    match env::var(key) {
        Ok(value) => Ok(Some(value)),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(env::VarError::NotUnicode(raw)) => Err(EnvVarError {
            key,
            value: raw.to_string_lossy().into_owned(),
            reason: "not valid unicode".to_string(),
        }),
    }
}

fn parse_env<T>(key: &'static str) -> Result<Option<T>, EnvVarError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let Some(raw) = read_var(key)? else {
        return Ok(None);
    };

    raw.trim().parse::<T>().map(Some).map_err(|e| EnvVarError {
        key,
        reason: e.to_string(),
        value: raw,
    })
}
