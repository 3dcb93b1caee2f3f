//! # Configuration Validation
//!
//! Provides validation for all configuration structures using the `validator` crate.

use crate::config::Config;
use validator::Validate;

/// Validate configuration structure.
///
/// ## Usage
/// ```rust,no_run
/// use config::{Config, validate};
///
/// let config = Config::default();
/// match validate(&config) {
///     Ok(()) => println!("Configuration is valid"),
///     Err(errors) => println!("Validation errors: {:?}", errors),
/// }
/// ```
///
/// ## Validation Rules
/// ### Server
/// - `host`: 1-255 characters
/// - `port`: 1-65535
/// - `max_upload_bytes`: at least 1024
///
/// ### Provider
/// - `base_url`, `model`: non-empty
/// - `temperature`: 0.0-2.0
/// - `request_timeout_secs`: 1-600
///
/// ### Analysis
/// - `reserved_tokens` < `max_tokens`
/// - `max_retries`: 1-20
/// - `max_backoff_ms` >= `backoff_base_ms`
/// - `top_n`: 1-10
/// - `encoding`: "cl100k_base", "o200k_base" or "heuristic"
///
/// ### Observability
/// - `logging_level`: must be "trace", "debug", "info", "warn", or "error"
pub fn validate(config: &Config) -> Result<(), validator::ValidationErrors> {
    config.validate()
}
