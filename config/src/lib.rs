//! # Configuration System
//!
//! Centralized configuration management for the sentiment analysis service.
//!
//! This crate provides:
//! - Configuration structures for the server, provider, analysis pipeline
//!   and observability
//! - Environment variable loading (12-factor app principles, `.env` aware)
//! - Configuration file loading (TOML/YAML)
//! - Configuration precedence (env > file > defaults)
//! - Configuration validation

pub mod config;
pub mod file_loader;
pub mod loader;
pub mod precedence;
pub mod validation;

use std::path::{Path, PathBuf};

pub use config::{AnalysisConfig, Config, ObservabilityConfig, ProviderConfig, ServerConfig};
pub use file_loader::{ConfigFileError, load_from_file, load_from_toml, load_from_yaml};
pub use loader::{EnvOverrides, EnvVarError, load_from_env};
pub use precedence::merge_configs;
pub use validation::validate;

/// Environment variable naming an optional TOML/YAML configuration file.
pub const CONFIG_FILE_ENV: &str = "SENTIMENT_CONFIG_FILE";

/// Errors produced while assembling the effective configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error(transparent)]
    File(#[from] ConfigFileError),

    #[error("Failed to read environment: {0}")]
    Environment(#[from] EnvVarError),

    #[error("Failed to load .env file: {0}")]
    Dotenv(#[from] dotenvy::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(#[from] validator::ValidationErrors),
}

/// Loads the effective configuration.
///
/// Reads `.env` (if present; a malformed one is an error), then the file named
/// by `SENTIMENT_CONFIG_FILE`
/// (if set), then environment variables, merges them by precedence and
/// validates the result.
pub fn load() -> Result<Config, ConfigError> {
    load_dotenv(Path::new(".env"))?;

    let file_path = std::env::var(CONFIG_FILE_ENV).ok().map(PathBuf::from);
    load_with_file(file_path.as_deref())
}

/// Same as [`load`] with an explicit configuration file path.
pub fn load_with_file(path: Option<&Path>) -> Result<Config, ConfigError> {
    let file_config = path.map(load_from_file).transpose()?;
    let env_overrides = EnvOverrides::from_env()?;

    let config = merge_configs(Config::default(), file_config, "file", &env_overrides, "env");
    validate(&config)?;

    Ok(config)
}

/// Loads variables from a dotenv file; a missing file is not an error.
///
/// Returns whether the file was applied.
fn load_dotenv(path: &Path) -> Result<bool, ConfigError> {
    match dotenvy::from_path(path) {
        Ok(()) => Ok(true),
        Err(e) if e.not_found() => Ok(false),
        Err(e) => Err(ConfigError::Dotenv(e)),
    }
}
