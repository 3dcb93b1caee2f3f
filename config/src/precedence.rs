//! # Configuration Precedence
//!
//! Merges configuration from multiple sources with precedence rules.
//!
//! # Precedence Order
//! 1. Environment variables (highest priority)
//! 2. Configuration file
//! 3. Default values (lowest priority)
//!
//! A file only overrides a field when its value differs from the built-in
//! default, so a file that omits a section never resets what a lower source
//! set. Environment overrides apply whenever the variable is set.

use std::fmt::Debug;

use crate::config::{AnalysisConfig, Config, ObservabilityConfig, ProviderConfig, ServerConfig};
use crate::loader::{
    AnalysisOverrides, EnvOverrides, ObservabilityOverrides, ProviderOverrides, ServerOverrides,
};

/// Merge multiple configuration sources with precedence.
///
/// ## Usage
/// ```rust,no_run
/// use config::{Config, EnvOverrides, merge_configs, load_from_file};
/// use std::path::Path;
///
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let defaults = Config::default();
///     let from_file = load_from_file(Path::new("sentiment.toml"))?;
///     let from_env = EnvOverrides::from_env()?;
///
///     let _config = merge_configs(defaults, Some(from_file), "file", &from_env, "env");
///     Ok(())
/// }
/// ```
pub fn merge_configs(
    defaults: Config,
    file_config: Option<Config>,
    file_source_name: &str,
    env_overrides: &EnvOverrides,
    env_source_name: &str,
) -> Config {
    let mut config = defaults;

    if let Some(file) = file_config {
        config = merge_with_logging(config, file, file_source_name);
    }
    apply_env(config, env_overrides, env_source_name)
}

/// Applies every set environment value on top of `base`.
pub fn apply_env(mut base: Config, overrides: &EnvOverrides, source_name: &str) -> Config {
    let mut changes = Vec::new();

    overlay_server(&mut base.server, &overrides.server, &mut changes);
    overlay_provider(&mut base.provider, &overrides.provider, &mut changes);
    overlay_analysis(&mut base.analysis, &overrides.analysis, &mut changes);
    overlay_observability(&mut base.observability, &overrides.observability, &mut changes);

    if !changes.is_empty() {
        tracing::info!("Configuration from {}: {:?}", source_name, changes);
    }

    base
}

fn merge_with_logging(mut base: Config, override_config: Config, source_name: &str) -> Config {
    let mut changes = Vec::new();

    merge_server(&mut base.server, &override_config.server, &mut changes);
    merge_provider(&mut base.provider, &override_config.provider, &mut changes);
    merge_analysis(&mut base.analysis, &override_config.analysis, &mut changes);
    merge_observability(
        &mut base.observability,
        &override_config.observability,
        &mut changes,
    );

    if !changes.is_empty() {
        tracing::info!("Configuration from {}: {:?}", source_name, changes);
    }

    base
}

fn set<T>(base: &mut T, candidate: Option<&T>, name: &str, changes: &mut Vec<String>)
where
    T: PartialEq + Clone + Debug,
{
    if let Some(value) = candidate.filter(|value| **value != *base) {
        changes.push(format!("{name} = {value:?}"));
        base.clone_from(value);
    }
}

fn overlay_server(base: &mut ServerConfig, over: &ServerOverrides, changes: &mut Vec<String>) {
    set(&mut base.host, over.host.as_ref(), "server.host", changes);
    set(&mut base.port, over.port.as_ref(), "server.port", changes);
    set(
        &mut base.max_upload_bytes,
        over.max_upload_bytes.as_ref(),
        "server.max_upload_bytes",
        changes,
    );
}

fn overlay_provider(base: &mut ProviderConfig, over: &ProviderOverrides, changes: &mut Vec<String>) {
    set(&mut base.base_url, over.base_url.as_ref(), "provider.base_url", changes);
    if over.api_key.is_some() && over.api_key != base.api_key {
        changes.push("provider.api_key = ***".to_string());
        base.api_key.clone_from(&over.api_key);
    }
    set(&mut base.model, over.model.as_ref(), "provider.model", changes);
    set(&mut base.temperature, over.temperature.as_ref(), "provider.temperature", changes);
    set(
        &mut base.max_output_tokens,
        over.max_output_tokens.as_ref(),
        "provider.max_output_tokens",
        changes,
    );
    set(
        &mut base.request_timeout_secs,
        over.request_timeout_secs.as_ref(),
        "provider.request_timeout_secs",
        changes,
    );
}

fn overlay_analysis(base: &mut AnalysisConfig, over: &AnalysisOverrides, changes: &mut Vec<String>) {
    set(&mut base.max_tokens, over.max_tokens.as_ref(), "analysis.max_tokens", changes);
    set(
        &mut base.reserved_tokens,
        over.reserved_tokens.as_ref(),
        "analysis.reserved_tokens",
        changes,
    );
    set(&mut base.max_retries, over.max_retries.as_ref(), "analysis.max_retries", changes);
    set(
        &mut base.backoff_base_ms,
        over.backoff_base_ms.as_ref(),
        "analysis.backoff_base_ms",
        changes,
    );
    set(
        &mut base.max_backoff_ms,
        over.max_backoff_ms.as_ref(),
        "analysis.max_backoff_ms",
        changes,
    );
    set(
        &mut base.include_top_reviews,
        over.include_top_reviews.as_ref(),
        "analysis.include_top_reviews",
        changes,
    );
    set(&mut base.top_n, over.top_n.as_ref(), "analysis.top_n", changes);
    set(&mut base.encoding, over.encoding.as_ref(), "analysis.encoding", changes);
}

fn overlay_observability(
    base: &mut ObservabilityConfig,
    over: &ObservabilityOverrides,
    changes: &mut Vec<String>,
) {
    set(
        &mut base.logging_level,
        over.logging_level.as_ref(),
        "observability.logging_level",
        changes,
    );
    set(
        &mut base.metrics_enabled,
        over.metrics_enabled.as_ref(),
        "observability.metrics_enabled",
        changes,
    );
}

fn apply<T>(base: &mut T, candidate: &T, default: &T, name: &str, changes: &mut Vec<String>)
where
    T: PartialEq + Clone + Debug,
{
    if candidate != default && candidate != base {
        changes.push(format!("{name} = {candidate:?}"));
        base.clone_from(candidate);
    }
}

fn merge_server(base: &mut ServerConfig, over: &ServerConfig, changes: &mut Vec<String>) {
    let d = ServerConfig::default();
    apply(&mut base.host, &over.host, &d.host, "server.host", changes);
    apply(&mut base.port, &over.port, &d.port, "server.port", changes);
    apply(
        &mut base.max_upload_bytes,
        &over.max_upload_bytes,
        &d.max_upload_bytes,
        "server.max_upload_bytes",
        changes,
    );
}

fn merge_provider(base: &mut ProviderConfig, over: &ProviderConfig, changes: &mut Vec<String>) {
    let d = ProviderConfig::default();
    apply(&mut base.base_url, &over.base_url, &d.base_url, "provider.base_url", changes);
    if over.api_key.is_some() && over.api_key != base.api_key {
        changes.push("provider.api_key = ***".to_string());
        base.api_key.clone_from(&over.api_key);
    }
    apply(&mut base.model, &over.model, &d.model, "provider.model", changes);
    apply(
        &mut base.temperature,
        &over.temperature,
        &d.temperature,
        "provider.temperature",
        changes,
    );
    apply(
        &mut base.max_output_tokens,
        &over.max_output_tokens,
        &d.max_output_tokens,
        "provider.max_output_tokens",
        changes,
    );
    apply(
        &mut base.request_timeout_secs,
        &over.request_timeout_secs,
        &d.request_timeout_secs,
        "provider.request_timeout_secs",
        changes,
    );
}

fn merge_analysis(base: &mut AnalysisConfig, over: &AnalysisConfig, changes: &mut Vec<String>) {
    let d = AnalysisConfig::default();
    apply(&mut base.max_tokens, &over.max_tokens, &d.max_tokens, "analysis.max_tokens", changes);
    apply(
        &mut base.reserved_tokens,
        &over.reserved_tokens,
        &d.reserved_tokens,
        "analysis.reserved_tokens",
        changes,
    );
    apply(
        &mut base.max_retries,
        &over.max_retries,
        &d.max_retries,
        "analysis.max_retries",
        changes,
    );
    apply(
        &mut base.backoff_base_ms,
        &over.backoff_base_ms,
        &d.backoff_base_ms,
        "analysis.backoff_base_ms",
        changes,
    );
    apply(
        &mut base.max_backoff_ms,
        &over.max_backoff_ms,
        &d.max_backoff_ms,
        "analysis.max_backoff_ms",
        changes,
    );
    apply(
        &mut base.include_top_reviews,
        &over.include_top_reviews,
        &d.include_top_reviews,
        "analysis.include_top_reviews",
        changes,
    );
    apply(&mut base.top_n, &over.top_n, &d.top_n, "analysis.top_n", changes);
    apply(&mut base.encoding, &over.encoding, &d.encoding, "analysis.encoding", changes);
}

fn merge_observability(
    base: &mut ObservabilityConfig,
    over: &ObservabilityConfig,
    changes: &mut Vec<String>,
) {
    let d = ObservabilityConfig::default();
    apply(
        &mut base.logging_level,
        &over.logging_level,
        &d.logging_level,
        "observability.logging_level",
        changes,
    );
    apply(
        &mut base.metrics_enabled,
        &over.metrics_enabled,
        &d.metrics_enabled,
        "observability.metrics_enabled",
        changes,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_overrides_file() {
        let mut file = Config::default();
        file.provider.model = "from-file".to_string();
        file.server.port = 8100;

        let mut env = EnvOverrides::default();
        env.provider.model = Some("from-env".to_string());

        let merged = merge_configs(Config::default(), Some(file), "file", &env, "env");
        assert_eq!(merged.provider.model, "from-env");
        assert_eq!(merged.server.port, 8100);
    }

    #[test]
    fn test_env_default_value_wins_over_file() {
        let mut file = Config::default();
        file.analysis.include_top_reviews = false;
        file.analysis.max_retries = 2;

        let mut env = EnvOverrides::default();
        env.analysis.include_top_reviews = Some(true);
        env.analysis.max_retries = Some(5);

        let merged = merge_configs(Config::default(), Some(file), "file", &env, "env");
        assert!(merged.analysis.include_top_reviews);
        assert_eq!(merged.analysis.max_retries, 5);
    }

    #[test]
    fn test_unset_env_does_not_reset() {
        let mut file = Config::default();
        file.analysis.max_retries = 2;

        let merged = merge_configs(
            Config::default(),
            Some(file),
            "file",
            &EnvOverrides::default(),
            "env",
        );
        assert_eq!(merged.analysis.max_retries, 2);
    }

    #[test]
    fn test_missing_file_keeps_defaults() {
        let merged = merge_configs(Config::default(), None, "file", &EnvOverrides::default(), "env");
        assert_eq!(merged, Config::default());
    }

    #[test]
    fn test_api_key_only_replaced_when_present() {
        let mut file = Config::default();
        file.provider.api_key = Some("file-key".to_string());

        let merged = merge_configs(
            Config::default(),
            Some(file),
            "file",
            &EnvOverrides::default(),
            "env",
        );
        assert_eq!(merged.provider.api_key.as_deref(), Some("file-key"));

        let mut env = EnvOverrides::default();
        env.provider.api_key = Some("env-key".to_string());
        let merged = merge_configs(merged, None, "file", &env, "env");
        assert_eq!(merged.provider.api_key.as_deref(), Some("env-key"));
    }
}
