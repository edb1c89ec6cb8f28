//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::config::schema::GatewayConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Environment variable overriding `upstream.origin`.
pub const ENV_UPSTREAM: &str = "GYM_GATEWAY_UPSTREAM";
/// Environment variable overriding `listener.bind_address`.
pub const ENV_BIND: &str = "GYM_GATEWAY_BIND";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file, then apply environment
/// overrides.
pub fn load_config(path: &Path) -> Result<GatewayConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content, env_lookup)
}

/// Build the configuration without a file: defaults plus environment
/// overrides.
pub fn load_from_env() -> Result<GatewayConfig, ConfigError> {
    finish(GatewayConfig::default(), env_lookup)
}

/// Parse TOML text, apply overrides from `lookup`, and validate.
pub fn parse_config<F>(content: &str, lookup: F) -> Result<GatewayConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let config: GatewayConfig = toml::from_str(content)?;
    finish(config, lookup)
}

fn finish<F>(mut config: GatewayConfig, lookup: F) -> Result<GatewayConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    apply_overrides(&mut config, lookup);
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Apply environment overrides. Empty values are ignored.
pub fn apply_overrides<F>(config: &mut GatewayConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(origin) = lookup(ENV_UPSTREAM).filter(|v| !v.is_empty()) {
        config.upstream.origin = origin;
    }
    if let Some(bind) = lookup(ENV_BIND).filter(|v| !v.is_empty()) {
        config.listener.bind_address = bind;
    }
}

fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key).ok()
}
