//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check the upstream origin is an absolute http(s) URL
//! - Check the mount prefix and bind address are usable
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use thiserror::Error;
use url::Url;

use crate::config::schema::GatewayConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("upstream.origin `{0}` is not an absolute URL")]
    InvalidOrigin(String),

    #[error("upstream.origin `{0}` must use http or https")]
    UnsupportedScheme(String),

    #[error("upstream.origin `{0}` must not carry a query or fragment")]
    OriginHasQuery(String),

    #[error("upstream.mount_prefix `{0}` must start with `/`")]
    InvalidMountPrefix(String),

    #[error("listener.bind_address `{0}` is not a socket address")]
    InvalidBindAddress(String),

    #[error("observability.metrics_address `{0}` is not a socket address")]
    InvalidMetricsAddress(String),

    #[error("limits.max_body_bytes must be greater than zero")]
    ZeroBodyLimit,

    #[error("timeouts.request_secs must be greater than zero when set")]
    ZeroTimeout,
}

/// Validate a configuration, collecting every error.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let origin = &config.upstream.origin;
    match Url::parse(origin) {
        Ok(url) => {
            if !matches!(url.scheme(), "http" | "https") {
                errors.push(ValidationError::UnsupportedScheme(origin.clone()));
            }
            if url.query().is_some() || url.fragment().is_some() {
                errors.push(ValidationError::OriginHasQuery(origin.clone()));
            }
        }
        Err(_) => errors.push(ValidationError::InvalidOrigin(origin.clone())),
    }

    if !config.upstream.mount_prefix.starts_with('/') {
        errors.push(ValidationError::InvalidMountPrefix(
            config.upstream.mount_prefix.clone(),
        ));
    }

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if config.limits.max_body_bytes == 0 {
        errors.push(ValidationError::ZeroBodyLimit);
    }

    if config.timeouts.request_secs == Some(0) {
        errors.push(ValidationError::ZeroTimeout);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
