//! Structured logging.
//!
//! # Responsibilities
//! - Initialize logging subsystem
//! - Configure log level from config, overridable at runtime via `RUST_LOG`
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - The server logs to stdout; the CLI logs to stderr so reports stay clean

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, util::TryInitError, EnvFilter};

/// Filter for this crate and tower_http at `log_level`, unless `RUST_LOG` is set.
pub fn env_filter(log_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("gym_gateway={},tower_http={}", log_level, log_level))
    })
}

/// Initialize the global subscriber writing to stdout.
pub fn init(log_level: &str) -> Result<(), TryInitError> {
    tracing_subscriber::registry()
        .with(env_filter(log_level))
        .with(tracing_subscriber::fmt::layer())
        .try_init()
}

/// Initialize the global subscriber writing to stderr.
pub fn init_stderr(log_level: &str) -> Result<(), TryInitError> {
    tracing_subscriber::registry()
        .with(env_filter(log_level))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()
}
