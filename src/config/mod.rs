//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML) + GYM_GATEWAY_* environment
//!     → loader.rs (parse, deserialize, apply overrides)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → shared via Arc to the gateway state
//!
//! On file change (--watch):
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → atomic swap of the gateway state snapshot
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, load_from_env, ConfigError};
pub use schema::{
    CorsConfig, DashboardConfig, GatewayConfig, LimitsConfig, ListenerConfig,
    ObservabilityConfig, TimeoutConfig, UpstreamConfig,
};
