//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Upstream backend the gateway forwards to.
    pub upstream: UpstreamConfig,

    /// CORS headers attached to relayed responses.
    pub cors: CorsConfig,

    /// Inbound request limits.
    pub limits: LimitsConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// API base resolution for the dashboard client.
    pub dashboard: DashboardConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:7071").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:7071".to_string(),
        }
    }
}

/// Upstream configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Base address of the backend REST service, without a trailing slash
    /// (e.g., "http://10.0.0.4:8000").
    pub origin: String,

    /// Path prefix the gateway is mounted under. Everything after it is
    /// forwarded verbatim.
    pub mount_prefix: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            origin: "http://localhost:8000".to_string(),
            mount_prefix: "/api".to_string(),
        }
    }
}

impl UpstreamConfig {
    /// Mount prefix with any trailing slash removed. The root mount is "".
    pub fn normalized_prefix(&self) -> &str {
        self.mount_prefix.trim_end_matches('/')
    }
}

/// CORS header values for relayed responses.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct CorsConfig {
    /// Value of `Access-Control-Allow-Origin`.
    pub allow_origin: String,

    /// Value of `Access-Control-Allow-Methods`.
    pub allow_methods: String,

    /// Value of `Access-Control-Allow-Headers`.
    pub allow_headers: String,

    /// Also attach the CORS headers to the 500 "Backend connection failed"
    /// response. Off by default: that response historically carries only
    /// `Content-Type`.
    pub include_on_failure: bool,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allow_origin: "*".to_string(),
            allow_methods: "GET, POST, PUT, DELETE, OPTIONS".to_string(),
            allow_headers: "Content-Type".to_string(),
            include_on_failure: false,
        }
    }
}

/// Inbound request limits.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum inbound body size in bytes.
    pub max_body_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: 2 * 1024 * 1024, // 2MB
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Host-level request timeout in seconds. `None` leaves requests
    /// unbounded; the gateway itself never times out an upstream call.
    pub request_secs: Option<u64>,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// API base resolution used by the dashboard client.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct DashboardConfig {
    /// Direct backend address used when the dashboard runs on a local host.
    pub local_api_base: String,

    /// Gateway path, relative to the site origin, used everywhere else.
    pub gateway_path: String,

    /// Host names considered local.
    pub local_hosts: Vec<String>,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            local_api_base: "http://localhost:8000".to_string(),
            gateway_path: "/api".to_string(),
            local_hosts: vec!["localhost".to_string(), "127.0.0.1".to_string()],
        }
    }
}
