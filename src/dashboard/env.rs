//! API base resolution.
//!
//! A dashboard served from a local host talks to the backend directly; served
//! from anywhere else it goes through the gateway path on its own origin.

use url::Url;

use crate::config::DashboardConfig;

/// Where dashboard requests go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiBase {
    /// Absolute backend address.
    Direct(String),
    /// Path on the site origin routed to the gateway.
    Gateway(String),
}

impl ApiBase {
    /// Absolute base URL for a dashboard served from `site`.
    pub fn endpoint(&self, site: &Url) -> Result<Url, url::ParseError> {
        match self {
            ApiBase::Direct(base) => Url::parse(base),
            ApiBase::Gateway(path) => site.join(path),
        }
    }

    pub fn is_direct(&self) -> bool {
        matches!(self, ApiBase::Direct(_))
    }
}

/// Host names are compared ASCII case-insensitively.
pub fn is_local_host(host: &str, local_hosts: &[String]) -> bool {
    local_hosts.iter().any(|h| h.eq_ignore_ascii_case(host))
}

/// Pick the API base for a dashboard running on `host`.
pub fn resolve_api_base(host: &str, config: &DashboardConfig) -> ApiBase {
    if is_local_host(host, &config.local_hosts) {
        ApiBase::Direct(config.local_api_base.clone())
    } else {
        ApiBase::Gateway(config.gateway_path.clone())
    }
}
