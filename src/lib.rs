//! Gym dashboard forwarding gateway library

pub mod config;
pub mod dashboard;
pub mod http;
pub mod lifecycle;
pub mod observability;

pub use config::schema::GatewayConfig;
pub use dashboard::ApiClient;
pub use http::GatewayServer;
pub use lifecycle::Shutdown;
