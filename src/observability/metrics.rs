//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define gateway metrics (requests, latency, upstream failures)
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by method, status
//! - `gateway_request_duration_seconds` (histogram): latency by method
//! - `gateway_upstream_failures_total` (counter): failed upstream attempts by kind
//!
//! # Design Decisions
//! - Recording is a no-op until a recorder is installed, so tests and the CLI
//!   never need one
//! - Labels kept low-cardinality: no paths, no upstream URLs

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use std::net::SocketAddr;
use std::time::Instant;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

/// Record one finished gateway request.
pub fn record_request(method: &str, status: u16, start: Instant) {
    ::metrics::counter!(
        "gateway_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    ::metrics::histogram!(
        "gateway_request_duration_seconds",
        "method" => method.to_string()
    )
    .record(start.elapsed().as_secs_f64());
}

/// Record a failed upstream attempt.
pub fn record_upstream_failure(kind: &'static str) {
    ::metrics::counter!("gateway_upstream_failures_total", "kind" => kind).increment(1);
}
