//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Gateway handler and client produce:
//!     → logging.rs (structured log events, request ID as a field)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout/stderr)
//!     → Metrics endpoint (Prometheus scrape)
//! ```

pub mod logging;
pub mod metrics;
