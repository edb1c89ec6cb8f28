//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, trace span)
//!     → request.rs (request ID generation/lookup)
//!     → forward.rs (target URL, body policy, single upstream call)
//!     → response.rs (relay status/body, gateway header set, failure body)
//!     → Send to client
//! ```

pub mod forward;
pub mod request;
pub mod response;
pub mod server;

pub use forward::{build_target_url, ForwardError, ForwardMethod, Forwarder, InboundRequest, UpstreamBody};
pub use request::X_REQUEST_ID;
pub use server::{AppState, GatewayServer, ServerError};
