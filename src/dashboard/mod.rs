//! Member dashboard client.
//!
//! # Data Flow
//! ```text
//! site host
//!     → env.rs (direct backend address or gateway path)
//!     → api.rs (typed fetches, optional per-resource dedup)
//!     → scope.rs (results dropped once the view is gone)
//!     → views.rs (login, dashboard, billing, admin derivations)
//!     → render.rs (terminal text)
//! ```
//!
//! # Design Decisions
//! - One `ApiClient` is shared by every view instead of each view holding
//!   its own base URL
//! - Views never fail as a whole; a failed section is logged and left empty

pub mod api;
pub mod env;
pub mod render;
pub mod scope;
pub mod types;
pub mod views;

pub use api::{ApiClient, ApiError, Resource};
pub use env::{resolve_api_base, ApiBase};
pub use scope::ViewScope;
pub use views::{login, AdminView, BillingView, DashboardView, LoginError, PlanAction};
