//! HTTP surface of the helpdesk: axum routes, middleware and metrics.

pub mod api;
pub mod metrics;
pub mod state;

pub use api::create_router;
pub use state::AppState;
