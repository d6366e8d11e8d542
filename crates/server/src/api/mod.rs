pub mod audit;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod stats;
pub mod tags;
pub mod tickets;
pub mod users;
pub mod webhooks;

pub use error::{ApiError, ErrorResponse};
pub use routes::create_router;
