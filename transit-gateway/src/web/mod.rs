//! HTTP transport for the gateway.
//!
//! A thin layer over the resolvers: each request gets its own
//! [`RequestContext`](crate::request::RequestContext), and each handler
//! walks the resolver tree for one fixed selection.

mod dto;
mod error;
mod middleware;
mod routes;
mod state;

pub use dto::*;
pub use error::AppError;
pub use middleware::{HEADER_USER_NAME, HEADER_USER_ROLES, caller_from_headers};
pub use routes::create_router;
pub use state::AppState;
