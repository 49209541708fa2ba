//! Application state for the web layer.

use crate::request::Services;

/// Shared application state.
///
/// Per-request state lives in the request context, not here.
#[derive(Clone)]
pub struct AppState {
    pub services: Services,
}

impl AppState {
    pub fn new(services: Services) -> Self {
        Self { services }
    }
}
