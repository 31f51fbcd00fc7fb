//! Horizon HTTP API
//!
//! A thin axum layer over [`horizon_core::GraphService`]. Handlers translate
//! requests into service calls and service errors into [`HttpError`] responses;
//! all graph consistency work happens in the core crate.
//!
//! # Caller identity
//!
//! The acting user is read from the `x-user-id` header, which is expected to be
//! set by a trusted upstream. Requests without it run as the system user and
//! bypass workspace access checks.
//!
//! # Usage
//!
//! ```bash
//! HORIZON_DB_PATH=memory cargo run --bin horizon-server
//! ```

use axum::{http::HeaderMap, Router};
use horizon_core::GraphService;
use tower_http::trace::TraceLayer;

pub mod config;
mod http_error;
mod node_endpoints;
mod workspace_endpoints;

pub use config::{ServerConfig, StoreLocation};
pub use http_error::HttpError;

/// Header carrying the acting user id
pub const USER_ID_HEADER: &str = "x-user-id";

/// Application state shared across all endpoints
#[derive(Clone)]
pub struct AppState {
    pub service: GraphService,
}

impl AppState {
    pub fn new(service: GraphService) -> Self {
        Self { service }
    }

    /// The service scoped to the caller named in the request headers
    pub(crate) fn service_for(&self, headers: &HeaderMap) -> GraphService {
        match headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|id| !id.is_empty())
        {
            Some(user_id) => self.service.with_actor(user_id),
            None => self.service.clone(),
        }
    }
}

/// Create the application router with all endpoint modules
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(workspace_endpoints::routes(state.clone()))
        .merge(node_endpoints::routes(state))
        .layer(TraceLayer::new_for_http())
}
