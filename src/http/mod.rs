//! HTTP surface: an axum middleware for in-process use and an admission-check
//! API for callers running in other processes.

mod api;
mod middleware;
mod server;

use std::sync::Arc;

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::ratelimit::{PolicySet, RateLimitRegistry, Rejection};

pub use api::{router, CheckRequest, CheckResponse, HealthResponse};
pub use middleware::{enforce, identity_from_parts, PolicyLayer};
pub use server::HttpServer;

/// State shared by the API handlers.
#[derive(Clone)]
pub struct AppState {
    /// Counter stores
    pub registry: Arc<RateLimitRegistry>,
    /// Configured policies
    pub policies: Arc<PolicySet>,
}

impl AppState {
    /// Bundle a registry with its policies.
    pub fn new(registry: Arc<RateLimitRegistry>, policies: PolicySet) -> Self {
        Self {
            registry,
            policies: Arc::new(policies),
        }
    }
}

impl IntoResponse for Rejection {
    fn into_response(self) -> Response {
        (
            StatusCode::TOO_MANY_REQUESTS,
            [(header::RETRY_AFTER, self.retry_after.to_string())],
            Json(self),
        )
            .into_response()
    }
}
