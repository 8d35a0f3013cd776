//! Admission-check and introspection endpoints.

use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use super::AppState;
use crate::ratelimit::{
    AuthenticatedUser, ClientIdentity, PolicyKind, PolicyOutcome, RateLimitStats, ReclaimReport,
};

/// Body of `POST /v1/ratelimit/check`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckRequest {
    /// Which policy to apply
    pub policy: PolicyKind,
    /// Client address; missing or empty means `unknown`
    #[serde(default)]
    pub ip: Option<String>,
    /// Authenticated user, if any
    #[serde(default)]
    pub user: Option<AuthenticatedUser>,
    /// Heavy-operation scope
    #[serde(default)]
    pub operation: Option<String>,
}

impl CheckRequest {
    fn identity(&self) -> ClientIdentity {
        let mut identity = match &self.ip {
            Some(ip) => ClientIdentity::from_ip(ip.clone()),
            None => ClientIdentity::unknown(),
        };
        if let Some(user) = &self.user {
            identity = identity.with_user(user.clone());
        }
        if let Some(operation) = &self.operation {
            identity = identity.with_operation(operation.clone());
        }
        identity
    }
}

/// Body returned when a check is admitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResponse {
    /// Always `true`; denials use the 429 body instead
    pub success: bool,
    /// Requests still admissible in the current window
    pub remaining: u32,
}

/// Body of `GET /health`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// `ok` while the service is serving
    pub status: &'static str,
    /// Current counter snapshot
    pub rate_limits: RateLimitStats,
    /// Outcome of the most recent reclaim pass, if one has run
    pub last_reclaim: Option<ReclaimReport>,
}

/// Routes served by the standalone service.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/v1/ratelimit/check", post(check))
        .route("/v1/ratelimit/stats", get(stats))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Count one request for the caller's client and answer allow or 429.
async fn check(State(state): State<AppState>, Json(request): Json<CheckRequest>) -> Response {
    let identity = request.identity();
    let policy = state.policies.get(request.policy);

    match policy.evaluate(&state.registry, &identity) {
        PolicyOutcome::Proceed { remaining } => {
            debug!(policy = %request.policy, client = %identity.ip(), remaining, "Admission granted");
            Json(CheckResponse {
                success: true,
                remaining,
            })
            .into_response()
        }
        PolicyOutcome::Reject(rejection) => {
            info!(
                policy = %request.policy,
                client = %identity.ip(),
                retry_after = rejection.retry_after,
                "Admission denied"
            );
            rejection.into_response()
        }
    }
}

async fn stats(State(state): State<AppState>) -> Json<RateLimitStats> {
    Json(state.registry.stats())
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        rate_limits: state.registry.stats(),
        last_reclaim: state.registry.last_reclaim(),
    })
}
