//! Per-policy axum middleware.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, Request, State};
use axum::http::{Extensions, HeaderMap};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::{trace, warn};

use crate::ratelimit::{AuthenticatedUser, ClientIdentity, Policy, PolicyOutcome, RateLimitRegistry};

const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";

/// State for [`enforce`]: one policy bound to a registry.
///
/// ```ignore
/// let excel = PolicyLayer::new(registry.clone(), Policy::excel_by_user());
/// let app = Router::new()
///     .route("/reports/excel", get(download))
///     .route_layer(axum::middleware::from_fn_with_state(excel, enforce));
/// ```
///
/// Heavy-operation routes name their scope here, never from the request:
///
/// ```ignore
/// let export = PolicyLayer::new(registry, Policy::heavy_operation()).with_operation("bulk_export");
/// ```
#[derive(Clone)]
pub struct PolicyLayer {
    registry: Arc<RateLimitRegistry>,
    policy: Policy,
    operation: Option<String>,
    trust_forwarded_for: bool,
}

impl PolicyLayer {
    /// Bind `policy` to `registry`.
    pub fn new(registry: Arc<RateLimitRegistry>, policy: Policy) -> Self {
        Self {
            registry,
            policy,
            operation: None,
            trust_forwarded_for: false,
        }
    }

    /// Scope heavy-operation counters to `operation` for every request on this route.
    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into()).filter(|op| !op.is_empty());
        self
    }

    /// Read the client address from `X-Forwarded-For` when present.
    pub fn trust_forwarded_for(mut self, trust: bool) -> Self {
        self.trust_forwarded_for = trust;
        self
    }

    /// The policy this layer enforces.
    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    /// The operation scope, if the route has one.
    pub fn operation(&self) -> Option<&str> {
        self.operation.as_deref()
    }
}

/// Forward the request, or answer 429 without calling the inner service.
pub async fn enforce(State(layer): State<PolicyLayer>, request: Request, next: Next) -> Response {
    let mut identity = identity_from_parts(
        request.headers(),
        request.extensions(),
        layer.trust_forwarded_for,
    );
    if let Some(operation) = &layer.operation {
        identity = identity.with_operation(operation.clone());
    }

    match layer.policy.evaluate(&layer.registry, &identity) {
        PolicyOutcome::Proceed { remaining } => {
            trace!(policy = %layer.policy.kind(), remaining, "Request admitted");
            next.run(request).await
        }
        PolicyOutcome::Reject(rejection) => {
            warn!(
                policy = %layer.policy.kind(),
                client = %identity.ip(),
                path = %request.uri().path(),
                retry_after = rejection.retry_after,
                "Request rejected by rate limit"
            );
            rejection.into_response()
        }
    }
}

/// Build a [`ClientIdentity`] from request headers and extensions.
///
/// The address comes from `ConnectInfo`, or from the first `X-Forwarded-For`
/// entry when `trust_forwarded_for` is set. An upstream auth layer may have
/// inserted an [`AuthenticatedUser`] extension.
pub fn identity_from_parts(
    headers: &HeaderMap,
    extensions: &Extensions,
    trust_forwarded_for: bool,
) -> ClientIdentity {
    let forwarded = trust_forwarded_for
        .then(|| forwarded_client(headers))
        .flatten();
    let connected = || {
        extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string())
    };

    let mut identity = match forwarded.or_else(connected) {
        Some(ip) => ClientIdentity::from_ip(ip),
        None => ClientIdentity::unknown(),
    };

    if let Some(user) = extensions.get::<AuthenticatedUser>() {
        identity = identity.with_user(user.clone());
    }

    identity
}

fn forwarded_client(headers: &HeaderMap) -> Option<String> {
    headers
        .get(FORWARDED_FOR_HEADER)?
        .to_str()
        .ok()?
        .split(',')
        .map(str::trim)
        .find(|v| !v.is_empty())
        .map(str::to_string)
}
