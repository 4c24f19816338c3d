use axum::{
    extract::{OriginalUri, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::{error, warn};

use crate::error::GuardError;
use crate::metrics::{ADMIN_DENIED_TOTAL, RATE_LIMITED_TOTAL, REQUEST_TOTAL};
use crate::rate_limit::{headers_for, rate_limit_key};
use crate::state::{AppState, GLOBAL_TIER};

// Path as the client sent it, even inside nested routers
fn request_path(request: &Request) -> String {
    request
        .extensions()
        .get::<OriginalUri>()
        .map(|uri| uri.0.path().to_string())
        .unwrap_or_else(|| request.uri().path().to_string())
}

/// Per-client ceiling across every route. Runs first.
pub async fn global_rate_limit(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    REQUEST_TOTAL.inc();

    let ip = state.ip_resolver.ip_from_headers(request.headers());
    let decision = state.global.check_limit(&rate_limit_key(GLOBAL_TIER, "all", &ip));

    if !decision.ok {
        RATE_LIMITED_TOTAL.with_label_values(&[GLOBAL_TIER]).inc();
        warn!(
            target: "audit",
            action = "rate_limited",
            tier = GLOBAL_TIER,
            ip = %ip,
            path = %request_path(&request),
            retry_after = decision.retry_after,
            "Global rate limit exceeded"
        );
        return GuardError::RateLimited { decision }.into_response();
    }

    next.run(request).await
}

/// Shared-secret check for admin-scoped paths, before any tier limit is counted.
pub async fn admin_auth(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, GuardError> {
    let path = request_path(&request);
    if !state.is_admin_path(&path) {
        return Ok(next.run(request).await);
    }

    if let Err(err) = state.guard.require_admin(request.headers()) {
        ADMIN_DENIED_TOTAL.with_label_values(&[err.kind()]).inc();
        let ip = state.ip_resolver.ip_from_headers(request.headers());
        match err {
            GuardError::Misconfigured => error!(
                target: "audit",
                action = "admin.access.denied",
                reason = err.kind(),
                path = %path,
                ip = %ip,
                "Admin secret is not configured, refusing admin request"
            ),
            _ => warn!(
                target: "audit",
                action = "admin.access.denied",
                reason = err.kind(),
                path = %path,
                ip = %ip,
                "Admin access denied"
            ),
        }
        return Err(err);
    }

    Ok(next.run(request).await)
}

/// Route-tier limit for `/api` paths. Admitted responses get the
/// `X-RateLimit-*` headers of the decision.
pub async fn tier_rate_limit(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let path = request_path(&request);
    let Some(tier) = state.tier_for(&path) else {
        return next.run(request).await;
    };

    let ip = state.ip_resolver.ip_from_headers(request.headers());
    let decision = tier.limiter.check_limit(&rate_limit_key(&tier.name, &path, &ip));

    if !decision.ok {
        RATE_LIMITED_TOTAL.with_label_values(&[tier.name.as_str()]).inc();
        warn!(
            target: "audit",
            action = "rate_limited",
            tier = %tier.name,
            ip = %ip,
            path = %path,
            limit = decision.limit,
            retry_after = decision.retry_after,
            "Route rate limit exceeded"
        );
        return GuardError::RateLimited { decision }.into_response();
    }

    let mut response = next.run(request).await;
    response.headers_mut().extend(headers_for(&decision));
    response
}
