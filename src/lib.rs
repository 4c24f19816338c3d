//! Rate limiting and shared-secret admin authentication for internal API
//! routes.
//!
//! A request passes three gates in order: the per-client global limit, the
//! admin guard (admin-scoped paths only), and the route-tier limit (`/api`
//! paths only). All counters are in-memory and process-local.

pub mod admin;
pub mod client_ip;
pub mod clock;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod rate_limit;
pub mod state;
pub mod sweeper;

use axum::{
    Router, middleware as axum_middleware,
    routing::{any, delete, get},
};
use std::sync::Arc;

use crate::handlers::{
    api_handler, health_handler, list_rate_limits, metrics_handler, reset_rate_limit,
};
use crate::middleware::{admin_auth, global_rate_limit, tier_rate_limit};
use crate::state::AppState;

// Layers run bottom-up: global limit, then admin guard, then tier limit
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .route("/api/admin/rate-limits", get(list_rate_limits))
        .route("/api/admin/rate-limits/{key}", delete(reset_rate_limit))
        .route("/api/{*path}", any(api_handler))
        .layer(axum_middleware::from_fn_with_state(state.clone(), tier_rate_limit))
        .layer(axum_middleware::from_fn_with_state(state.clone(), admin_auth))
        .layer(axum_middleware::from_fn_with_state(state.clone(), global_rate_limit))
        .with_state(state)
}
