use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use crate::error::ErrorBody;
use crate::rate_limit::RateLimiter;
use crate::state::{AppState, GLOBAL_TIER};

#[derive(Debug, Serialize)]
pub struct LimiterSummary {
    pub tier: String,
    pub prefix: Option<String>,
    pub limit: u32,
    pub window_secs: i64,
    pub block_secs: Option<i64>,
    pub tracked_keys: usize,
}

impl LimiterSummary {
    fn new(tier: &str, prefix: Option<&str>, limiter: &RateLimiter) -> Self {
        let policy = limiter.policy();
        Self {
            tier: tier.to_string(),
            prefix: prefix.map(str::to_string),
            limit: policy.limit,
            window_secs: policy.window.num_seconds(),
            block_secs: policy.block_duration.map(|d| d.num_seconds()),
            tracked_keys: limiter.len(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RateLimitOverview {
    pub limiters: Vec<LimiterSummary>,
}

// GET /api/admin/rate-limits
pub async fn list_rate_limits(State(state): State<Arc<AppState>>) -> Json<RateLimitOverview> {
    let mut limiters = vec![LimiterSummary::new(GLOBAL_TIER, None, &state.global)];
    limiters.extend(
        state
            .tiers
            .iter()
            .map(|tier| LimiterSummary::new(&tier.name, Some(tier.prefix.as_str()), &tier.limiter)),
    );

    Json(RateLimitOverview { limiters })
}

#[derive(Debug, Serialize)]
pub struct ResetResponse {
    pub key: String,
    pub tier: String,
}

// DELETE /api/admin/rate-limits/{key}
pub async fn reset_rate_limit(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> Response {
    let cleared = state
        .limiters()
        .find(|(_, limiter)| limiter.reset(&key))
        .map(|(tier, _)| tier.to_string());

    match cleared {
        Some(tier) => {
            info!(target: "audit", action = "rate_limit.reset", tier = %tier, "Rate limit key reset by admin");
            Json(ResetResponse { key, tier }).into_response()
        }
        None => (
            StatusCode::NOT_FOUND,
            Json(ErrorBody {
                error: format!("no rate limit entry for key {:?}", key),
            }),
        )
            .into_response(),
    }
}
