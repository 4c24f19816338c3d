use axum::{Json, extract::State, response::IntoResponse};
use std::sync::Arc;

use crate::state::AppState;

// health handler
pub async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "admin_configured": state.guard.is_configured(),
        "started_at": state.started_at.to_rfc3339(),
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}
