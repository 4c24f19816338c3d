use axum::{
    Json,
    extract::OriginalUri,
    http::Method,
};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ApiResponse {
    pub ok: bool,
    pub method: String,
    pub path: String,
}

// Stand-in for the business handlers behind the guard chain
pub async fn api_handler(
    method: Method,
    OriginalUri(uri): OriginalUri,
) -> Json<ApiResponse> {
    Json(ApiResponse {
        ok: true,
        method: method.to_string(),
        path: uri.path().to_string(),
    })
}
