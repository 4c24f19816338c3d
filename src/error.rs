use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::rate_limit::{RateLimitDecision, headers_for};

/// Per-request rejection produced by the admin guard or a rate limiter.
#[derive(Debug, Error)]
pub enum GuardError {
    /// No credential presented
    #[error("authentication required")]
    Unauthorized,

    /// Credential presented but wrong
    #[error("invalid admin credential")]
    Forbidden,

    /// Admin secret missing on the server, the guard refuses everything
    #[error("admin access is not configured")]
    Misconfigured,

    #[error("too many requests, retry in {} seconds", .decision.retry_after)]
    RateLimited { decision: RateLimitDecision },
}

impl GuardError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::Misconfigured => StatusCode::INTERNAL_SERVER_ERROR,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
        }
    }

    // Short label used for metrics and audit logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Unauthorized => "unauthorized",
            Self::Forbidden => "forbidden",
            Self::Misconfigured => "misconfigured",
            Self::RateLimited { .. } => "rate_limited",
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl IntoResponse for GuardError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(ErrorBody {
            error: self.to_string(),
        });

        match &self {
            Self::RateLimited { decision } => (status, headers_for(decision), body).into_response(),
            _ => (status, body).into_response(),
        }
    }
}

/// Startup configuration problems. These stop the process.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("invalid trusted header name {name:?}")]
    InvalidHeaderName { name: String },

    #[error("{0} is larger than one year")]
    OutOfRange(&'static str),

    #[error("admin prefix {0:?} must start with '/' and not be the root path")]
    InvalidAdminPrefix(String),

    #[error("invalid cookie name {0:?}")]
    InvalidCookieName(String),
}
