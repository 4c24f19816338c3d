mod admin;
mod api;
mod health;
mod metrics;

pub use admin::{list_rate_limits, reset_rate_limit};
pub use api::api_handler;
pub use health::health_handler;
pub use metrics::metrics_handler;
