use axum::http::HeaderName;
use chrono::Duration;
use clap::Parser;
use std::fmt;

use crate::admin::DEFAULT_ADMIN_COOKIE;
use crate::error::ConfigError;
use crate::rate_limit::RateLimitPolicy;

// Longest window, block, or sweep interval accepted from configuration
pub const MAX_CONFIG_SECS: u64 = 365 * 24 * 60 * 60;

// CLI argument structure, every flag can also come from the environment
#[derive(Parser, Clone)]
#[command(name = "admin-gate")]
#[command(about = "Rate limiting and admin authentication guard for internal API routes")]
pub struct Args {
    // Port to run the server on
    #[arg(short, long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    // Shared secret for admin routes. Unset means admin routes refuse everything.
    #[arg(long, env = "ADMIN_SECRET", hide_env_values = true)]
    pub admin_secret: Option<String>,

    // Cookie that may carry the admin credential
    #[arg(long, env = "ADMIN_COOKIE", default_value = DEFAULT_ADMIN_COOKIE)]
    pub admin_cookie: String,

    // Path prefix of admin-scoped routes
    #[arg(long, env = "ADMIN_PREFIX", default_value = "/api/admin")]
    pub admin_prefix: String,

    // Rate limit max requests per window for ordinary /api routes
    #[arg(long, env = "RATE_LIMIT", default_value_t = 60)]
    pub rate_limit: u32,

    // Rate limit window in seconds
    #[arg(long, env = "RATE_WINDOW", default_value_t = 60)]
    pub rate_window: u64,

    // Per-client ceiling across all requests, per window
    #[arg(long, env = "GLOBAL_RATE_LIMIT", default_value_t = 120)]
    pub global_limit: u32,

    #[arg(long, env = "AI_RATE_LIMIT", default_value_t = 30)]
    pub ai_limit: u32,

    #[arg(long, env = "BILLING_RATE_LIMIT", default_value_t = 20)]
    pub billing_limit: u32,

    #[arg(long, env = "AUTH_RATE_LIMIT", default_value_t = 10)]
    pub auth_limit: u32,

    // Seconds an auth client stays blocked after going over its limit (0 = no block)
    #[arg(long, env = "AUTH_BLOCK_SECS", default_value_t = 0)]
    pub auth_block: u64,

    // Headers consulted for the client IP, in order. These are trusted blindly.
    #[arg(
        long,
        env = "TRUSTED_IP_HEADERS",
        value_delimiter = ',',
        default_value = "x-forwarded-for,x-real-ip"
    )]
    pub trusted_ip_headers: Vec<String>,

    // Expired entry sweep interval in seconds
    #[arg(long, env = "SWEEP_INTERVAL", default_value_t = 60)]
    pub sweep_interval: u64,
}

impl fmt::Debug for Args {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Args")
            .field("port", &self.port)
            .field("admin_secret", &self.admin_secret.as_ref().map(|_| "<redacted>"))
            .field("admin_cookie", &self.admin_cookie)
            .field("admin_prefix", &self.admin_prefix)
            .field("rate_limit", &self.rate_limit)
            .field("rate_window", &self.rate_window)
            .field("global_limit", &self.global_limit)
            .field("trusted_ip_headers", &self.trusted_ip_headers)
            .field("sweep_interval", &self.sweep_interval)
            .finish_non_exhaustive()
    }
}

/// One route-prefix tier of the rate limit table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTier {
    pub name: String,
    pub prefix: String,
    pub policy: RateLimitPolicy,
}

impl RouteTier {
    pub fn new(name: &str, prefix: &str, policy: RateLimitPolicy) -> Self {
        Self {
            name: name.to_string(),
            prefix: prefix.to_string(),
            policy,
        }
    }
}

/// Static limit table. Tiers are matched in order, first prefix match wins,
/// so the catch-all `/api/` tier goes last.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePolicies {
    pub global: RateLimitPolicy,
    pub tiers: Vec<RouteTier>,
}

impl Default for RoutePolicies {
    fn default() -> Self {
        Self {
            global: RateLimitPolicy::per_minute(120),
            tiers: vec![
                RouteTier::new("ai", "/api/ai/", RateLimitPolicy::per_minute(30)),
                RouteTier::new("billing", "/api/billing/", RateLimitPolicy::per_minute(20)),
                RouteTier::new("auth", "/api/auth/", RateLimitPolicy::per_minute(10)),
                RouteTier::new("default", "/api/", RateLimitPolicy::per_minute(60)),
            ],
        }
    }
}

/// Validated runtime configuration, built once at startup.
#[derive(Clone)]
pub struct GuardConfig {
    pub admin_secret: Option<String>,
    pub admin_cookie: String,
    pub admin_prefix: String,
    pub policies: RoutePolicies,
    pub trusted_ip_headers: Vec<HeaderName>,
    pub sweep_interval: std::time::Duration,
}

impl fmt::Debug for GuardConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GuardConfig")
            .field("admin_secret", &self.admin_secret.as_ref().map(|_| "<redacted>"))
            .field("admin_cookie", &self.admin_cookie)
            .field("admin_prefix", &self.admin_prefix)
            .field("policies", &self.policies)
            .field("trusted_ip_headers", &self.trusted_ip_headers)
            .field("sweep_interval", &self.sweep_interval)
            .finish()
    }
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            admin_secret: None,
            admin_cookie: DEFAULT_ADMIN_COOKIE.to_string(),
            admin_prefix: "/api/admin".to_string(),
            policies: RoutePolicies::default(),
            trusted_ip_headers: vec![
                HeaderName::from_static("x-forwarded-for"),
                HeaderName::from_static("x-real-ip"),
            ],
            sweep_interval: std::time::Duration::from_secs(60),
        }
    }
}

impl GuardConfig {
    pub fn from_args(args: &Args) -> Result<Self, ConfigError> {
        nonzero("rate_limit", args.rate_limit)?;
        nonzero("global_limit", args.global_limit)?;
        nonzero("ai_limit", args.ai_limit)?;
        nonzero("billing_limit", args.billing_limit)?;
        nonzero("auth_limit", args.auth_limit)?;
        nonzero("rate_window", args.rate_window)?;
        nonzero("sweep_interval", args.sweep_interval)?;
        let window = bounded_seconds("rate_window", args.rate_window)?;
        let auth_block = bounded_seconds("auth_block", args.auth_block)?;
        bounded_seconds("sweep_interval", args.sweep_interval)?;

        let admin_prefix = args.admin_prefix.trim().trim_end_matches('/').to_string();
        if !admin_prefix.starts_with('/') {
            return Err(ConfigError::InvalidAdminPrefix(args.admin_prefix.clone()));
        }

        if !is_cookie_name(&args.admin_cookie) {
            return Err(ConfigError::InvalidCookieName(args.admin_cookie.clone()));
        }

        let trusted_ip_headers = args
            .trusted_ip_headers
            .iter()
            .map(|name| name.trim())
            .filter(|name| !name.is_empty())
            .map(|name| {
                HeaderName::try_from(name.to_ascii_lowercase()).map_err(|_| {
                    ConfigError::InvalidHeaderName {
                        name: name.to_string(),
                    }
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let per_window = |limit| RateLimitPolicy::new(limit, window);

        let mut auth = per_window(args.auth_limit);
        if !auth_block.is_zero() {
            auth = auth.with_block(auth_block);
        }

        let policies = RoutePolicies {
            global: per_window(args.global_limit),
            tiers: vec![
                RouteTier::new("ai", "/api/ai/", per_window(args.ai_limit)),
                RouteTier::new("billing", "/api/billing/", per_window(args.billing_limit)),
                RouteTier::new("auth", "/api/auth/", auth),
                RouteTier::new("default", "/api/", per_window(args.rate_limit)),
            ],
        };

        Ok(Self {
            admin_secret: args.admin_secret.clone().filter(|s| !s.is_empty()),
            admin_cookie: args.admin_cookie.clone(),
            admin_prefix,
            policies,
            trusted_ip_headers,
            sweep_interval: std::time::Duration::from_secs(args.sweep_interval),
        })
    }
}

fn nonzero<T: Default + PartialEq>(name: &'static str, value: T) -> Result<(), ConfigError> {
    if value == T::default() {
        return Err(ConfigError::Zero(name));
    }
    Ok(())
}

fn bounded_seconds(name: &'static str, value: u64) -> Result<Duration, ConfigError> {
    if value > MAX_CONFIG_SECS {
        return Err(ConfigError::OutOfRange(name));
    }
    i64::try_from(value)
        .ok()
        .and_then(Duration::try_seconds)
        .ok_or(ConfigError::OutOfRange(name))
}

// RFC 6265 token characters, minus the ones nobody uses in practice
fn is_cookie_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}
