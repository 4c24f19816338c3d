use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::admin::AdminGuard;
use crate::client_ip::ClientIpResolver;
use crate::clock::{Clock, SystemClock};
use crate::config::GuardConfig;
use crate::rate_limit::RateLimiter;

pub const GLOBAL_TIER: &str = "global";

// Limiter for one route-prefix tier
pub struct TierLimiter {
    pub name: String,
    pub prefix: String,
    pub limiter: RateLimiter,
}

// app's shared state

pub struct AppState {
    pub guard: AdminGuard,
    pub admin_prefix: String,
    pub ip_resolver: ClientIpResolver,
    pub global: RateLimiter,
    pub tiers: Vec<TierLimiter>, // matched in order
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(config: &GuardConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: &GuardConfig, clock: Arc<dyn Clock>) -> Self {
        let tiers = config
            .policies
            .tiers
            .iter()
            .map(|tier| TierLimiter {
                name: tier.name.clone(),
                prefix: tier.prefix.clone(),
                limiter: RateLimiter::with_clock(tier.policy, Arc::clone(&clock)),
            })
            .collect();

        Self {
            guard: AdminGuard::new(config.admin_secret.as_deref(), config.admin_cookie.clone()),
            admin_prefix: config.admin_prefix.clone(),
            ip_resolver: ClientIpResolver::new(config.trusted_ip_headers.clone()),
            global: RateLimiter::with_clock(config.policies.global, Arc::clone(&clock)),
            tiers,
            started_at: clock.now(),
        }
    }

    pub fn tier_for(&self, path: &str) -> Option<&TierLimiter> {
        self.tiers.iter().find(|tier| path.starts_with(&tier.prefix))
    }

    // "/api/admin" and anything below it, but not "/api/administrator"
    pub fn is_admin_path(&self, path: &str) -> bool {
        match path.strip_prefix(&self.admin_prefix) {
            Some(rest) => rest.is_empty() || rest.starts_with('/'),
            None => false,
        }
    }

    // Every limiter with its tier label, global first
    pub fn limiters(&self) -> impl Iterator<Item = (&str, &RateLimiter)> {
        std::iter::once((GLOBAL_TIER, &self.global))
            .chain(self.tiers.iter().map(|tier| (tier.name.as_str(), &tier.limiter)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tiers_match_most_specific_prefix_first() {
        let state = AppState::new(&GuardConfig::default());

        assert_eq!(state.tier_for("/api/ai/chat").unwrap().name, "ai");
        assert_eq!(state.tier_for("/api/billing/refund").unwrap().name, "billing");
        assert_eq!(state.tier_for("/api/auth/login").unwrap().name, "auth");
        assert_eq!(state.tier_for("/api/projects/1").unwrap().name, "default");
        assert!(state.tier_for("/health").is_none());
    }

    #[test]
    fn admin_path_matching() {
        let state = AppState::new(&GuardConfig::default());

        assert!(state.is_admin_path("/api/admin"));
        assert!(state.is_admin_path("/api/admin/rate-limits"));
        assert!(!state.is_admin_path("/api/administrator"));
        assert!(!state.is_admin_path("/api/ai/chat"));
    }

    #[test]
    fn limiters_lists_global_and_tiers() {
        let state = AppState::new(&GuardConfig::default());
        let names: Vec<&str> = state.limiters().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["global", "ai", "billing", "auth", "default"]);
    }
}
