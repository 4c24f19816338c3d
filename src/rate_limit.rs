use axum::http::{HeaderMap, HeaderName, HeaderValue, header};
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;

use crate::clock::{Clock, SystemClock};

pub const X_RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
pub const X_RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
pub const X_RATELIMIT_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");

// Rate limit entry - tracks requests per key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitEntry {
    pub count: u32,
    pub window_start: DateTime<Utc>,
    pub blocked_until: Option<DateTime<Utc>>,
}

impl RateLimitEntry {
    fn new(now: DateTime<Utc>) -> Self {
        Self {
            count: 0,
            window_start: now,
            blocked_until: None,
        }
    }

    fn restart(&mut self, now: DateTime<Utc>) {
        self.count = 0;
        self.window_start = now;
        self.blocked_until = None;
    }

    // Window over and no block still running
    fn is_expired(&self, now: DateTime<Utc>, window: Duration) -> bool {
        let unblocked = self.blocked_until.is_none_or(|until| until <= now);
        unblocked && now - self.window_start >= window
    }
}

/// How many requests a key may make per window, and for how long it is shut
/// out once it goes over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    pub limit: u32,
    pub window: Duration,
    pub block_duration: Option<Duration>,
}

impl RateLimitPolicy {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            limit,
            window,
            block_duration: None,
        }
    }

    pub fn per_minute(limit: u32) -> Self {
        Self::new(limit, Duration::minutes(1))
    }

    pub fn with_block(mut self, block: Duration) -> Self {
        self.block_duration = Some(block);
        self
    }
}

/// Outcome of a single `check_limit` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RateLimitDecision {
    pub ok: bool,
    pub limit: u32,
    pub remaining: u32,
    pub reset_at: DateTime<Utc>,
    /// Whole seconds until `reset_at`, never below 1.
    pub retry_after: u64,
}

impl RateLimitDecision {
    fn new(ok: bool, limit: u32, remaining: u32, reset_at: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        let millis = (reset_at - now).num_milliseconds().max(0) as u64;
        Self {
            ok,
            limit,
            remaining,
            reset_at,
            retry_after: millis.div_ceil(1000).max(1),
        }
    }
}

/// Fixed-window counter keyed by arbitrary strings.
///
/// State is process-local. Running several instances behind a load balancer
/// multiplies the effective limit by the instance count.
pub struct RateLimiter {
    entries: DashMap<String, RateLimitEntry>,
    policy: RateLimitPolicy,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    pub fn new(policy: RateLimitPolicy) -> Self {
        Self::with_clock(policy, Arc::new(SystemClock))
    }

    pub fn with_clock(policy: RateLimitPolicy, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            policy,
            clock,
        }
    }

    pub fn policy(&self) -> &RateLimitPolicy {
        &self.policy
    }

    // Count one request for `key` and decide whether it is admitted.
    // The entry stays locked (shard write guard) for the whole update.
    pub fn check_limit(&self, key: &str) -> RateLimitDecision {
        let now = self.clock.now();
        let limit = self.policy.limit;

        let mut entry = self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| RateLimitEntry::new(now));

        if let Some(until) = entry.blocked_until {
            if until > now {
                return RateLimitDecision::new(false, limit, 0, until, now);
            }
            entry.restart(now);
        }

        //window expired (or clock stepped backwards)..? Reset it
        if now < entry.window_start || now - entry.window_start >= self.policy.window {
            entry.restart(now);
        }

        entry.count = entry.count.saturating_add(1);
        let window_end = saturating_add(entry.window_start, self.policy.window);

        if entry.count <= limit {
            return RateLimitDecision::new(true, limit, limit - entry.count, window_end, now);
        }

        //over limit
        match self.policy.block_duration {
            Some(block) => {
                let until = saturating_add(now, block);
                entry.blocked_until = Some(until);
                RateLimitDecision::new(false, limit, 0, until, now)
            }
            None => RateLimitDecision::new(false, limit, 0, window_end, now),
        }
    }

    // Forget a key entirely, returns whether it was tracked
    pub fn reset(&self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    /// Drop every entry whose window has ended and which is not blocked.
    /// Returns the number of entries removed.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let window = self.policy.window;
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now, window));
        before.saturating_sub(self.entries.len())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }
}

// Policies built in code are not range-checked, so clamp instead of panicking
fn saturating_add(at: DateTime<Utc>, by: Duration) -> DateTime<Utc> {
    at.checked_add_signed(by).unwrap_or(if by < Duration::zero() {
        DateTime::<Utc>::MIN_UTC
    } else {
        DateTime::<Utc>::MAX_UTC
    })
}

// Composite key, e.g. "api:/api/ai/chat:1.2.3.4"
pub fn rate_limit_key(scope: &str, action: &str, client: &str) -> String {
    format!("{}:{}:{}", scope, action, client)
}

/// Standard rate-limit response headers for a decision. Rejections also get
/// `Retry-After`.
pub fn headers_for(decision: &RateLimitDecision) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from(decision.limit));
    headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from(decision.remaining));
    headers.insert(X_RATELIMIT_RESET, HeaderValue::from(decision.reset_at.timestamp()));
    if !decision.ok {
        headers.insert(header::RETRY_AFTER, HeaderValue::from(decision.retry_after));
    }
    headers
}
