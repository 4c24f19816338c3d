use chrono::{DateTime, Duration, Utc};
use std::sync::{Arc, Mutex};

// Source of "now" for the rate limiter, swapped out in tests
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

// Wall clock used by the server
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually driven clock. Clones share the same time value, so a test can
/// keep one handle and hand another to the limiter.
#[derive(Debug, Clone)]
pub struct MockClock {
    current: Arc<Mutex<DateTime<Utc>>>,
}

impl MockClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            current: Arc::new(Mutex::new(start)),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut current = self.current.lock().unwrap_or_else(|p| p.into_inner());
        *current += by;
    }

    pub fn set(&self, to: DateTime<Utc>) {
        let mut current = self.current.lock().unwrap_or_else(|p| p.into_inner());
        *current = to;
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

impl Clock for MockClock {
    fn now(&self) -> DateTime<Utc> {
        *self.current.lock().unwrap_or_else(|p| p.into_inner())
    }
}
