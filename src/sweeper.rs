use std::sync::Arc;
use tokio::time::{Duration, MissedTickBehavior, interval};
use tracing::{debug, info};

use crate::metrics::RATE_LIMIT_ENTRIES;
use crate::state::AppState;

// One pass over every limiter, returns how many entries were dropped
pub fn sweep_once(state: &AppState) -> usize {
    let mut removed = 0;

    for (tier, limiter) in state.limiters() {
        removed += limiter.purge_expired();
        RATE_LIMIT_ENTRIES
            .with_label_values(&[tier])
            .set(limiter.len() as i64);
    }

    removed
}

// Expired-entry sweeper - keeps the counter maps from growing without bound
pub async fn sweeper(state: Arc<AppState>, every: Duration) {
    let mut interval = interval(every);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!(interval = ?every, "Rate limit sweeper started");

    loop {
        interval.tick().await;

        let removed = sweep_once(&state);
        if removed > 0 {
            debug!(removed, "Swept expired rate limit entries");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::MockClock;
    use crate::config::GuardConfig;

    #[test]
    fn sweep_drops_entries_from_every_limiter() {
        let clock = MockClock::default();
        let state = AppState::with_clock(&GuardConfig::default(), Arc::new(clock.clone()));

        state.global.check_limit("global:all:1.1.1.1");
        state.tier_for("/api/ai/x").unwrap().limiter.check_limit("ai:/api/ai/x:1.1.1.1");
        assert_eq!(sweep_once(&state), 0);

        clock.advance(chrono::Duration::seconds(60));
        state.global.check_limit("global:all:2.2.2.2");

        assert_eq!(sweep_once(&state), 2);
        assert_eq!(state.global.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn sweeper_runs_on_interval() {
        let clock = MockClock::default();
        let state = Arc::new(AppState::with_clock(&GuardConfig::default(), Arc::new(clock.clone())));

        state.global.check_limit("k");
        clock.advance(chrono::Duration::seconds(61));

        let task = tokio::spawn(sweeper(Arc::clone(&state), Duration::from_secs(60)));
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert!(state.global.is_empty());
        task.abort();
    }
}
