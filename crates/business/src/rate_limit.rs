//! Fixed-window rate limiter keyed by (actor, action)
//!
//! State lives in the limiter value itself and time comes from the
//! injected clock, so windows can be advanced deterministically in tests.

use crate::config::RateLimit;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use rcard_core::Clock;
use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

/// Seconds between sweeps of expired windows
const PURGE_INTERVAL_SECS: i64 = 60;

/// Rate-limited action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RateAction {
    Login,
    LoanCreate,
    Api,
}

impl RateAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            RateAction::Login => "login",
            RateAction::LoanCreate => "loan_create",
            RateAction::Api => "api",
        }
    }
}

impl fmt::Display for RateAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Rejection: seconds until the current window closes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryAfter(pub u64);

struct Window {
    started: DateTime<Utc>,
    window_secs: u64,
    count: u32,
}

impl Window {
    fn elapsed_secs(&self, now: DateTime<Utc>) -> u64 {
        u64::try_from((now - self.started).num_seconds()).unwrap_or(0)
    }

    fn expired(&self, now: DateTime<Utc>) -> bool {
        self.elapsed_secs(now) >= self.window_secs
    }
}

pub struct RateLimiter {
    clock: Arc<dyn Clock>,
    windows: DashMap<(String, RateAction), Window>,
    /// Unix time of the next sweep
    next_purge: AtomicI64,
}

impl RateLimiter {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        let next_purge = clock.now().timestamp() + PURGE_INTERVAL_SECS;
        Self {
            clock,
            windows: DashMap::new(),
            next_purge: AtomicI64::new(next_purge),
        }
    }

    /// Count one attempt; reject once `limit.max_attempts` is exceeded
    /// within the current window.
    pub fn check(&self, actor: &str, action: RateAction, limit: RateLimit) -> Result<(), RetryAfter> {
        let now = self.clock.now();
        self.maybe_purge(now);

        let mut window = self
            .windows
            .entry((actor.to_string(), action))
            .or_insert_with(|| Window {
                started: now,
                window_secs: limit.window_secs,
                count: 0,
            });

        if window.expired(now) {
            window.started = now;
            window.window_secs = limit.window_secs;
            window.count = 0;
        }

        if window.count >= limit.max_attempts {
            let retry = window.window_secs.saturating_sub(window.elapsed_secs(now));
            return Err(RetryAfter(retry.max(1)));
        }

        window.count += 1;
        Ok(())
    }

    /// Forget the window of one (actor, action)
    pub fn reset(&self, actor: &str, action: RateAction) {
        self.windows.remove(&(actor.to_string(), action));
    }

    /// Drop every expired window; returns how many were removed
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let before = self.windows.len();
        self.windows.retain(|_, w| !w.expired(now));
        before.saturating_sub(self.windows.len())
    }

    // One caller per interval sweeps; must run with no entry guard held.
    fn maybe_purge(&self, now: DateTime<Utc>) {
        let due = self.next_purge.load(Ordering::Relaxed);
        let now_secs = now.timestamp();
        if now_secs < due {
            return;
        }
        if self
            .next_purge
            .compare_exchange(due, now_secs + PURGE_INTERVAL_SECS, Ordering::AcqRel, Ordering::Relaxed)
            .is_ok()
        {
            let removed = self.purge_expired();
            if removed > 0 {
                tracing::debug!(removed, "expired rate limit windows purged");
            }
        }
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};
    use rcard_core::FixedClock;

    fn limiter() -> (FixedClock, RateLimiter) {
        let clock = FixedClock::at_date(NaiveDate::from_ymd_opt(2026, 10, 17).unwrap());
        let limiter = RateLimiter::new(Arc::new(clock.clone()));
        (clock, limiter)
    }

    #[test]
    fn test_allows_within_limit() {
        let (_clock, limiter) = limiter();
        let limit = RateLimit::new(3, 60);
        for _ in 0..3 {
            assert!(limiter.check("alice", RateAction::LoanCreate, limit).is_ok());
        }
        assert_eq!(
            limiter.check("alice", RateAction::LoanCreate, limit),
            Err(RetryAfter(60))
        );
    }

    #[test]
    fn test_keys_are_independent() {
        let (_clock, limiter) = limiter();
        let limit = RateLimit::new(1, 60);
        assert!(limiter.check("alice", RateAction::Login, limit).is_ok());
        assert!(limiter.check("alice", RateAction::Login, limit).is_err());
        assert!(limiter.check("bob", RateAction::Login, limit).is_ok());
        assert!(limiter.check("alice", RateAction::Api, limit).is_ok());
    }

    #[test]
    fn test_window_resets_after_expiry() {
        let (clock, limiter) = limiter();
        let limit = RateLimit::new(1, 60);
        assert!(limiter.check("alice", RateAction::Login, limit).is_ok());

        clock.advance(Duration::seconds(45));
        assert_eq!(limiter.check("alice", RateAction::Login, limit), Err(RetryAfter(15)));

        clock.advance(Duration::seconds(15));
        assert!(limiter.check("alice", RateAction::Login, limit).is_ok());
    }

    #[test]
    fn test_reset_and_purge() {
        let (clock, limiter) = limiter();
        let limit = RateLimit::new(1, 60);
        limiter.check("alice", RateAction::Login, limit).unwrap();
        limiter.check("bob", RateAction::Login, limit).unwrap();

        limiter.reset("alice", RateAction::Login);
        assert!(limiter.check("alice", RateAction::Login, limit).is_ok());

        clock.advance(Duration::seconds(61));
        assert_eq!(limiter.purge_expired(), 2);
        assert!(limiter.is_empty());
    }

    #[test]
    fn test_check_sweeps_expired_windows() {
        let (clock, limiter) = limiter();
        let limit = RateLimit::new(5, 30);
        for actor in ["alice", "bob", "carol"] {
            limiter.check(actor, RateAction::Api, limit).unwrap();
        }
        assert_eq!(limiter.len(), 3);

        // Past both the window and the sweep interval
        clock.advance(Duration::seconds(PURGE_INTERVAL_SECS));
        limiter.check("dave", RateAction::Api, limit).unwrap();
        assert_eq!(limiter.len(), 1);
    }
}
