//! Per-user message-send rate limiting.
//!
//! Each user gets two fixed windows with lazy reset: 30 sends per minute
//! and 500 per hour. Both counters must be under their caps for a send to
//! be admitted; admission increments both. Fixed windows admit up to
//! roughly twice the nominal cap across a window boundary — retained
//! source behavior, not a bug.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use parlor_shared::constants::{
    MAX_MESSAGES_PER_HOUR, MAX_MESSAGES_PER_MINUTE, RATE_LIMIT_WINDOW_HOUR_SECS,
    RATE_LIMIT_WINDOW_MINUTE_SECS,
};

/// Rejection naming the exhausted window and its cap.
#[derive(Debug, Clone, Error)]
#[error("Rate limit exceeded: maximum {limit} messages per {window}")]
pub struct RateLimitExceeded {
    pub limit: u32,
    pub window: &'static str,
}

/// Injectable time source so window expiry is testable.
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> Instant;
}

/// Wall-clock time source used in production.
#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

#[derive(Debug, Clone, Copy)]
struct Window {
    count: u32,
    reset_at: Instant,
}

impl Window {
    fn fresh(now: Instant, length: Duration) -> Self {
        Self {
            count: 0,
            reset_at: now + length,
        }
    }

    fn reset_if_expired(&mut self, now: Instant, length: Duration) {
        if now > self.reset_at {
            *self = Self::fresh(now, length);
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct UserWindows {
    minute: Window,
    hour: Window,
}

/// Registry of per-user limiters keyed by username.
#[derive(Clone)]
pub struct RateLimiter {
    entries: Arc<Mutex<HashMap<String, UserWindows>>>,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            clock,
        }
    }

    pub fn system() -> Self {
        Self::new(Arc::new(SystemClock))
    }

    /// Admit or reject one send for `username`.
    pub async fn check(&self, username: &str) -> Result<(), RateLimitExceeded> {
        let now = self.clock.now();
        let minute = Duration::from_secs(RATE_LIMIT_WINDOW_MINUTE_SECS);
        let hour = Duration::from_secs(RATE_LIMIT_WINDOW_HOUR_SECS);

        let mut entries = self.entries.lock().await;
        let windows = entries
            .entry(username.to_string())
            .or_insert_with(|| UserWindows {
                minute: Window::fresh(now, minute),
                hour: Window::fresh(now, hour),
            });

        windows.minute.reset_if_expired(now, minute);
        windows.hour.reset_if_expired(now, hour);

        if windows.minute.count >= MAX_MESSAGES_PER_MINUTE {
            warn!(user = username, "Minute rate limit exceeded");
            return Err(RateLimitExceeded {
                limit: MAX_MESSAGES_PER_MINUTE,
                window: "minute",
            });
        }
        if windows.hour.count >= MAX_MESSAGES_PER_HOUR {
            warn!(user = username, "Hour rate limit exceeded");
            return Err(RateLimitExceeded {
                limit: MAX_MESSAGES_PER_HOUR,
                window: "hour",
            });
        }

        windows.minute.count += 1;
        windows.hour.count += 1;
        Ok(())
    }

    /// Evict users whose windows have all lapsed.
    pub async fn purge_stale(&self) {
        let now = self.clock.now();
        let mut entries = self.entries.lock().await;
        let before = entries.len();
        entries.retain(|_, w| now <= w.hour.reset_at);
        let removed = before - entries.len();
        if removed > 0 {
            debug!(removed, "Purged idle rate-limit entries");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ManualClock {
        now: std::sync::Mutex<Instant>,
    }

    impl ManualClock {
        fn new() -> Self {
            Self {
                now: std::sync::Mutex::new(Instant::now()),
            }
        }

        fn advance(&self, seconds: u64) {
            let mut now = self.now.lock().unwrap();
            *now += Duration::from_secs(seconds);
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> Instant {
            *self.now.lock().unwrap()
        }
    }

    #[tokio::test]
    async fn test_thirty_first_send_in_a_minute_rejected() {
        let limiter = RateLimiter::system();
        for _ in 0..MAX_MESSAGES_PER_MINUTE {
            assert!(limiter.check("alice").await.is_ok());
        }

        let err = limiter.check("alice").await.unwrap_err();
        assert_eq!(err.window, "minute");
        assert_eq!(err.limit, MAX_MESSAGES_PER_MINUTE);
    }

    #[tokio::test]
    async fn test_users_are_limited_independently() {
        let limiter = RateLimiter::system();
        for _ in 0..MAX_MESSAGES_PER_MINUTE {
            assert!(limiter.check("alice").await.is_ok());
        }
        assert!(limiter.check("alice").await.is_err());
        assert!(limiter.check("bob").await.is_ok());
    }

    #[tokio::test]
    async fn test_minute_window_resets_lazily() {
        let clock = Arc::new(ManualClock::new());
        let limiter = RateLimiter::new(clock.clone());

        for _ in 0..MAX_MESSAGES_PER_MINUTE {
            assert!(limiter.check("alice").await.is_ok());
        }
        assert!(limiter.check("alice").await.is_err());

        clock.advance(RATE_LIMIT_WINDOW_MINUTE_SECS + 1);
        assert!(limiter.check("alice").await.is_ok());
    }

    #[tokio::test]
    async fn test_hour_cap_independent_of_minute_window() {
        let clock = Arc::new(ManualClock::new());
        let limiter = RateLimiter::new(clock.clone());

        // Stay under the minute cap by advancing past each minute window
        // until the hour counter reaches its cap.
        let mut sent = 0;
        while sent < MAX_MESSAGES_PER_HOUR {
            for _ in 0..MAX_MESSAGES_PER_MINUTE.min(MAX_MESSAGES_PER_HOUR - sent) {
                assert!(limiter.check("alice").await.is_ok());
                sent += 1;
            }
            clock.advance(RATE_LIMIT_WINDOW_MINUTE_SECS + 1);
        }

        // Minute window is fresh, hour window is exhausted.
        let err = limiter.check("alice").await.unwrap_err();
        assert_eq!(err.window, "hour");
        assert_eq!(err.limit, MAX_MESSAGES_PER_HOUR);
    }

    #[tokio::test]
    async fn test_purge_evicts_idle_users() {
        let clock = Arc::new(ManualClock::new());
        let limiter = RateLimiter::new(clock.clone());
        limiter.check("alice").await.unwrap();

        limiter.purge_stale().await;
        assert!(!limiter.entries.lock().await.is_empty());

        clock.advance(RATE_LIMIT_WINDOW_HOUR_SECS + 1);
        limiter.purge_stale().await;
        assert!(limiter.entries.lock().await.is_empty());
    }
}
