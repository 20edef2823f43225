// Submission rate limiting
//
// Rolling one-hour window per client key, held in a DashMap. Clients whose
// whole history has aged out are swept at most once a minute, and by the
// hourly housekeeping task.

use dashmap::DashMap;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::error::{BookingError, BookingResult};

const WINDOW: Duration = Duration::from_secs(3600);
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Default)]
pub struct SubmissionRateLimiter {
    submissions: DashMap<String, VecDeque<Instant>>,
    last_sweep: Mutex<Option<Instant>>,
}

impl SubmissionRateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a submission for `key`, rejecting it when `limit` were already
    /// made in the last hour. A limit of 0 disables the check.
    pub fn check(&self, key: &str, limit: u32) -> BookingResult<()> {
        self.check_at(key, limit, Instant::now())
    }

    pub fn check_at(&self, key: &str, limit: u32, now: Instant) -> BookingResult<()> {
        if limit == 0 {
            return Ok(());
        }

        // Must run before the entry below is held, retain locks every shard
        if self.sweep_due(now) {
            self.cleanup_expired(now);
        }

        let mut history = self.submissions.entry(key.to_string()).or_default();
        while let Some(oldest) = history.front() {
            if now.saturating_duration_since(*oldest) >= WINDOW {
                history.pop_front();
            } else {
                break;
            }
        }

        if history.len() >= limit as usize {
            warn!(client = key, "Submission rate limit reached");
            return Err(BookingError::RateLimited { limit });
        }

        history.push_back(now);
        Ok(())
    }

    /// Drops clients with no submission inside the window. Returns how many
    /// were removed.
    pub fn cleanup_expired(&self, now: Instant) -> usize {
        let before = self.submissions.len();
        self.submissions.retain(|_, history| {
            history
                .back()
                .map(|latest| now.saturating_duration_since(*latest) < WINDOW)
                .unwrap_or(false)
        });
        let removed = before.saturating_sub(self.submissions.len());
        if removed > 0 {
            debug!(removed, "Expired rate limit entries removed");
        }
        removed
    }

    pub fn tracked_clients(&self) -> usize {
        self.submissions.len()
    }

    fn sweep_due(&self, now: Instant) -> bool {
        let Ok(mut last) = self.last_sweep.lock() else {
            return false;
        };
        match *last {
            Some(at) if now.saturating_duration_since(at) < SWEEP_INTERVAL => false,
            _ => {
                *last = Some(now);
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_per_client() {
        let limiter = SubmissionRateLimiter::new();
        let start = Instant::now();

        for _ in 0..3 {
            limiter.check_at("10.0.0.1", 3, start).unwrap();
        }
        let fourth = limiter.check_at("10.0.0.1", 3, start);
        assert!(matches!(fourth, Err(BookingError::RateLimited { limit: 3 })));

        // Other clients are counted separately
        assert!(limiter.check_at("10.0.0.2", 3, start).is_ok());
    }

    #[test]
    fn test_window_rolls_over() {
        let limiter = SubmissionRateLimiter::new();
        let start = Instant::now();

        limiter.check_at("client", 1, start).unwrap();
        assert!(limiter
            .check_at("client", 1, start + Duration::from_secs(1800))
            .is_err());
        assert!(limiter
            .check_at("client", 1, start + Duration::from_secs(3600))
            .is_ok());
    }

    #[test]
    fn test_zero_means_unlimited() {
        let limiter = SubmissionRateLimiter::new();
        for _ in 0..100 {
            limiter.check("client", 0).unwrap();
        }
        assert_eq!(limiter.tracked_clients(), 0);
    }

    #[test]
    fn test_stale_clients_are_evicted() {
        let limiter = SubmissionRateLimiter::new();
        let start = Instant::now();

        for i in 0..10_000 {
            limiter.check_at(&format!("198.51.100.{}", i), 5, start).unwrap();
        }
        assert_eq!(limiter.tracked_clients(), 10_000);

        limiter
            .check_at("203.0.113.9", 5, start + Duration::from_secs(7200))
            .unwrap();
        assert_eq!(limiter.tracked_clients(), 1);
    }

    #[test]
    fn test_cleanup_keeps_recent_clients() {
        let limiter = SubmissionRateLimiter::new();
        let start = Instant::now();

        limiter.check_at("old", 5, start).unwrap();
        limiter
            .check_at("recent", 5, start + Duration::from_secs(3000))
            .unwrap();

        let removed = limiter.cleanup_expired(start + Duration::from_secs(3700));
        assert_eq!(removed, 1);
        assert_eq!(limiter.tracked_clients(), 1);
        assert!(limiter
            .check_at("recent", 1, start + Duration::from_secs(3700))
            .is_err());
    }
}
