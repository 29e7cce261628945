//! Per-username failed login tracking.
//!
//! Once `max_attempts` failures accumulate, logins are rejected until
//! `window` has passed since the last failure. Attempts made while locked
//! are not counted, so hammering a locked account does not extend the lock.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Attempts {
    failures: u32,
    last_failure: DateTime<Utc>,
}

/// Sliding lockout ledger.
#[derive(Debug)]
pub struct LockoutTracker {
    max_attempts: u32,
    window: Duration,
    attempts: HashMap<String, Attempts>,
}

impl LockoutTracker {
    pub fn new(max_attempts: u32, window: Duration) -> Self {
        Self {
            max_attempts,
            window,
            attempts: HashMap::new(),
        }
    }

    /// Seconds until `username` may try again, or `None` if not locked.
    /// Expired entries are reset here.
    pub fn locked_for(&mut self, username: &str, now: DateTime<Utc>) -> Option<i64> {
        let entry = *self.attempts.get(username)?;
        let elapsed = now - entry.last_failure;
        if elapsed >= self.window {
            self.attempts.remove(username);
            return None;
        }
        if entry.failures >= self.max_attempts {
            Some((self.window - elapsed).num_seconds().max(1))
        } else {
            None
        }
    }

    /// Records one failure. Returns the running count.
    pub fn record_failure(&mut self, username: &str, now: DateTime<Utc>) -> u32 {
        let entry = self
            .attempts
            .entry(username.to_string())
            .or_insert(Attempts {
                failures: 0,
                last_failure: now,
            });
        entry.failures += 1;
        entry.last_failure = now;
        entry.failures
    }

    pub fn reset(&mut self, username: &str) {
        self.attempts.remove(username);
    }

    pub fn failures(&self, username: &str) -> u32 {
        self.attempts.get(username).map_or(0, |a| a.failures)
    }

    /// Drops every entry whose window has passed. Returns how many went.
    pub fn prune(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.attempts.len();
        let window = self.window;
        self.attempts.retain(|_, entry| now - entry.last_failure < window);
        before - self.attempts.len()
    }

    /// Usernames with at least one remembered failure.
    pub fn len(&self) -> usize {
        self.attempts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attempts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_locks_at_threshold() {
        let mut tracker = LockoutTracker::new(3, Duration::minutes(15));
        for _ in 0..2 {
            tracker.record_failure("ops", t0());
        }
        assert!(tracker.locked_for("ops", t0()).is_none());

        tracker.record_failure("ops", t0());
        assert_eq!(tracker.locked_for("ops", t0()), Some(900));
    }

    #[test]
    fn test_unlocks_after_window() {
        let mut tracker = LockoutTracker::new(3, Duration::minutes(15));
        for _ in 0..3 {
            tracker.record_failure("ops", t0());
        }
        let later = t0() + Duration::minutes(15);

        assert!(tracker.locked_for("ops", later).is_none());
        assert_eq!(tracker.failures("ops"), 0);
    }

    #[test]
    fn test_window_slides_with_last_failure() {
        let mut tracker = LockoutTracker::new(3, Duration::minutes(15));
        tracker.record_failure("ops", t0());
        tracker.record_failure("ops", t0() + Duration::minutes(10));
        tracker.record_failure("ops", t0() + Duration::minutes(20));

        assert!(tracker
            .locked_for("ops", t0() + Duration::minutes(30))
            .is_some());
    }

    #[test]
    fn test_prune_keeps_only_live_windows() {
        let mut tracker = LockoutTracker::new(3, Duration::minutes(15));
        for name in ["a", "b", "c"] {
            tracker.record_failure(name, t0());
        }
        tracker.record_failure("d", t0() + Duration::minutes(10));

        assert_eq!(tracker.prune(t0() + Duration::minutes(14)), 0);
        assert_eq!(tracker.prune(t0() + Duration::minutes(15)), 3);
        assert_eq!(tracker.len(), 1);
        assert_eq!(tracker.failures("d"), 1);

        assert_eq!(tracker.prune(t0() + Duration::minutes(25)), 1);
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_usernames_are_independent() {
        let mut tracker = LockoutTracker::new(1, Duration::minutes(1));
        tracker.record_failure("a", t0());
        assert!(tracker.locked_for("a", t0()).is_some());
        assert!(tracker.locked_for("b", t0()).is_none());
    }
}
