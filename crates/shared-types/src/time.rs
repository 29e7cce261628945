//! Injectable wall clock.
//!
//! Lockout windows, session expiry and schedule evaluation all read the
//! clock through `TimeSource` so tests can drive time deterministically.

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;

/// Source of the current wall-clock time.
pub trait TimeSource: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Reads the system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually driven clock for tests.
#[derive(Debug)]
pub struct MockTimeSource {
    now: RwLock<DateTime<Utc>>,
}

impl MockTimeSource {
    pub fn new(initial: DateTime<Utc>) -> Self {
        Self {
            now: RwLock::new(initial),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.write();
        *now += by;
    }

    pub fn set(&self, time: DateTime<Utc>) {
        *self.now.write() = time;
    }
}

impl TimeSource for MockTimeSource {
    fn now(&self) -> DateTime<Utc> {
        *self.now.read()
    }
}
