//! Telemetry Cache configuration and value types.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// TTL cache settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// TTL applied when `set` is called without one.
    pub default_ttl_secs: u64,
    /// Period of the expired-entry purge.
    pub check_period_secs: u64,
    pub max_keys: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl_secs: 300,
            check_period_secs: 60,
            max_keys: 10_000,
        }
    }
}

impl CacheConfig {
    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_secs)
    }
}

/// Connection pool settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    pub size: usize,
    pub acquire_timeout_ms: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            size: 10,
            acquire_timeout_ms: 5000,
        }
    }
}

/// Telemetry Cache configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryCacheConfig {
    pub cache: CacheConfig,
    pub pool: PoolConfig,
    /// Capacity of the metrics history ring.
    pub history_capacity: usize,
    /// Capacity of the response-time sample window.
    pub sample_capacity: usize,
}

impl Default for TelemetryCacheConfig {
    fn default() -> Self {
        Self {
            cache: CacheConfig::default(),
            pool: PoolConfig::default(),
            history_capacity: 1000,
            sample_capacity: 1000,
        }
    }
}

/// Host readings taken by a `SystemProbe`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ProbeReading {
    pub cpu_usage: f64,
    pub memory_used_bytes: u64,
    pub memory_total_bytes: u64,
}

/// Inclusive time range for history queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.start && at <= self.end
    }
}
