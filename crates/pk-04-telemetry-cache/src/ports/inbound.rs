//! # Inbound Port - TelemetryCacheApi

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use shared_types::{CacheStats, CrossDomainSnapshot, PerformanceMetrics, PoolStats};

use crate::domain::TimeRange;

/// Primary API for the Telemetry Cache.
///
/// Typed access (`get_cached<T>` / `set_cached<T>`) lives on the service and
/// is built on the JSON methods here.
#[async_trait]
pub trait TelemetryCacheApi: Send + Sync {
    /// Takes a performance snapshot, appends it to the history and emits
    /// `MetricsCollected`.
    async fn collect_metrics(&self) -> PerformanceMetrics;

    fn metrics(&self, range: TimeRange) -> Vec<PerformanceMetrics>;

    fn current_metrics(&self) -> Option<PerformanceMetrics>;

    fn get_value(&self, key: &str) -> Option<Value>;

    /// `ttl = None` applies the configured default.
    fn set_value(&self, key: &str, value: Value, ttl: Option<Duration>);

    /// Removes keys containing `pattern`, or all keys. Returns the count.
    fn clear_cache(&self, pattern: Option<&str>) -> usize;

    fn purge_expired(&self) -> usize;

    fn cache_stats(&self) -> CacheStats;

    fn pool_stats(&self) -> PoolStats;

    fn snapshot(&self) -> CrossDomainSnapshot;
}
