//! # Telemetry Cache Service
//!
//! Holds the TTL cache, connection pool, metrics history and the
//! cross-domain view behind one facade.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use shared_bus::{EventPublisher, ParkingEvent};
use shared_types::{CacheStats, CrossDomainSnapshot, PerformanceMetrics, PoolStats, TimeSource};
use tracing::debug;

use crate::adapters::{ConnectionPool, LoopbackConnection};
use crate::domain::{
    MetricsHistory, TelemetryCacheConfig, TelemetryCacheError, TimeRange, TtlCache,
};
use crate::ports::{SystemProbe, TelemetryCacheApi};
use crate::view::CrossDomainView;

/// The Telemetry Cache.
pub struct TelemetryCacheService<C: Send + Sync + 'static = LoopbackConnection> {
    config: TelemetryCacheConfig,
    cache: Mutex<TtlCache>,
    history: RwLock<MetricsHistory>,
    pool: ConnectionPool<C>,
    view: CrossDomainView,
    probe: Arc<dyn SystemProbe>,
    publisher: Arc<dyn EventPublisher>,
    clock: Arc<dyn TimeSource>,
}

impl<C: Send + Sync + 'static> TelemetryCacheService<C> {
    pub fn new(
        config: TelemetryCacheConfig,
        pool: ConnectionPool<C>,
        probe: Arc<dyn SystemProbe>,
        publisher: Arc<dyn EventPublisher>,
        clock: Arc<dyn TimeSource>,
    ) -> Self {
        Self {
            cache: Mutex::new(TtlCache::new(config.cache.max_keys)),
            history: RwLock::new(MetricsHistory::new(config.history_capacity)),
            config,
            pool,
            view: CrossDomainView::new(),
            probe,
            publisher,
            clock,
        }
    }

    pub fn config(&self) -> &TelemetryCacheConfig {
        &self.config
    }

    pub fn pool(&self) -> &ConnectionPool<C> {
        &self.pool
    }

    pub fn view(&self) -> &CrossDomainView {
        &self.view
    }

    /// Typed cache read. A value of the wrong shape is an error, not a miss.
    pub fn get_cached<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, TelemetryCacheError> {
        self.get_value(key)
            .map(|value| {
                serde_json::from_value(value)
                    .map_err(|e| TelemetryCacheError::Serialization(format!("{key}: {e}")))
            })
            .transpose()
    }

    /// Typed cache write.
    pub fn set_cached<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<Duration>,
    ) -> Result<(), TelemetryCacheError> {
        let value = serde_json::to_value(value)
            .map_err(|e| TelemetryCacheError::Serialization(format!("{key}: {e}")))?;
        self.set_value(key, value, ttl);
        Ok(())
    }
}

#[async_trait]
impl<C: Send + Sync + 'static> TelemetryCacheApi for TelemetryCacheService<C> {
    async fn collect_metrics(&self) -> PerformanceMetrics {
        let reading = self.probe.read();
        let metrics = PerformanceMetrics {
            collected_at: self.clock.now(),
            cpu_usage: reading.cpu_usage,
            memory_used_bytes: reading.memory_used_bytes,
            memory_total_bytes: reading.memory_total_bytes,
            pool: self.pool.stats(),
            cache: self.cache_stats(),
            response_times: self.pool.response_times(),
        };
        self.history.write().push(metrics.clone());

        debug!(
            cpu = metrics.cpu_usage,
            cache_keys = metrics.cache.keys,
            pool_in_use = metrics.pool.in_use,
            "[pk-04] Metrics collected"
        );
        self.publisher
            .publish(ParkingEvent::MetricsCollected {
                metrics: metrics.clone(),
            })
            .await;
        metrics
    }

    fn metrics(&self, range: TimeRange) -> Vec<PerformanceMetrics> {
        self.history.read().in_range(range)
    }

    fn current_metrics(&self) -> Option<PerformanceMetrics> {
        self.history.read().latest().cloned()
    }

    fn get_value(&self, key: &str) -> Option<Value> {
        let now = self.clock.now();
        self.cache.lock().get(key, now)
    }

    fn set_value(&self, key: &str, value: Value, ttl: Option<Duration>) {
        let ttl = ttl.unwrap_or_else(|| self.config.cache.default_ttl());
        let now = self.clock.now();
        self.cache.lock().set(key, value, ttl, now);
    }

    fn clear_cache(&self, pattern: Option<&str>) -> usize {
        let removed = self.cache.lock().clear(pattern);
        debug!(?pattern, removed, "[pk-04] Cache cleared");
        removed
    }

    fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        self.cache.lock().purge_expired(now)
    }

    fn cache_stats(&self) -> CacheStats {
        self.cache.lock().stats()
    }

    fn pool_stats(&self) -> PoolStats {
        self.pool.stats()
    }

    fn snapshot(&self) -> CrossDomainSnapshot {
        self.view.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{LoopbackFactory, StaticProbe};
    use crate::domain::{CacheConfig, ProbeReading};
    use chrono::{Duration as ChronoDuration, TimeZone, Utc};
    use serde::Deserialize;
    use shared_bus::{EventFilter, InMemoryEventBus};
    use shared_types::MockTimeSource;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Occupancy {
        occupied: u32,
    }

    fn setup(
        history_capacity: usize,
    ) -> (TelemetryCacheService, Arc<MockTimeSource>, Arc<InMemoryEventBus>) {
        let config = TelemetryCacheConfig {
            cache: CacheConfig {
                default_ttl_secs: 60,
                check_period_secs: 10,
                max_keys: 100,
            },
            history_capacity,
            ..TelemetryCacheConfig::default()
        };
        let clock = Arc::new(MockTimeSource::new(
            Utc.with_ymd_and_hms(2024, 7, 1, 0, 0, 0).unwrap(),
        ));
        let bus = Arc::new(InMemoryEventBus::new());
        let pool: ConnectionPool<LoopbackConnection> = ConnectionPool::new(
            &config.pool,
            config.sample_capacity,
            Arc::new(LoopbackFactory::default()),
        );
        let probe = StaticProbe(ProbeReading {
            cpu_usage: 12.5,
            memory_used_bytes: 512,
            memory_total_bytes: 1024,
        });
        let service =
            TelemetryCacheService::new(config, pool, Arc::new(probe), bus.clone(), clock.clone());
        (service, clock, bus)
    }

    #[tokio::test]
    async fn test_typed_cache_with_default_ttl() {
        let (service, clock, _bus) = setup(10);
        service
            .set_cached("occupancy", &Occupancy { occupied: 4 }, None)
            .unwrap();

        assert_eq!(
            service.get_cached::<Occupancy>("occupancy").unwrap(),
            Some(Occupancy { occupied: 4 })
        );
        assert!(service.get_cached::<String>("occupancy").is_err());

        clock.advance(ChronoDuration::seconds(61));
        assert_eq!(service.get_cached::<Occupancy>("occupancy").unwrap(), None);
    }

    #[tokio::test]
    async fn test_purge_on_check_period() {
        let (service, clock, _bus) = setup(10);
        service.set_value("a", serde_json::json!(1), Some(Duration::from_secs(5)));
        service.set_value("b", serde_json::json!(2), Some(Duration::from_secs(500)));

        clock.advance(ChronoDuration::seconds(10));
        assert_eq!(service.purge_expired(), 1);
        assert_eq!(service.cache_stats().keys, 1);
    }

    #[tokio::test]
    async fn test_collect_metrics_history_and_event() {
        let (service, clock, bus) = setup(2);
        let mut sub = bus.subscribe(EventFilter::all());
        service.pool().with_connection(|_| async {}).await.unwrap();

        for _ in 0..3 {
            service.collect_metrics().await;
            clock.advance(ChronoDuration::seconds(30));
        }

        let current = service.current_metrics().unwrap();
        assert!((current.cpu_usage - 12.5).abs() < f64::EPSILON);
        assert_eq!(current.response_times.samples, 1);
        assert_eq!(current.pool.idle, 1);

        let start = Utc.with_ymd_and_hms(2024, 7, 1, 0, 0, 0).unwrap();
        let all = service.metrics(TimeRange::new(start, start + ChronoDuration::hours(1)));
        assert_eq!(all.len(), 2);

        let mut collected = 0;
        while let Ok(Some(ParkingEvent::MetricsCollected { .. })) = sub.try_recv() {
            collected += 1;
        }
        assert_eq!(collected, 3);
    }

    #[test]
    fn test_view_starts_empty() {
        let (service, _clock, _bus) = setup(1);
        assert_eq!(service.snapshot(), CrossDomainSnapshot::default());
        assert!(service.current_metrics().is_none());
    }
}
