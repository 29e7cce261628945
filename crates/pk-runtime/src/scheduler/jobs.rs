//! The periodic jobs run by the runtime.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use pk_03_access_controller::AccessControllerApi;
use pk_04_telemetry_cache::TelemetryCacheApi;
use pk_05_report_aggregator::ReportAggregatorApi;
use shared_types::TimeSource;
use tracing::{debug, info, warn};

use crate::errors::CoordinationError;
use crate::scheduler::PeriodicJob;
use crate::wiring::{PaymentParkingCoordinator, ReportingBridge};

/// Revokes sessions past their expiry.
pub struct SessionSweep(pub Arc<dyn AccessControllerApi>);

#[async_trait]
impl PeriodicJob for SessionSweep {
    fn name(&self) -> &'static str {
        "session_sweep"
    }

    async fn run(&self) -> Result<(), CoordinationError> {
        let swept = self.0.sweep_expired_sessions().await;
        if swept > 0 {
            info!(swept, "[scheduler] Expired sessions removed");
        }
        Ok(())
    }
}

/// Drops expired cache entries.
pub struct CachePurge(pub Arc<dyn TelemetryCacheApi>);

#[async_trait]
impl PeriodicJob for CachePurge {
    fn name(&self) -> &'static str {
        "cache_purge"
    }

    async fn run(&self) -> Result<(), CoordinationError> {
        let purged = self.0.purge_expired();
        debug!(purged, "[scheduler] Cache purged");
        Ok(())
    }
}

pub struct MetricsCollection(pub Arc<dyn TelemetryCacheApi>);

#[async_trait]
impl PeriodicJob for MetricsCollection {
    fn name(&self) -> &'static str {
        "metrics_collection"
    }

    async fn run(&self) -> Result<(), CoordinationError> {
        self.0.collect_metrics().await;
        Ok(())
    }
}

/// Runs every report schedule due at the current minute.
pub struct ScheduleTick {
    reports: Arc<dyn ReportAggregatorApi>,
    clock: Arc<dyn TimeSource>,
}

impl ScheduleTick {
    pub fn new(reports: Arc<dyn ReportAggregatorApi>, clock: Arc<dyn TimeSource>) -> Self {
        Self { reports, clock }
    }
}

#[async_trait]
impl PeriodicJob for ScheduleTick {
    fn name(&self) -> &'static str {
        "schedule_tick"
    }

    async fn run(&self) -> Result<(), CoordinationError> {
        let tick = self.reports.run_due_schedules(self.clock.now()).await;
        if !tick.delivered.is_empty() {
            info!(delivered = tick.delivered.len(), "[scheduler] Scheduled reports delivered");
        }
        for (schedule_id, error) in &tick.failed {
            warn!(%schedule_id, %error, "[scheduler] Scheduled report failed");
        }
        match tick.failed.into_iter().next() {
            Some((_, error)) => Err(error.into()),
            None => Ok(()),
        }
    }
}

pub struct SnapshotRefresh(pub Arc<ReportingBridge>);

#[async_trait]
impl PeriodicJob for SnapshotRefresh {
    fn name(&self) -> &'static str {
        "snapshot_refresh"
    }

    async fn run(&self) -> Result<(), CoordinationError> {
        self.0.refresh_snapshot().await
    }
}

/// Settles payment bindings whose terminal event never arrived.
pub struct BindingReconcile {
    coordinator: Arc<PaymentParkingCoordinator>,
    max_age: Duration,
}

impl BindingReconcile {
    pub fn new(coordinator: Arc<PaymentParkingCoordinator>, max_age: Duration) -> Self {
        Self {
            coordinator,
            max_age,
        }
    }
}

#[async_trait]
impl PeriodicJob for BindingReconcile {
    fn name(&self) -> &'static str {
        "binding_reconcile"
    }

    async fn run(&self) -> Result<(), CoordinationError> {
        let resolved = self.coordinator.reconcile_stale_bindings(self.max_age).await;
        if resolved > 0 {
            info!(resolved, "[scheduler] Stale payment bindings settled");
        }
        Ok(())
    }
}
