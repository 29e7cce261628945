//! # Parking Runtime
//!
//! Owns the container, the coordination handlers and the background tasks.
//!
//! ## Startup Sequence
//!
//! 1. Subscribe the coordination bus (before anything publishes)
//! 2. Initialize the configured lot layout
//! 3. Populate the cross-domain view once
//! 4. Start the coordination loop and the periodic scheduler
//!
//! ## Shutdown Sequence
//!
//! 1. Signal shutdown to both tasks
//! 2. Wait for them to stop (bounded)
//! 3. Close the connection pool

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use pk_01_resource_manager::ResourceManagerApi;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::container::SubsystemContainer;
use crate::errors::CoordinationError;
use crate::scheduler::{
    BindingReconcile, CachePurge, MetricsCollection, ScheduleTick, Scheduler, SessionSweep,
    SnapshotRefresh,
};
use crate::wiring::{
    CallRouter, CoordinationBus, PaymentParkingCoordinator, ReportingBridge, SecurityGate,
};

const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

pub struct ParkingRuntime {
    container: Arc<SubsystemContainer>,
    coordinator: Arc<PaymentParkingCoordinator>,
    reporting: Arc<ReportingBridge>,
    router: Arc<CallRouter>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl ParkingRuntime {
    pub fn new(container: SubsystemContainer) -> Self {
        let container = Arc::new(container);
        let publisher = container.event_bus.clone();

        let coordinator = Arc::new(PaymentParkingCoordinator::new(
            container.resources.clone(),
            container.payments.clone(),
            container.config.coordination,
            publisher.clone(),
            container.clock.clone(),
        ));
        let reporting = Arc::new(ReportingBridge::new(
            container.payments.clone(),
            container.resources.clone(),
            container.telemetry.clone(),
            publisher,
            container.clock.clone(),
        ));
        let router = Arc::new(CallRouter::new(
            SecurityGate::new(container.access.clone()),
            container.resources.clone(),
            container.payments.clone(),
            container.reports.clone(),
            coordinator.clone(),
        ));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        Self {
            container,
            coordinator,
            reporting,
            router,
            shutdown_tx,
            shutdown_rx,
            tasks: Mutex::new(Vec::new()),
        }
    }

    pub async fn start(&self) -> Result<(), CoordinationError> {
        info!("===========================================");
        info!("  Parking Coordination Runtime v{}", env!("CARGO_PKG_VERSION"));
        info!("===========================================");

        let bus = CoordinationBus::new(
            &self.container.event_bus,
            self.coordinator.clone(),
            self.reporting.clone(),
        );

        let lot = self.container.config.lot.clone();
        if lot.is_empty() {
            warn!("No lot layout configured; starting with an empty lot");
        } else {
            let spaces = self.container.resources.initialize_lot(lot).await?;
            info!(spaces, "Lot initialized");
        }

        if let Err(e) = self.reporting.refresh_snapshot().await {
            warn!(error = %e, "Initial snapshot refresh failed; the scheduler will retry");
        }

        let mut tasks = self.tasks.lock();
        tasks.push(tokio::spawn(bus.run(self.shutdown_rx.clone())));
        tasks.push(tokio::spawn(self.scheduler().run(self.shutdown_rx.clone())));
        info!("Coordination bus and scheduler started");
        Ok(())
    }

    fn scheduler(&self) -> Scheduler {
        let c = &self.container;
        let config = &c.config;
        Scheduler::new()
            .every(config.sweep_interval(), Arc::new(SessionSweep(c.access.clone())))
            .every(
                config.cache_purge_interval(),
                Arc::new(CachePurge(c.telemetry.clone())),
            )
            .every(
                config.metrics_interval(),
                Arc::new(MetricsCollection(c.telemetry.clone())),
            )
            .every(
                config.schedule_tick_interval(),
                Arc::new(ScheduleTick::new(c.reports.clone(), c.clock.clone())),
            )
            .every(
                config.snapshot_refresh_interval(),
                Arc::new(SnapshotRefresh(self.reporting.clone())),
            )
            .every(
                config.binding_reconcile_interval(),
                Arc::new(BindingReconcile::new(
                    self.coordinator.clone(),
                    config.stale_binding_age(),
                )),
            )
    }

    pub async fn shutdown(&self) {
        info!("Initiating graceful shutdown...");
        if let Err(e) = self.shutdown_tx.send(true) {
            error!("Failed to send shutdown signal: {}", e);
        }

        let tasks: Vec<_> = self.tasks.lock().drain(..).collect();
        for task in tasks {
            if tokio::time::timeout(SHUTDOWN_GRACE, task).await.is_err() {
                warn!("Background task did not stop within the grace period");
            }
        }
        self.container.telemetry.pool().close();
        info!("Shutdown complete");
    }

    /// Gated entry point for cross-subsystem calls.
    pub fn router(&self) -> Arc<CallRouter> {
        Arc::clone(&self.router)
    }

    pub fn coordinator(&self) -> Arc<PaymentParkingCoordinator> {
        Arc::clone(&self.coordinator)
    }

    pub fn container(&self) -> Arc<SubsystemContainer> {
        Arc::clone(&self.container)
    }
}
