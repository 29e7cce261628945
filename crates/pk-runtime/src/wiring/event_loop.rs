//! # Coordination Bus
//!
//! One subscription, one task. Every event is handed to the observer, the
//! payment/parking coordinator and the reporting bridge in that order, and
//! the next event is not read until all three are done. Events for the same
//! space or transaction are therefore never reordered.
//!
//! If the subscription falls behind and loses events, every binding whose
//! transaction already finished is reconciled from the ledger straight away.

use std::sync::Arc;
use std::time::Duration;

use pk_telemetry::{HistogramTimer, HANDLER_DURATION};
use shared_bus::{EventFilter, InMemoryEventBus, Subscription};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::wiring::observer::MetricsObserver;
use crate::wiring::payment_parking::PaymentParkingCoordinator;
use crate::wiring::reporting::ReportingBridge;

pub struct CoordinationBus {
    subscription: Subscription,
    observer: MetricsObserver,
    payment_parking: Arc<PaymentParkingCoordinator>,
    reporting: Arc<ReportingBridge>,
}

impl CoordinationBus {
    /// Subscribes immediately, so nothing published after this returns is
    /// missed even if `run` starts later.
    pub fn new(
        bus: &InMemoryEventBus,
        payment_parking: Arc<PaymentParkingCoordinator>,
        reporting: Arc<ReportingBridge>,
    ) -> Self {
        Self {
            subscription: bus.subscribe(EventFilter::all()),
            observer: MetricsObserver,
            payment_parking,
            reporting,
        }
    }

    /// Runs until the bus closes or `shutdown` flips to `true`.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!("[coord] Coordination bus started");
        let mut lagged = self.subscription.lagged();
        loop {
            let event = tokio::select! {
                event = self.subscription.recv() => match event {
                    Some(event) => event,
                    None => break,
                },
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                    continue;
                }
            };

            if self.subscription.lagged() > lagged {
                lagged = self.subscription.lagged();
                let resolved = self
                    .payment_parking
                    .reconcile_stale_bindings(Duration::ZERO)
                    .await;
                warn!(lagged, resolved, "[coord] Events lost; bindings reconciled");
            }

            let _timer = HistogramTimer::new(&HANDLER_DURATION);
            debug!(event = event.name(), "[coord] Dispatching");
            self.observer.observe(&event);
            self.payment_parking.handle(&event).await;
            self.reporting.handle(&event).await;
        }
        info!("[coord] Coordination bus stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use pk_01_resource_manager::{GateState, ResourceManagerApi, ResourceManagerService, ZoneSpec};
    use pk_02_transaction_processor::{PaymentConfig, SimulatedGateway, TransactionProcessorService};
    use pk_04_telemetry_cache::{
        ConnectionPool, LoopbackConnection, LoopbackFactory, ProbeReading, StaticProbe,
        TelemetryCacheConfig, TelemetryCacheService,
    };
    use shared_bus::{EventPublisher, ParkingEvent};
    use shared_types::{MockTimeSource, SpaceStatus, VehicleType};

    use crate::container::CoordinationConfig;

    #[tokio::test]
    async fn test_lost_completion_is_recovered_after_lag() {
        let bus = Arc::new(InMemoryEventBus::with_capacity(4));
        let clock = Arc::new(MockTimeSource::new(
            Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap(),
        ));
        let resources = ResourceManagerService::in_memory(bus.clone(), clock.clone());
        resources
            .initialize_lot(vec![ZoneSpec::new("A", VehicleType::Car, 1).with_gate("G1")])
            .await
            .unwrap();
        let payments = Arc::new(TransactionProcessorService::new(
            PaymentConfig::default(),
            Arc::new(SimulatedGateway::instant()),
            bus.clone(),
            clock.clone(),
        ));
        let config = TelemetryCacheConfig::default();
        let pool: ConnectionPool<LoopbackConnection> = ConnectionPool::new(
            &config.pool,
            config.sample_capacity,
            Arc::new(LoopbackFactory::default()),
        );
        let cache = Arc::new(TelemetryCacheService::new(
            config,
            pool,
            Arc::new(StaticProbe(ProbeReading {
                cpu_usage: 1.0,
                memory_used_bytes: 1,
                memory_total_bytes: 2,
            })),
            bus.clone(),
            clock.clone(),
        ));
        let coordinator = Arc::new(PaymentParkingCoordinator::new(
            resources.clone(),
            payments.clone(),
            CoordinationConfig::default(),
            bus.clone(),
            clock.clone(),
        ));
        let reporting = Arc::new(ReportingBridge::new(
            payments,
            resources.clone(),
            cache,
            bus.clone(),
            clock.clone(),
        ));
        let coordination = CoordinationBus::new(&bus, coordinator.clone(), reporting);

        let space = resources
            .assign_space("ABC-123", VehicleType::Car, None)
            .await
            .unwrap();
        coordinator
            .initiate_payment(&space.id, 1000, "cash", "cashier")
            .await
            .unwrap();
        // Push the payment events out of the four-slot backlog.
        for _ in 0..8 {
            bus.publish(ParkingEvent::GateClosed {
                gate_id: "G9".into(),
            })
            .await;
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(coordination.run(shutdown_rx));

        tokio::time::timeout(Duration::from_secs(5), async {
            while coordinator.active_bindings() > 0 {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("binding reconciled");

        assert_eq!(
            resources.space(&space.id).unwrap().status,
            SpaceStatus::Available
        );
        assert_eq!(resources.gate_state("G1"), Some(GateState::Open));

        shutdown_tx.send(true).unwrap();
        task.await.unwrap();
    }
}
