//! # Payment ⇄ Parking Coordination
//!
//! Links a payment to the space it pays for and drives the space through
//! the payment lifecycle.
//!
//! ## Flow
//!
//! ```text
//! initiate_payment ──► prepare ──► bind ──► execute
//!                                              │
//!        PaymentInitiated ◄────────────────────┤
//!          └─► space: occupied → payment_pending
//!                                              │
//!        PaymentCompleted ◄────────────────────┤
//!          └─► release space, open gate, unbind, PaymentSettled
//!                                              │
//!        PaymentFailed ◄───────────────────────┘
//!          └─► space: payment_pending → occupied, unbind, PaymentReverted
//! ```
//!
//! Out-of-band `SpaceAssigned` refreshes bound snapshots and
//! `SpaceReleased` drops bindings for the space.
//!
//! A terminal event the coordination loop never saw (its subscription
//! lagged) would strand the binding and leave the space `payment_pending`.
//! [`PaymentParkingCoordinator::reconcile_stale_bindings`] settles such
//! bindings from the transaction ledger instead.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use pk_01_resource_manager::{ResourceError, ResourceManagerApi};
use pk_02_transaction_processor::{PaymentRequest, TransactionProcessorApi};
use shared_bus::{EventPublisher, ParkingEvent};
use shared_types::{
    Amount, Classify, ErrorKind, GateId, PaymentTransaction, SpaceId, SpaceStatus, TimeSource,
    TransactionStatus,
};
use tracing::{debug, info, warn};

use crate::container::CoordinationConfig;
use crate::errors::CoordinationError;
use crate::wiring::bindings::{BindingTable, TransactionBinding};

pub struct PaymentParkingCoordinator {
    resources: Arc<dyn ResourceManagerApi>,
    payments: Arc<dyn TransactionProcessorApi>,
    bindings: BindingTable,
    /// Released spaces whose gate waits for `confirm_exit`.
    awaiting_exit: Mutex<HashMap<SpaceId, GateId>>,
    config: CoordinationConfig,
    publisher: Arc<dyn EventPublisher>,
    clock: Arc<dyn TimeSource>,
}

impl PaymentParkingCoordinator {
    pub fn new(
        resources: Arc<dyn ResourceManagerApi>,
        payments: Arc<dyn TransactionProcessorApi>,
        config: CoordinationConfig,
        publisher: Arc<dyn EventPublisher>,
        clock: Arc<dyn TimeSource>,
    ) -> Self {
        Self {
            resources,
            payments,
            bindings: BindingTable::new(),
            awaiting_exit: Mutex::new(HashMap::new()),
            config,
            publisher,
            clock,
        }
    }

    /// Charges for the vehicle in `space_id`.
    ///
    /// The binding is in place before the charge runs so the lifecycle
    /// events always find it. A gateway failure is returned here as well as
    /// emitted; the space is reverted by the `PaymentFailed` handler.
    pub async fn initiate_payment(
        &self,
        space_id: &str,
        amount: Amount,
        method_id: &str,
        operator: &str,
    ) -> Result<PaymentTransaction, CoordinationError> {
        let space = self
            .resources
            .space(space_id)
            .ok_or_else(|| ResourceError::SpaceNotFound(space_id.to_string()))?;
        let vehicle = match (&space.status, &space.current_vehicle) {
            (SpaceStatus::Occupied, Some(vehicle)) => vehicle.clone(),
            _ => {
                return Err(CoordinationError::SpaceNotOccupied {
                    space_id: space.id.clone(),
                    status: space.status,
                })
            }
        };

        let ticket_ref = vehicle
            .ticket_ref
            .clone()
            .unwrap_or_else(|| vehicle.plate.clone());
        let request = PaymentRequest::new(ticket_ref, amount, method_id, operator)
            .with_metadata("space_id", space.id.clone().into())
            .with_metadata("plate", vehicle.plate.clone().into())
            .with_metadata("vehicle_type", vehicle.vehicle_type.as_str().into())
            .with_metadata("entry_time", vehicle.entry_time.to_rfc3339().into());

        let pending = self.payments.prepare_payment(request).await?;
        self.bindings.bind(TransactionBinding {
            transaction: pending.clone(),
            space,
            created_at: self.clock.now(),
        });
        debug!(tx_id = %pending.id, %space_id, "[coord] Payment bound to space");

        match self.payments.execute_payment(&pending.id).await {
            Ok(tx) => Ok(tx),
            Err(e) => {
                // Downstream failures were emitted as PaymentFailed and are
                // unbound by its handler. Anything else never reached the bus.
                if e.kind() != ErrorKind::Downstream {
                    self.bindings.remove(&pending.id);
                }
                Err(e.into())
            }
        }
    }

    /// Opens the gate for a released space held for confirmation.
    pub async fn confirm_exit(&self, space_id: &str) -> Result<GateId, CoordinationError> {
        let gate_id = self
            .awaiting_exit
            .lock()
            .remove(space_id)
            .ok_or_else(|| CoordinationError::NoPendingExit(space_id.to_string()))?;
        if let Err(e) = self.resources.open_gate(&gate_id).await {
            self.awaiting_exit
                .lock()
                .insert(space_id.to_string(), gate_id);
            return Err(e.into());
        }
        info!(%space_id, %gate_id, "[coord] Exit confirmed, gate opened");
        Ok(gate_id)
    }

    pub fn binding(&self, tx_id: &str) -> Option<TransactionBinding> {
        self.bindings.get(tx_id)
    }

    pub fn active_bindings(&self) -> usize {
        self.bindings.len()
    }

    /// `(space_id, gate_id)` pairs waiting for `confirm_exit`.
    pub fn pending_exits(&self) -> Vec<(SpaceId, GateId)> {
        let mut exits: Vec<_> = self
            .awaiting_exit
            .lock()
            .iter()
            .map(|(space, gate)| (space.clone(), gate.clone()))
            .collect();
        exits.sort();
        exits
    }

    /// Resolves bindings older than `max_age` whose transaction already
    /// reached a terminal state. In-flight transactions are left alone; a
    /// binding whose transaction is unknown is dropped. Returns how many
    /// bindings were resolved.
    pub async fn reconcile_stale_bindings(&self, max_age: Duration) -> usize {
        let Some(cutoff) = chrono::Duration::from_std(max_age)
            .ok()
            .and_then(|age| self.clock.now().checked_sub_signed(age))
        else {
            return 0;
        };

        let mut resolved = 0;
        for binding in self.bindings.created_before(cutoff) {
            let tx_id = binding.transaction.id.as_str();
            let handled = match self.payments.transaction(tx_id) {
                Some(tx) if tx.status == TransactionStatus::Completed => {
                    self.on_completed(&tx).await
                }
                Some(tx) if tx.status == TransactionStatus::Failed => {
                    let error = tx.error.clone().unwrap_or_default();
                    self.on_failed(&tx, &error).await
                }
                Some(_) => false,
                None => self.bindings.remove(tx_id).is_some(),
            };
            if handled {
                warn!(%tx_id, space_id = %binding.space.id, "[coord] Stale binding reconciled");
                resolved += 1;
            }
        }
        resolved
    }

    pub async fn handle(&self, event: &ParkingEvent) {
        match event {
            ParkingEvent::PaymentInitiated { transaction } => {
                self.on_initiated(transaction).await;
            }
            ParkingEvent::PaymentCompleted { transaction, .. } => {
                self.on_completed(transaction).await;
            }
            ParkingEvent::PaymentFailed { transaction, error } => {
                self.on_failed(transaction, error).await;
            }
            ParkingEvent::SpaceAssigned { space } => {
                let refreshed = self.bindings.refresh_space(space);
                if refreshed > 0 {
                    debug!(space_id = %space.id, refreshed, "[coord] Binding snapshots refreshed");
                }
            }
            ParkingEvent::SpaceReleased { space, .. } => {
                let dropped = self.bindings.remove_for_space(&space.id);
                if !dropped.is_empty() {
                    info!(space_id = %space.id, ?dropped, "[coord] Bindings dropped on release");
                }
            }
            _ => {}
        }
    }

    async fn on_initiated(&self, tx: &PaymentTransaction) {
        let Some(binding) = self.bindings.get(&tx.id) else {
            return;
        };
        match self
            .resources
            .update_space_status(&binding.space.id, SpaceStatus::PaymentPending)
            .await
        {
            Ok(_) => debug!(tx_id = %tx.id, space_id = %binding.space.id, "[coord] Space awaiting payment"),
            Err(e) => warn!(tx_id = %tx.id, space_id = %binding.space.id, error = %e, "[coord] Could not mark space payment_pending"),
        }
    }

    /// True when this call consumed the binding.
    async fn on_completed(&self, tx: &PaymentTransaction) -> bool {
        // Removing first makes a second delivery of the same outcome a no-op.
        let Some(binding) = self.bindings.remove(&tx.id) else {
            return false;
        };
        let space_id = binding.space.id.clone();
        let Some(plate) = binding.plate().map(str::to_string) else {
            warn!(tx_id = %tx.id, %space_id, "[coord] Binding without a vehicle");
            return true;
        };

        let released = match self.resources.release_space(&plate).await {
            Ok(space) => space,
            Err(e) => {
                warn!(tx_id = %tx.id, %space_id, error = %e, "[coord] Release after payment failed");
                return true;
            }
        };

        let mut gate_opened = false;
        if let Some(gate_id) = released.gate_id.clone() {
            if self.config.require_confirmation {
                self.awaiting_exit.lock().insert(space_id.clone(), gate_id);
            } else if self.config.auto_open_gate {
                match self.resources.open_gate(&gate_id).await {
                    Ok(()) => gate_opened = true,
                    Err(e) => warn!(tx_id = %tx.id, %gate_id, error = %e, "[coord] Gate did not open"),
                }
            }
        }

        info!(tx_id = %tx.id, %space_id, gate_opened, "[coord] Payment settled");
        self.publisher
            .publish(ParkingEvent::PaymentSettled {
                transaction_id: tx.id.clone(),
                space_id,
                gate_opened,
            })
            .await;
        true
    }

    async fn on_failed(&self, tx: &PaymentTransaction, error: &str) -> bool {
        let Some(binding) = self.bindings.remove(&tx.id) else {
            return false;
        };
        let space_id = binding.space.id;
        if let Err(e) = self
            .resources
            .update_space_status(&space_id, SpaceStatus::Occupied)
            .await
        {
            warn!(tx_id = %tx.id, %space_id, error = %e, "[coord] Could not revert space");
        }
        info!(tx_id = %tx.id, %space_id, %error, "[coord] Payment reverted");
        self.publisher
            .publish(ParkingEvent::PaymentReverted {
                transaction_id: tx.id.clone(),
                space_id,
                error: error.to_string(),
            })
            .await;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use pk_01_resource_manager::{GateState, ResourceManagerService, ZoneSpec};
    use pk_02_transaction_processor::{
        PaymentConfig, PaymentMethodKind, SimulatedGateway, TransactionProcessorService,
    };
    use shared_bus::{EventFilter, EventTopic, InMemoryEventBus, Subscription};
    use shared_types::{MockTimeSource, VehicleType};

    struct Harness {
        coordinator: PaymentParkingCoordinator,
        clock: Arc<MockTimeSource>,
        resources: Arc<ResourceManagerService>,
        gateway: Arc<SimulatedGateway>,
        payment_events: Subscription,
        integration_events: Subscription,
    }

    async fn harness(config: CoordinationConfig) -> Harness {
        let bus = Arc::new(InMemoryEventBus::new());
        let clock = Arc::new(MockTimeSource::new(
            Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap(),
        ));
        let gateway = Arc::new(SimulatedGateway::instant());
        let resources = ResourceManagerService::in_memory(bus.clone(), clock.clone());
        let payments = Arc::new(TransactionProcessorService::new(
            PaymentConfig::default(),
            gateway.clone(),
            bus.clone(),
            clock.clone(),
        ));
        resources
            .initialize_lot(vec![ZoneSpec::new("A", VehicleType::Car, 2).with_gate("G1")])
            .await
            .unwrap();

        let payment_events = bus.subscribe(EventFilter::topics(vec![EventTopic::Payment]));
        let integration_events = bus.subscribe(EventFilter::topics(vec![EventTopic::Integration]));
        let coordinator =
            PaymentParkingCoordinator::new(resources.clone(), payments, config, bus, clock.clone());
        Harness {
            coordinator,
            clock,
            resources,
            gateway,
            payment_events,
            integration_events,
        }
    }

    /// Feeds every queued payment event to the coordinator.
    async fn pump(h: &mut Harness) {
        while let Ok(Some(event)) = h.payment_events.try_recv() {
            h.coordinator.handle(&event).await;
        }
    }

    #[tokio::test]
    async fn test_completed_payment_releases_space_and_opens_gate() {
        let mut h = harness(CoordinationConfig::default()).await;
        let space = h
            .resources
            .assign_space("ABC-123", VehicleType::Car, Some("T-9".into()))
            .await
            .unwrap();

        let tx = h
            .coordinator
            .initiate_payment(&space.id, 1000, "cash", "cashier")
            .await
            .unwrap();
        assert_eq!(tx.ticket_ref, "T-9");
        assert_eq!(tx.metadata["space_id"], space.id.as_str());
        assert!(h.coordinator.binding(&tx.id).is_some());

        pump(&mut h).await;

        assert!(h.coordinator.binding(&tx.id).is_none());
        let after = h.resources.space(&space.id).unwrap();
        assert_eq!(after.status, SpaceStatus::Available);
        assert!(after.current_vehicle.is_none());
        assert_eq!(h.resources.gate_state("G1"), Some(GateState::Open));

        match h.integration_events.try_recv().unwrap() {
            Some(ParkingEvent::PaymentSettled {
                transaction_id,
                gate_opened,
                ..
            }) => {
                assert_eq!(transaction_id, tx.id);
                assert!(gate_opened);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_failed_payment_reverts_space() {
        let mut h = harness(CoordinationConfig::default()).await;
        let space = h
            .resources
            .assign_space("ABC-123", VehicleType::Car, None)
            .await
            .unwrap();
        h.gateway.fail_method(PaymentMethodKind::Card);

        let err = h
            .coordinator
            .initiate_payment(&space.id, 1000, "card", "cashier")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Downstream);

        pump(&mut h).await;

        assert_eq!(h.coordinator.active_bindings(), 0);
        let after = h.resources.space(&space.id).unwrap();
        assert_eq!(after.status, SpaceStatus::Occupied);
        assert_eq!(after.current_vehicle.unwrap().plate, "ABC-123");
        assert!(matches!(
            h.integration_events.try_recv().unwrap(),
            Some(ParkingEvent::PaymentReverted { .. })
        ));
    }

    #[tokio::test]
    async fn test_rejects_space_without_vehicle() {
        let h = harness(CoordinationConfig::default()).await;

        let err = h
            .coordinator
            .initiate_payment("A_1", 1000, "cash", "cashier")
            .await
            .unwrap_err();
        assert_eq!(
            err,
            CoordinationError::SpaceNotOccupied {
                space_id: "A_1".into(),
                status: SpaceStatus::Available
            }
        );

        let err = h
            .coordinator
            .initiate_payment("Z_9", 1000, "cash", "cashier")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_validation_failure_leaves_no_binding() {
        let h = harness(CoordinationConfig::default()).await;
        let space = h
            .resources
            .assign_space("ABC-123", VehicleType::Car, None)
            .await
            .unwrap();

        let err = h
            .coordinator
            .initiate_payment(&space.id, 1000, "bitcoin", "cashier")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(h.coordinator.active_bindings(), 0);
        assert_eq!(
            h.resources.space(&space.id).unwrap().status,
            SpaceStatus::Occupied
        );
    }

    #[tokio::test]
    async fn test_confirmation_holds_gate_until_confirmed() {
        let mut h = harness(CoordinationConfig {
            auto_open_gate: true,
            require_confirmation: true,
        })
        .await;
        let space = h
            .resources
            .assign_space("ABC-123", VehicleType::Car, None)
            .await
            .unwrap();

        h.coordinator
            .initiate_payment(&space.id, 1000, "cash", "cashier")
            .await
            .unwrap();
        pump(&mut h).await;

        assert_eq!(
            h.resources.space(&space.id).unwrap().status,
            SpaceStatus::Available
        );
        assert_eq!(h.resources.gate_state("G1"), Some(GateState::Closed));
        assert_eq!(
            h.coordinator.pending_exits(),
            vec![(space.id.clone(), "G1".to_string())]
        );

        assert_eq!(h.coordinator.confirm_exit(&space.id).await.unwrap(), "G1");
        assert_eq!(h.resources.gate_state("G1"), Some(GateState::Open));
        assert_eq!(
            h.coordinator.confirm_exit(&space.id).await,
            Err(CoordinationError::NoPendingExit(space.id.clone()))
        );
    }

    #[tokio::test]
    async fn test_out_of_band_release_drops_binding() {
        let h = harness(CoordinationConfig::default()).await;
        let space = h
            .resources
            .assign_space("ABC-123", VehicleType::Car, None)
            .await
            .unwrap();
        let released = h.resources.release_space("ABC-123").await.unwrap();

        h.coordinator.bindings.bind(TransactionBinding {
            transaction: PaymentTransaction {
                id: "TXN_X".into(),
                ticket_ref: "ABC-123".into(),
                amount: 1000,
                tax: 100,
                total: 1100,
                method_id: "cash".into(),
                status: shared_types::TransactionStatus::Pending,
                created_at: space.updated_at,
                completed_at: None,
                operator: "cashier".into(),
                metadata: serde_json::Map::new(),
                receipt: None,
                error: None,
                original_transaction_id: None,
            },
            space: space.clone(),
            created_at: space.updated_at,
        });

        h.coordinator
            .handle(&ParkingEvent::SpaceReleased {
                space: released,
                plate: "ABC-123".into(),
            })
            .await;
        assert_eq!(h.coordinator.active_bindings(), 0);
    }

    #[tokio::test]
    async fn test_reconcile_settles_binding_with_lost_events() {
        let mut h = harness(CoordinationConfig::default()).await;
        let space = h
            .resources
            .assign_space("ABC-123", VehicleType::Car, None)
            .await
            .unwrap();
        let tx = h
            .coordinator
            .initiate_payment(&space.id, 1000, "cash", "cashier")
            .await
            .unwrap();

        // Nothing pumped: the lifecycle events never reach the coordinator.
        let max_age = Duration::from_secs(60);
        assert_eq!(h.coordinator.reconcile_stale_bindings(max_age).await, 0);
        assert!(h.coordinator.binding(&tx.id).is_some());

        h.clock.advance(chrono::Duration::seconds(61));
        assert_eq!(h.coordinator.reconcile_stale_bindings(max_age).await, 1);
        assert_eq!(h.coordinator.active_bindings(), 0);
        assert_eq!(
            h.resources.space(&space.id).unwrap().status,
            SpaceStatus::Available
        );
        assert_eq!(h.resources.gate_state("G1"), Some(GateState::Open));

        // The late events find nothing left to settle.
        pump(&mut h).await;
        assert!(matches!(
            h.integration_events.try_recv().unwrap(),
            Some(ParkingEvent::PaymentSettled { .. })
        ));
        assert!(matches!(h.integration_events.try_recv(), Ok(None)));
    }

    #[tokio::test]
    async fn test_reconcile_reverts_failed_payment() {
        let mut h = harness(CoordinationConfig::default()).await;
        let space = h
            .resources
            .assign_space("ABC-123", VehicleType::Car, None)
            .await
            .unwrap();
        h.gateway.fail_method(PaymentMethodKind::Card);
        assert!(h
            .coordinator
            .initiate_payment(&space.id, 1000, "card", "cashier")
            .await
            .is_err());

        // Only the initiated event is handled; the failure is lost.
        let initiated = h.payment_events.try_recv().unwrap().unwrap();
        h.coordinator.handle(&initiated).await;
        assert_eq!(
            h.resources.space(&space.id).unwrap().status,
            SpaceStatus::PaymentPending
        );

        assert_eq!(h.coordinator.reconcile_stale_bindings(Duration::ZERO).await, 1);
        let after = h.resources.space(&space.id).unwrap();
        assert_eq!(after.status, SpaceStatus::Occupied);
        assert_eq!(after.current_vehicle.unwrap().plate, "ABC-123");
        assert!(matches!(
            h.integration_events.try_recv().unwrap(),
            Some(ParkingEvent::PaymentReverted { .. })
        ));
    }
}
