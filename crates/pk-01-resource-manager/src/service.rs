//! # Resource Manager Service
//!
//! Owns the space table. Every mutating operation runs under `write_gate`,
//! mutates under the sync state lock, recounts statistics, then publishes
//! its events after the state lock is released. Holding the gate across the
//! publish keeps this subsystem's events in operation-completion order.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use shared_bus::{EventPublisher, ParkingEvent};
use shared_types::{
    GateId, ParkingSpace, ParkingStats, ParkingZone, SpaceId, SpaceStatus, TimeSource,
    VehicleInfo, VehicleType,
};
use tokio::task::AbortHandle;
use tracing::{debug, info, warn};

use crate::adapters::InMemorySpaceRepository;
use crate::domain::{
    build_zone_spaces, occupy, transition, GateState, ResourceError, ZoneOccupancy, ZoneSpec,
};
use crate::ports::{ResourceManagerApi, SpaceRepository};

struct LotState<R> {
    repo: R,
    gates: BTreeMap<GateId, GateState>,
    stats: ParkingStats,
}

impl<R: SpaceRepository> LotState<R> {
    fn recount(&mut self) {
        self.stats = ParkingStats::from_spaces(self.repo.spaces());
    }

    fn space_mut(&mut self, space_id: &str) -> Result<&mut ParkingSpace, ResourceError> {
        self.repo
            .space_mut(space_id)
            .ok_or_else(|| ResourceError::SpaceNotFound(space_id.to_string()))
    }
}

/// Result of one mutation: the value for the caller plus what to publish.
struct Outcome<T> {
    value: T,
    events: Vec<ParkingEvent>,
    recount: bool,
}

impl<T> Outcome<T> {
    fn unchanged(value: T) -> Self {
        Self {
            value,
            events: Vec::new(),
            recount: false,
        }
    }

    fn changed(value: T, events: Vec<ParkingEvent>) -> Self {
        Self {
            value,
            events,
            recount: true,
        }
    }
}

/// A pending reservation expiry. `generation` guards against a stale timer
/// acting on a later reservation of the same space.
struct ReservationTimer {
    generation: u64,
    handle: AbortHandle,
}

/// The Resource Manager.
pub struct ResourceManagerService<R: SpaceRepository = InMemorySpaceRepository> {
    state: RwLock<LotState<R>>,
    reservations: Mutex<HashMap<SpaceId, ReservationTimer>>,
    next_generation: AtomicU64,
    write_gate: tokio::sync::Mutex<()>,
    publisher: Arc<dyn EventPublisher>,
    clock: Arc<dyn TimeSource>,
    this: Weak<Self>,
}

impl ResourceManagerService<InMemorySpaceRepository> {
    /// Service over an empty in-memory table.
    pub fn in_memory(
        publisher: Arc<dyn EventPublisher>,
        clock: Arc<dyn TimeSource>,
    ) -> Arc<Self> {
        Self::new(InMemorySpaceRepository::new(), publisher, clock)
    }
}

impl<R: SpaceRepository + 'static> ResourceManagerService<R> {
    pub fn new(repo: R, publisher: Arc<dyn EventPublisher>, clock: Arc<dyn TimeSource>) -> Arc<Self> {
        let mut state = LotState {
            repo,
            gates: BTreeMap::new(),
            stats: ParkingStats::default(),
        };
        state.recount();
        Arc::new_cyclic(|this| Self {
            state: RwLock::new(state),
            reservations: Mutex::new(HashMap::new()),
            next_generation: AtomicU64::new(1),
            write_gate: tokio::sync::Mutex::new(()),
            publisher,
            clock,
            this: this.clone(),
        })
    }

    /// Number of armed reservation timers.
    pub fn pending_reservations(&self) -> usize {
        self.reservations.lock().len()
    }

    async fn apply<T, F>(&self, op: F) -> Result<T, ResourceError>
    where
        T: Send,
        F: FnOnce(&mut LotState<R>, DateTime<Utc>) -> Result<Outcome<T>, ResourceError> + Send,
    {
        let _gate = self.write_gate.lock().await;
        let outcome = {
            let mut state = self.state.write();
            let mut outcome = op(&mut *state, self.clock.now())?;
            if outcome.recount {
                state.recount();
                outcome.events.push(ParkingEvent::StatsUpdated {
                    stats: state.stats.clone(),
                });
            }
            outcome
        };
        for event in outcome.events {
            self.publisher.publish(event).await;
        }
        Ok(outcome.value)
    }

    fn arm_reservation_timer(&self, space_id: SpaceId, duration: Duration) {
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let weak = self.this.clone();
        let timer_space = space_id.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            if let Some(service) = weak.upgrade() {
                service.expire_reservation(&timer_space, generation).await;
            }
        })
        .abort_handle();

        let previous = self
            .reservations
            .lock()
            .insert(space_id, ReservationTimer { generation, handle });
        if let Some(previous) = previous {
            previous.handle.abort();
        }
    }

    fn cancel_reservation_timer(&self, space_id: &str) {
        if let Some(timer) = self.reservations.lock().remove(space_id) {
            timer.handle.abort();
            debug!(space_id, "[pk-01] Reservation timer cancelled");
        }
    }

    async fn expire_reservation(&self, space_id: &str, generation: u64) {
        {
            let mut reservations = self.reservations.lock();
            match reservations.get(space_id) {
                Some(timer) if timer.generation == generation => {
                    reservations.remove(space_id);
                }
                _ => return,
            }
        }

        let result = self
            .apply(|state, now| {
                let space = state.space_mut(space_id)?;
                if space.status != SpaceStatus::Reserved {
                    // Consumed or overridden in the meantime.
                    return Ok(Outcome::unchanged(false));
                }
                transition(space, SpaceStatus::Available, now)?;
                Ok(Outcome::changed(
                    true,
                    vec![
                        ParkingEvent::ReservationExpired {
                            space_id: space_id.to_string(),
                        },
                        ParkingEvent::SpaceStatusUpdated {
                            space_id: space_id.to_string(),
                            from: SpaceStatus::Reserved,
                            to: SpaceStatus::Available,
                        },
                    ],
                ))
            })
            .await;

        match result {
            Ok(true) => info!(space_id, "[pk-01] Reservation expired"),
            Ok(false) => debug!(space_id, "[pk-01] Reservation expiry no-op"),
            Err(e) => warn!(space_id, error = %e, "[pk-01] Reservation expiry failed"),
        }
    }

    fn set_gate(
        state: &mut LotState<R>,
        gate_id: &str,
        target: GateState,
    ) -> Result<Outcome<()>, ResourceError> {
        let gate = state
            .gates
            .get_mut(gate_id)
            .ok_or_else(|| ResourceError::GateNotFound(gate_id.to_string()))?;
        *gate = target;
        let event = match target {
            GateState::Open => ParkingEvent::GateOpened {
                gate_id: gate_id.to_string(),
            },
            GateState::Closed => ParkingEvent::GateClosed {
                gate_id: gate_id.to_string(),
            },
        };
        Ok(Outcome {
            value: (),
            events: vec![event],
            recount: false,
        })
    }
}

#[async_trait]
impl<R: SpaceRepository + 'static> ResourceManagerApi for ResourceManagerService<R> {
    async fn initialize_lot(&self, zones: Vec<ZoneSpec>) -> Result<usize, ResourceError> {
        let created = self
            .apply(move |state, now| {
                for spec in &zones {
                    if spec.capacity == 0 {
                        return Err(ResourceError::InvalidInput(format!(
                            "zone {} has zero capacity",
                            spec.id
                        )));
                    }
                    if state.repo.zone(&spec.id).is_some() {
                        return Err(ResourceError::DuplicateZone(spec.id.clone()));
                    }
                }

                let mut created = 0;
                for spec in &zones {
                    let spaces = build_zone_spaces(spec, now);
                    let space_ids = spaces.iter().map(|s| s.id.clone()).collect();
                    created += spaces.len();
                    for space in spaces {
                        state.repo.upsert_space(space);
                    }
                    state.repo.insert_zone(ParkingZone {
                        id: spec.id.clone(),
                        name: spec.name.clone(),
                        vehicle_type: spec.vehicle_type,
                        capacity: spec.capacity,
                        space_ids,
                    });
                    if let Some(gate_id) = &spec.gate_id {
                        state.gates.entry(gate_id.clone()).or_insert(GateState::Closed);
                    }
                }

                Ok(Outcome::changed(
                    created,
                    vec![ParkingEvent::LotInitialized {
                        zones: zones.len(),
                        spaces: created,
                    }],
                ))
            })
            .await?;

        info!(spaces = created, "[pk-01] Lot initialized");
        Ok(created)
    }

    async fn assign_space(
        &self,
        plate: &str,
        vehicle_type: VehicleType,
        ticket_ref: Option<String>,
    ) -> Result<ParkingSpace, ResourceError> {
        let space = self
            .apply(|state, now| {
                if let Some(existing) = state.repo.find_by_plate(plate) {
                    return Err(ResourceError::VehicleAlreadyParked {
                        plate: plate.to_string(),
                        space_id: existing.id.clone(),
                    });
                }
                let space_id = state
                    .repo
                    .spaces()
                    .find(|s| s.vehicle_type == vehicle_type && s.status == SpaceStatus::Available)
                    .map(|s| s.id.clone())
                    .ok_or(ResourceError::NoAvailableSpace(vehicle_type))?;

                let space = state.space_mut(&space_id)?;
                occupy(
                    space,
                    VehicleInfo {
                        plate: plate.to_string(),
                        vehicle_type,
                        entry_time: now,
                        ticket_ref,
                    },
                    now,
                )?;
                let snapshot = space.clone();
                Ok(Outcome::changed(
                    snapshot.clone(),
                    vec![ParkingEvent::SpaceAssigned { space: snapshot }],
                ))
            })
            .await?;

        info!(space_id = %space.id, plate, "[pk-01] Space assigned");
        Ok(space)
    }

    async fn release_space(&self, plate: &str) -> Result<ParkingSpace, ResourceError> {
        let space = self
            .apply(|state, now| {
                let space_id = state
                    .repo
                    .find_by_plate(plate)
                    .map(|s| s.id.clone())
                    .ok_or_else(|| ResourceError::VehicleNotFound(plate.to_string()))?;
                let space = state.space_mut(&space_id)?;
                transition(space, SpaceStatus::Available, now)?;
                let snapshot = space.clone();
                Ok(Outcome::changed(
                    snapshot.clone(),
                    vec![ParkingEvent::SpaceReleased {
                        space: snapshot,
                        plate: plate.to_string(),
                    }],
                ))
            })
            .await?;

        info!(space_id = %space.id, plate, "[pk-01] Space released");
        Ok(space)
    }

    async fn reserve_space(
        &self,
        space_id: &str,
        duration: Duration,
    ) -> Result<ParkingSpace, ResourceError> {
        let hold = chrono::Duration::from_std(duration)
            .ok()
            .filter(|d| *d > chrono::Duration::zero())
            .ok_or_else(|| ResourceError::InvalidInput("reservation duration".to_string()))?;

        let space = self
            .apply(|state, now| {
                let space = state.space_mut(space_id)?;
                if space.status != SpaceStatus::Available {
                    return Err(ResourceError::SpaceNotAvailable {
                        space_id: space_id.to_string(),
                        status: space.status,
                    });
                }
                transition(space, SpaceStatus::Reserved, now)?;
                let until = now + hold;
                space.reserved_until = Some(until);
                let snapshot = space.clone();
                Ok(Outcome::changed(
                    snapshot.clone(),
                    vec![ParkingEvent::SpaceReserved {
                        space: snapshot,
                        until,
                    }],
                ))
            })
            .await?;

        self.arm_reservation_timer(space.id.clone(), duration);
        info!(space_id, ?duration, "[pk-01] Space reserved");
        Ok(space)
    }

    async fn claim_reservation(
        &self,
        space_id: &str,
        plate: &str,
        vehicle_type: VehicleType,
        ticket_ref: Option<String>,
    ) -> Result<ParkingSpace, ResourceError> {
        let space = self
            .apply(|state, now| {
                if let Some(existing) = state.repo.find_by_plate(plate) {
                    return Err(ResourceError::VehicleAlreadyParked {
                        plate: plate.to_string(),
                        space_id: existing.id.clone(),
                    });
                }
                let space = state.space_mut(space_id)?;
                if space.status != SpaceStatus::Reserved {
                    return Err(ResourceError::SpaceNotAvailable {
                        space_id: space_id.to_string(),
                        status: space.status,
                    });
                }
                occupy(
                    space,
                    VehicleInfo {
                        plate: plate.to_string(),
                        vehicle_type,
                        entry_time: now,
                        ticket_ref,
                    },
                    now,
                )?;
                self.cancel_reservation_timer(space_id);
                let snapshot = space.clone();
                Ok(Outcome::changed(
                    snapshot.clone(),
                    vec![ParkingEvent::SpaceAssigned { space: snapshot }],
                ))
            })
            .await?;

        info!(space_id, plate, "[pk-01] Reservation claimed");
        Ok(space)
    }

    async fn cancel_reservation(&self, space_id: &str) -> Result<ParkingSpace, ResourceError> {
        self.apply(|state, now| {
            let space = state.space_mut(space_id)?;
            if space.status != SpaceStatus::Reserved {
                return Err(ResourceError::SpaceNotAvailable {
                    space_id: space_id.to_string(),
                    status: space.status,
                });
            }
            transition(space, SpaceStatus::Available, now)?;
            self.cancel_reservation_timer(space_id);
            Ok(Outcome::changed(
                space.clone(),
                vec![ParkingEvent::SpaceStatusUpdated {
                    space_id: space_id.to_string(),
                    from: SpaceStatus::Reserved,
                    to: SpaceStatus::Available,
                }],
            ))
        })
        .await
    }

    async fn mark_maintenance(
        &self,
        space_id: &str,
        reason: &str,
    ) -> Result<ParkingSpace, ResourceError> {
        let space = self
            .apply(|state, now| {
                let space = state.space_mut(space_id)?;
                if space.status.is_vehicle_present() {
                    return Err(ResourceError::SpaceOccupied(space_id.to_string()));
                }
                if space.status != SpaceStatus::Maintenance {
                    let from = transition(space, SpaceStatus::Maintenance, now)?;
                    if from == SpaceStatus::Reserved {
                        self.cancel_reservation_timer(space_id);
                    }
                }
                space.maintenance_reason = Some(reason.to_string());
                space.updated_at = now;
                let snapshot = space.clone();
                Ok(Outcome::changed(
                    snapshot.clone(),
                    vec![ParkingEvent::SpaceMaintenance {
                        space: snapshot,
                        reason: reason.to_string(),
                    }],
                ))
            })
            .await?;

        warn!(space_id, reason, "[pk-01] Space under maintenance");
        Ok(space)
    }

    async fn clear_maintenance(&self, space_id: &str) -> Result<ParkingSpace, ResourceError> {
        self.apply(|state, now| {
            let space = state.space_mut(space_id)?;
            if space.status != SpaceStatus::Maintenance {
                return Err(ResourceError::InvalidTransition {
                    space_id: space_id.to_string(),
                    from: space.status,
                    to: SpaceStatus::Available,
                });
            }
            transition(space, SpaceStatus::Available, now)?;
            Ok(Outcome::changed(
                space.clone(),
                vec![ParkingEvent::SpaceStatusUpdated {
                    space_id: space_id.to_string(),
                    from: SpaceStatus::Maintenance,
                    to: SpaceStatus::Available,
                }],
            ))
        })
        .await
    }

    async fn update_space_status(
        &self,
        space_id: &str,
        status: SpaceStatus,
    ) -> Result<ParkingSpace, ResourceError> {
        self.apply(|state, now| {
            let space = state.space_mut(space_id)?;
            if space.status == status {
                return Ok(Outcome::unchanged(space.clone()));
            }
            // Vehicles only arrive through assign_space or claim_reservation.
            if status.is_vehicle_present() && space.current_vehicle.is_none() {
                return Err(ResourceError::InvalidTransition {
                    space_id: space_id.to_string(),
                    from: space.status,
                    to: status,
                });
            }
            let from = transition(space, status, now)?;
            if from == SpaceStatus::Reserved {
                self.cancel_reservation_timer(space_id);
            }
            debug!(space_id, %from, to = %status, "[pk-01] Space status updated");
            Ok(Outcome::changed(
                space.clone(),
                vec![ParkingEvent::SpaceStatusUpdated {
                    space_id: space_id.to_string(),
                    from,
                    to: status,
                }],
            ))
        })
        .await
    }

    async fn open_gate(&self, gate_id: &str) -> Result<(), ResourceError> {
        self.apply(|state, _| Self::set_gate(state, gate_id, GateState::Open))
            .await?;
        info!(gate_id, "[pk-01] Gate opened");
        Ok(())
    }

    async fn close_gate(&self, gate_id: &str) -> Result<(), ResourceError> {
        self.apply(|state, _| Self::set_gate(state, gate_id, GateState::Closed))
            .await?;
        info!(gate_id, "[pk-01] Gate closed");
        Ok(())
    }

    fn space(&self, space_id: &str) -> Option<ParkingSpace> {
        self.state.read().repo.space(space_id).cloned()
    }

    fn vehicle_space(&self, plate: &str) -> Option<ParkingSpace> {
        self.state.read().repo.find_by_plate(plate).cloned()
    }

    fn spaces(&self) -> Vec<ParkingSpace> {
        self.state.read().repo.spaces().cloned().collect()
    }

    fn zone(&self, zone_id: &str) -> Option<ParkingZone> {
        self.state.read().repo.zone(zone_id).cloned()
    }

    fn zone_occupancy(&self, zone_id: &str) -> Result<ZoneOccupancy, ResourceError> {
        let state = self.state.read();
        let zone = state
            .repo
            .zone(zone_id)
            .ok_or_else(|| ResourceError::ZoneNotFound(zone_id.to_string()))?;

        let mut occupancy = ZoneOccupancy {
            capacity: zone.capacity,
            ..ZoneOccupancy::default()
        };
        for space in zone.space_ids.iter().filter_map(|id| state.repo.space(id)) {
            match space.status {
                SpaceStatus::Available => occupancy.available += 1,
                s if s.is_vehicle_present() => occupancy.occupied += 1,
                _ => {}
            }
        }
        if occupancy.capacity > 0 {
            occupancy.occupancy_rate =
                occupancy.occupied as f64 / occupancy.capacity as f64 * 100.0;
        }
        Ok(occupancy)
    }

    fn gate_state(&self, gate_id: &str) -> Option<GateState> {
        self.state.read().gates.get(gate_id).copied()
    }

    fn gates(&self) -> Vec<(GateId, GateState)> {
        self.state
            .read()
            .gates
            .iter()
            .map(|(id, state)| (id.clone(), *state))
            .collect()
    }

    fn stats(&self) -> ParkingStats {
        self.state.read().stats.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use shared_bus::{EventFilter, EventTopic, InMemoryEventBus, Subscription};
    use shared_types::{ErrorKind, Classify, MockTimeSource};

    async fn setup() -> (Arc<ResourceManagerService>, Arc<InMemoryEventBus>) {
        let bus = Arc::new(InMemoryEventBus::new());
        let clock = Arc::new(MockTimeSource::new(
            Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap(),
        ));
        let service = ResourceManagerService::in_memory(bus.clone(), clock);
        service
            .initialize_lot(vec![
                ZoneSpec::new("A", VehicleType::Car, 2).with_gate("G1"),
                ZoneSpec::new("M", VehicleType::Motorcycle, 1),
            ])
            .await
            .unwrap();
        (service, bus)
    }

    fn drain(sub: &mut Subscription) -> Vec<ParkingEvent> {
        let mut events = Vec::new();
        while let Ok(Some(event)) = sub.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn test_initialize_lot() {
        let (service, _bus) = setup().await;

        assert_eq!(service.spaces().len(), 3);
        assert_eq!(service.stats().available, 3);
        assert_eq!(service.gate_state("G1"), Some(GateState::Closed));
        assert_eq!(service.zone("A").unwrap().space_ids, vec!["A_1", "A_2"]);
    }

    #[tokio::test]
    async fn test_initialize_rejects_duplicate_zone() {
        let (service, _bus) = setup().await;
        let err = service
            .initialize_lot(vec![ZoneSpec::new("A", VehicleType::Car, 1)])
            .await
            .unwrap_err();
        assert_eq!(err, ResourceError::DuplicateZone("A".into()));
        assert_eq!(service.spaces().len(), 3);
    }

    #[tokio::test]
    async fn test_assign_emits_assignment_then_stats() {
        let (service, bus) = setup().await;
        let mut sub = bus.subscribe(EventFilter::topics(vec![EventTopic::Parking]));

        let space = service
            .assign_space("ABC-123", VehicleType::Car, Some("T-1".into()))
            .await
            .unwrap();

        assert_eq!(space.id, "A_1");
        assert_eq!(space.status, SpaceStatus::Occupied);
        let events = drain(&mut sub);
        assert!(matches!(events[0], ParkingEvent::SpaceAssigned { .. }));
        match &events[1] {
            ParkingEvent::StatsUpdated { stats } => assert_eq!(stats.occupied, 1),
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_assign_until_full() {
        let (service, _bus) = setup().await;
        service.assign_space("C1", VehicleType::Car, None).await.unwrap();
        service.assign_space("C2", VehicleType::Car, None).await.unwrap();

        let err = service
            .assign_space("C3", VehicleType::Car, None)
            .await
            .unwrap_err();
        assert_eq!(err, ResourceError::NoAvailableSpace(VehicleType::Car));

        let err = service
            .assign_space("C1", VehicleType::Motorcycle, None)
            .await
            .unwrap_err();
        assert!(matches!(err, ResourceError::VehicleAlreadyParked { .. }));
    }

    #[tokio::test]
    async fn test_release_from_payment_pending() {
        let (service, _bus) = setup().await;
        let space = service.assign_space("C1", VehicleType::Car, None).await.unwrap();
        service
            .update_space_status(&space.id, SpaceStatus::PaymentPending)
            .await
            .unwrap();

        let released = service.release_space("C1").await.unwrap();

        assert_eq!(released.status, SpaceStatus::Available);
        assert!(service.vehicle_space("C1").is_none());
        assert_eq!(
            service.release_space("C1").await.unwrap_err(),
            ResourceError::VehicleNotFound("C1".into())
        );
    }

    #[tokio::test]
    async fn test_maintenance_blocked_while_occupied() {
        let (service, _bus) = setup().await;
        let space = service.assign_space("C1", VehicleType::Car, None).await.unwrap();

        let err = service.mark_maintenance(&space.id, "leak").await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::StateConflict);
        assert_eq!(service.space(&space.id).unwrap().status, SpaceStatus::Occupied);
    }

    #[tokio::test]
    async fn test_maintenance_roundtrip() {
        let (service, _bus) = setup().await;
        let space = service.mark_maintenance("A_2", "lights out").await.unwrap();
        assert_eq!(space.maintenance_reason.as_deref(), Some("lights out"));
        assert_eq!(service.stats().maintenance, 1);

        let space = service.clear_maintenance("A_2").await.unwrap();
        assert_eq!(space.status, SpaceStatus::Available);
        assert!(space.maintenance_reason.is_none());
    }

    #[tokio::test]
    async fn test_update_status_rejects_non_edges() {
        let (service, _bus) = setup().await;

        let err = service
            .update_space_status("A_1", SpaceStatus::PaymentPending)
            .await
            .unwrap_err();
        assert!(matches!(err, ResourceError::InvalidTransition { .. }));

        // same-status is a no-op
        let space = service
            .update_space_status("A_1", SpaceStatus::Available)
            .await
            .unwrap();
        assert_eq!(space.status, SpaceStatus::Available);

        let err = service
            .update_space_status("Z_9", SpaceStatus::Occupied)
            .await
            .unwrap_err();
        assert_eq!(err, ResourceError::SpaceNotFound("Z_9".into()));
    }

    #[tokio::test]
    async fn test_update_status_cannot_occupy_an_empty_space() {
        let (service, bus) = setup().await;
        let mut sub = bus.subscribe(EventFilter::all());

        let err = service
            .update_space_status("A_1", SpaceStatus::Occupied)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ResourceError::InvalidTransition {
                space_id: "A_1".into(),
                from: SpaceStatus::Available,
                to: SpaceStatus::Occupied,
            }
        );

        service
            .reserve_space("A_2", Duration::from_secs(60))
            .await
            .unwrap();
        let err = service
            .update_space_status("A_2", SpaceStatus::Occupied)
            .await
            .unwrap_err();
        assert!(matches!(err, ResourceError::InvalidTransition { .. }));
        assert_eq!(service.space("A_2").unwrap().status, SpaceStatus::Reserved);

        let stats = service.stats();
        assert_eq!(stats.occupied, 0);
        assert!(!drain(&mut sub)
            .iter()
            .any(|event| matches!(event, ParkingEvent::SpaceStatusUpdated { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reservation_expires() {
        let (service, bus) = setup().await;
        let mut sub = bus.subscribe(EventFilter::all());

        service
            .reserve_space("A_1", Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(service.pending_reservations(), 1);

        tokio::time::sleep(Duration::from_secs(61)).await;
        tokio::task::yield_now().await;

        assert_eq!(service.space("A_1").unwrap().status, SpaceStatus::Available);
        assert_eq!(service.pending_reservations(), 0);
        assert!(drain(&mut sub)
            .iter()
            .any(|e| matches!(e, ParkingEvent::ReservationExpired { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_claimed_reservation_survives_deadline() {
        let (service, _bus) = setup().await;
        service
            .reserve_space("A_1", Duration::from_secs(60))
            .await
            .unwrap();

        service
            .claim_reservation("A_1", "C1", VehicleType::Car, None)
            .await
            .unwrap();
        assert_eq!(service.pending_reservations(), 0);

        tokio::time::sleep(Duration::from_secs(120)).await;
        tokio::task::yield_now().await;

        let space = service.space("A_1").unwrap();
        assert_eq!(space.status, SpaceStatus::Occupied);
        assert_eq!(space.current_vehicle.unwrap().plate, "C1");
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_timer_does_not_cancel_new_reservation() {
        let (service, _bus) = setup().await;
        service
            .reserve_space("A_1", Duration::from_secs(10))
            .await
            .unwrap();
        service.cancel_reservation("A_1").await.unwrap();
        service
            .reserve_space("A_1", Duration::from_secs(100))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_secs(20)).await;
        tokio::task::yield_now().await;

        assert_eq!(service.space("A_1").unwrap().status, SpaceStatus::Reserved);
    }

    #[tokio::test]
    async fn test_reserve_rejects_unavailable() {
        let (service, _bus) = setup().await;
        service.assign_space("C1", VehicleType::Car, None).await.unwrap();

        let err = service
            .reserve_space("A_1", Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, ResourceError::SpaceNotAvailable { .. }));

        let err = service
            .reserve_space("A_2", Duration::ZERO)
            .await
            .unwrap_err();
        assert!(matches!(err, ResourceError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_gates() {
        let (service, bus) = setup().await;
        let mut sub = bus.subscribe(EventFilter::all());

        service.open_gate("G1").await.unwrap();
        assert_eq!(service.gate_state("G1"), Some(GateState::Open));
        service.close_gate("G1").await.unwrap();
        assert_eq!(
            service.open_gate("G9").await.unwrap_err(),
            ResourceError::GateNotFound("G9".into())
        );

        let names: Vec<_> = drain(&mut sub).iter().map(ParkingEvent::name).collect();
        assert_eq!(names, vec!["gate_opened", "gate_closed"]);
    }

    #[tokio::test]
    async fn test_zone_occupancy() {
        let (service, _bus) = setup().await;
        service.assign_space("C1", VehicleType::Car, None).await.unwrap();

        let occupancy = service.zone_occupancy("A").unwrap();
        assert_eq!(occupancy.occupied, 1);
        assert_eq!(occupancy.available, 1);
        assert!((occupancy.occupancy_rate - 50.0).abs() < f64::EPSILON);
        assert!(service.zone_occupancy("Q").is_err());
    }
}
