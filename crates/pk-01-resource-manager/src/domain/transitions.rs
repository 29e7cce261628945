//! Pure space state-machine operations.
//!
//! Every mutation of a `ParkingSpace` goes through `transition`, which
//! rejects any change that is not an edge of the state machine and keeps the
//! auxiliary fields consistent with the new status.

use chrono::{DateTime, Utc};
use shared_types::{ParkingSpace, SpaceLocation, SpaceStatus, VehicleInfo};

use super::entities::ZoneSpec;
use super::errors::ResourceError;

/// Moves `space` to `to`. Returns the previous status.
///
/// Leaving `reserved` clears the reservation deadline. Reaching `available`
/// drops the vehicle and maintenance reason.
pub fn transition(
    space: &mut ParkingSpace,
    to: SpaceStatus,
    now: DateTime<Utc>,
) -> Result<SpaceStatus, ResourceError> {
    let from = space.status;
    if !from.can_transition_to(to) {
        return Err(ResourceError::InvalidTransition {
            space_id: space.id.clone(),
            from,
            to,
        });
    }

    space.status = to;
    space.updated_at = now;
    if from == SpaceStatus::Reserved {
        space.reserved_until = None;
    }
    match to {
        SpaceStatus::Available => {
            space.current_vehicle = None;
            space.maintenance_reason = None;
        }
        SpaceStatus::Maintenance => space.current_vehicle = None,
        _ => {}
    }
    Ok(from)
}

/// Binds a vehicle and moves the space to `occupied`.
pub fn occupy(
    space: &mut ParkingSpace,
    vehicle: VehicleInfo,
    now: DateTime<Utc>,
) -> Result<SpaceStatus, ResourceError> {
    if vehicle.vehicle_type != space.vehicle_type {
        return Err(ResourceError::VehicleTypeMismatch {
            space_id: space.id.clone(),
            expected: space.vehicle_type,
            actual: vehicle.vehicle_type,
        });
    }
    let from = transition(space, SpaceStatus::Occupied, now)?;
    space.current_vehicle = Some(vehicle);
    Ok(from)
}

/// Creates the spaces of one zone: ids `{zone}_{n}`, numbers `{TYPE}{n}`.
pub fn build_zone_spaces(spec: &ZoneSpec, now: DateTime<Utc>) -> Vec<ParkingSpace> {
    (1..=spec.capacity)
        .map(|n| ParkingSpace {
            id: format!("{}_{}", spec.id, n),
            number: format!("{}{}", spec.vehicle_type.code(), n),
            zone_id: spec.id.clone(),
            vehicle_type: spec.vehicle_type,
            status: SpaceStatus::Available,
            current_vehicle: None,
            location: spec.floor.map(|floor| SpaceLocation {
                floor,
                section: spec.id.clone(),
                coordinates: None,
            }),
            gate_id: spec.gate_id.clone(),
            maintenance_reason: None,
            reserved_until: None,
            updated_at: now,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::VehicleType;

    fn fresh_space() -> ParkingSpace {
        let spec = ZoneSpec::new("A", VehicleType::Car, 1);
        build_zone_spaces(&spec, Utc::now()).remove(0)
    }

    fn car(plate: &str) -> VehicleInfo {
        VehicleInfo {
            plate: plate.to_string(),
            vehicle_type: VehicleType::Car,
            entry_time: Utc::now(),
            ticket_ref: None,
        }
    }

    #[test]
    fn test_build_zone_spaces() {
        let spec = ZoneSpec::new("B", VehicleType::Truck, 3)
            .on_floor(2)
            .with_gate("G1");
        let spaces = build_zone_spaces(&spec, Utc::now());

        assert_eq!(spaces.len(), 3);
        assert_eq!(spaces[2].id, "B_3");
        assert_eq!(spaces[2].number, "TRUCK3");
        assert_eq!(spaces[0].gate_id.as_deref(), Some("G1"));
        assert_eq!(spaces[0].location.as_ref().map(|l| l.floor), Some(2));
    }

    #[test]
    fn test_full_payment_cycle() {
        let mut space = fresh_space();
        occupy(&mut space, car("ABC-123"), Utc::now()).unwrap();
        transition(&mut space, SpaceStatus::PaymentPending, Utc::now()).unwrap();
        transition(&mut space, SpaceStatus::Available, Utc::now()).unwrap();

        assert_eq!(space.status, SpaceStatus::Available);
        assert!(space.current_vehicle.is_none());
    }

    #[test]
    fn test_rejected_transition_leaves_space_unchanged() {
        let mut space = fresh_space();
        occupy(&mut space, car("ABC-123"), Utc::now()).unwrap();
        let before = space.clone();

        let err = transition(&mut space, SpaceStatus::Maintenance, Utc::now()).unwrap_err();

        assert!(matches!(err, ResourceError::InvalidTransition { .. }));
        assert_eq!(space, before);
    }

    #[test]
    fn test_occupy_rejects_wrong_vehicle_type() {
        let mut space = fresh_space();
        let mut bike = car("M-1");
        bike.vehicle_type = VehicleType::Motorcycle;

        let err = occupy(&mut space, bike, Utc::now()).unwrap_err();
        assert!(matches!(err, ResourceError::VehicleTypeMismatch { .. }));
        assert_eq!(space.status, SpaceStatus::Available);
    }
}
