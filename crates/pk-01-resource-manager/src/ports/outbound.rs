//! Outbound (Driven) ports for the Resource Manager.

use shared_types::{ParkingSpace, ParkingZone};

/// Storage boundary for the space table.
///
/// The service serialises all access behind its own lock, so implementations
/// need not be internally synchronised. Iteration order must be stable;
/// `assign_space` picks the first available match.
pub trait SpaceRepository: Send + Sync {
    fn space(&self, id: &str) -> Option<&ParkingSpace>;

    fn space_mut(&mut self, id: &str) -> Option<&mut ParkingSpace>;

    /// Inserts or replaces a space.
    fn upsert_space(&mut self, space: ParkingSpace);

    fn spaces(&self) -> Box<dyn Iterator<Item = &ParkingSpace> + '_>;

    fn zone(&self, id: &str) -> Option<&ParkingZone>;

    fn insert_zone(&mut self, zone: ParkingZone);

    fn zones(&self) -> Box<dyn Iterator<Item = &ParkingZone> + '_>;

    /// Space currently holding `plate`, if any.
    fn find_by_plate(&self, plate: &str) -> Option<&ParkingSpace> {
        self.spaces().find(|space| {
            space.status.is_vehicle_present()
                && space
                    .current_vehicle
                    .as_ref()
                    .is_some_and(|vehicle| vehicle.plate == plate)
        })
    }
}
