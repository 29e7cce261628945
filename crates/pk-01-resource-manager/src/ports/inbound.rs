//! # Inbound Port - ResourceManagerApi
//!
//! Primary driving port exposing the space lifecycle. The coordination
//! layer only talks to the Resource Manager through this trait.

use std::time::Duration;

use async_trait::async_trait;
use shared_types::{GateId, ParkingSpace, ParkingStats, ParkingZone, SpaceStatus, VehicleType};

use crate::domain::{GateState, ResourceError, ZoneOccupancy, ZoneSpec};

/// Primary API for the Resource Manager.
#[async_trait]
pub trait ResourceManagerApi: Send + Sync {
    /// Creates zones and their spaces.
    ///
    /// # Errors
    /// - `DuplicateZone`: zone id already present
    /// - `InvalidInput`: zero capacity
    async fn initialize_lot(&self, zones: Vec<ZoneSpec>) -> Result<usize, ResourceError>;

    /// Binds `plate` to the first available space of `vehicle_type`.
    ///
    /// # Errors
    /// - `NoAvailableSpace`: no matching space is `available`
    /// - `VehicleAlreadyParked`: plate already has a space
    async fn assign_space(
        &self,
        plate: &str,
        vehicle_type: VehicleType,
        ticket_ref: Option<String>,
    ) -> Result<ParkingSpace, ResourceError>;

    /// Unbinds `plate`; allowed from `occupied` or `payment_pending`.
    ///
    /// # Errors
    /// - `VehicleNotFound`: plate has no bound space
    async fn release_space(&self, plate: &str) -> Result<ParkingSpace, ResourceError>;

    /// Reserves an `available` space. It reverts to `available` after
    /// `duration` unless claimed or cancelled first.
    async fn reserve_space(
        &self,
        space_id: &str,
        duration: Duration,
    ) -> Result<ParkingSpace, ResourceError>;

    /// Consumes a reservation: `reserved → occupied`.
    async fn claim_reservation(
        &self,
        space_id: &str,
        plate: &str,
        vehicle_type: VehicleType,
        ticket_ref: Option<String>,
    ) -> Result<ParkingSpace, ResourceError>;

    /// `reserved → available` before the timer fires.
    async fn cancel_reservation(&self, space_id: &str) -> Result<ParkingSpace, ResourceError>;

    /// # Errors
    /// - `SpaceOccupied`: a vehicle is present
    async fn mark_maintenance(
        &self,
        space_id: &str,
        reason: &str,
    ) -> Result<ParkingSpace, ResourceError>;

    async fn clear_maintenance(&self, space_id: &str) -> Result<ParkingSpace, ResourceError>;

    /// Direct status override used by the coordination layer.
    ///
    /// Same-status requests are no-ops. Other requests must be state
    /// machine edges, and a status that implies a parked vehicle is only
    /// reachable from a space that already holds one.
    async fn update_space_status(
        &self,
        space_id: &str,
        status: SpaceStatus,
    ) -> Result<ParkingSpace, ResourceError>;

    async fn open_gate(&self, gate_id: &str) -> Result<(), ResourceError>;

    async fn close_gate(&self, gate_id: &str) -> Result<(), ResourceError>;

    fn space(&self, space_id: &str) -> Option<ParkingSpace>;

    fn vehicle_space(&self, plate: &str) -> Option<ParkingSpace>;

    fn spaces(&self) -> Vec<ParkingSpace>;

    fn zone(&self, zone_id: &str) -> Option<ParkingZone>;

    fn zone_occupancy(&self, zone_id: &str) -> Result<ZoneOccupancy, ResourceError>;

    fn gate_state(&self, gate_id: &str) -> Option<GateState>;

    fn gates(&self) -> Vec<(GateId, GateState)>;

    fn stats(&self) -> ParkingStats;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_is_object_safe() {
        fn _assert_object_safe(_: &dyn ResourceManagerApi) {}
    }
}
