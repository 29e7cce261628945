//! # Domain Errors
//!
//! Error types for the Resource Manager.

use shared_types::{Classify, ErrorKind, SpaceStatus, VehicleType};
use thiserror::Error;

/// Resource Manager error type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResourceError {
    /// No `available` space accepts this vehicle type.
    #[error("No available space for vehicle type {0}")]
    NoAvailableSpace(VehicleType),

    /// Plate has no bound space.
    #[error("Vehicle not found: {0}")]
    VehicleNotFound(String),

    /// Plate is already bound to a space.
    #[error("Vehicle {plate} already parked in {space_id}")]
    VehicleAlreadyParked { plate: String, space_id: String },

    #[error("Space not found: {0}")]
    SpaceNotFound(String),

    /// Space is not in a status that allows the request.
    #[error("Space {space_id} not available (status: {status})")]
    SpaceNotAvailable {
        space_id: String,
        status: SpaceStatus,
    },

    /// A vehicle is present in the space.
    #[error("Space {0} is occupied")]
    SpaceOccupied(String),

    /// Requested status change is not an edge of the state machine.
    #[error("Invalid transition for {space_id}: {from} -> {to}")]
    InvalidTransition {
        space_id: String,
        from: SpaceStatus,
        to: SpaceStatus,
    },

    #[error("Space {space_id} accepts {expected}, got {actual}")]
    VehicleTypeMismatch {
        space_id: String,
        expected: VehicleType,
        actual: VehicleType,
    },

    #[error("Zone not found: {0}")]
    ZoneNotFound(String),

    #[error("Zone already exists: {0}")]
    DuplicateZone(String),

    #[error("Gate not found: {0}")]
    GateNotFound(String),

    /// Bad zone layout or reservation duration.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl Classify for ResourceError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput(_) | Self::VehicleTypeMismatch { .. } | Self::DuplicateZone(_) => {
                ErrorKind::Validation
            }
            Self::VehicleNotFound(_)
            | Self::SpaceNotFound(_)
            | Self::ZoneNotFound(_)
            | Self::GateNotFound(_) => ErrorKind::NotFound,
            Self::NoAvailableSpace(_)
            | Self::VehicleAlreadyParked { .. }
            | Self::SpaceNotAvailable { .. }
            | Self::SpaceOccupied(_)
            | Self::InvalidTransition { .. } => ErrorKind::StateConflict,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            ResourceError::SpaceOccupied("A_1".into()).kind(),
            ErrorKind::StateConflict
        );
        assert_eq!(
            ResourceError::SpaceNotFound("A_9".into()).kind(),
            ErrorKind::NotFound
        );
    }

    #[test]
    fn test_error_display() {
        let err = ResourceError::InvalidTransition {
            space_id: "A_1".into(),
            from: SpaceStatus::Occupied,
            to: SpaceStatus::Maintenance,
        };
        assert_eq!(err.to_string(), "Invalid transition for A_1: occupied -> maintenance");
    }
}
