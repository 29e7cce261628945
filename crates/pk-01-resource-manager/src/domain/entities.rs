//! Resource Manager entities that never leave this subsystem.

use serde::{Deserialize, Serialize};
use shared_types::{GateId, VehicleType, ZoneId};

/// Input describing one zone to create at lot initialisation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneSpec {
    pub id: ZoneId,
    pub name: String,
    pub vehicle_type: VehicleType,
    pub capacity: usize,
    pub floor: Option<i32>,
    pub gate_id: Option<GateId>,
}

impl ZoneSpec {
    pub fn new(id: impl Into<String>, vehicle_type: VehicleType, capacity: usize) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            vehicle_type,
            capacity,
            floor: None,
            gate_id: None,
        }
    }

    #[must_use]
    pub fn with_gate(mut self, gate_id: impl Into<String>) -> Self {
        self.gate_id = Some(gate_id.into());
        self
    }

    #[must_use]
    pub fn on_floor(mut self, floor: i32) -> Self {
        self.floor = Some(floor);
        self
    }
}

/// Derived occupancy of a single zone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ZoneOccupancy {
    pub capacity: usize,
    pub occupied: usize,
    pub available: usize,
    pub occupancy_rate: f64,
}

/// Physical state of a gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateState {
    Open,
    Closed,
}
