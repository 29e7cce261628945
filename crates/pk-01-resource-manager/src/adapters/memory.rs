//! In-memory space table.

use std::collections::HashMap;

use shared_types::{ParkingSpace, ParkingZone};

use crate::ports::SpaceRepository;

/// Insertion-ordered in-memory repository.
#[derive(Debug, Default)]
pub struct InMemorySpaceRepository {
    spaces: Vec<ParkingSpace>,
    index: HashMap<String, usize>,
    zones: Vec<ParkingZone>,
}

impl InMemorySpaceRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SpaceRepository for InMemorySpaceRepository {
    fn space(&self, id: &str) -> Option<&ParkingSpace> {
        self.index.get(id).map(|&i| &self.spaces[i])
    }

    fn space_mut(&mut self, id: &str) -> Option<&mut ParkingSpace> {
        match self.index.get(id) {
            Some(&i) => self.spaces.get_mut(i),
            None => None,
        }
    }

    fn upsert_space(&mut self, space: ParkingSpace) {
        match self.index.get(&space.id) {
            Some(&i) => self.spaces[i] = space,
            None => {
                self.index.insert(space.id.clone(), self.spaces.len());
                self.spaces.push(space);
            }
        }
    }

    fn spaces(&self) -> Box<dyn Iterator<Item = &ParkingSpace> + '_> {
        Box::new(self.spaces.iter())
    }

    fn zone(&self, id: &str) -> Option<&ParkingZone> {
        self.zones.iter().find(|zone| zone.id == id)
    }

    fn insert_zone(&mut self, zone: ParkingZone) {
        self.zones.retain(|existing| existing.id != zone.id);
        self.zones.push(zone);
    }

    fn zones(&self) -> Box<dyn Iterator<Item = &ParkingZone> + '_> {
        Box::new(self.zones.iter())
    }
}
