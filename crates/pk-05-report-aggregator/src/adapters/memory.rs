//! `ReportDataSource` over a snapshot held in memory.

use async_trait::async_trait;
use parking_lot::RwLock;
use shared_types::CrossDomainSnapshot;

use crate::domain::{DateRange, ReportError};
use crate::ports::ReportDataSource;

/// Serves whatever snapshot was last stored. Range filtering happens in
/// gathering, so `load` ignores it.
#[derive(Debug, Default)]
pub struct InMemoryDataSource {
    snapshot: RwLock<CrossDomainSnapshot>,
}

impl InMemoryDataSource {
    pub fn new(snapshot: CrossDomainSnapshot) -> Self {
        Self {
            snapshot: RwLock::new(snapshot),
        }
    }

    pub fn set(&self, snapshot: CrossDomainSnapshot) {
        *self.snapshot.write() = snapshot;
    }
}

#[async_trait]
impl ReportDataSource for InMemoryDataSource {
    async fn load(&self, _range: &DateRange) -> Result<CrossDomainSnapshot, ReportError> {
        Ok(self.snapshot.read().clone())
    }
}
