//! # Shared Types Crate
//!
//! Entities that more than one parking subsystem reads or emits.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: every type that travels on the bus or is
//!   snapshotted into the cross-domain view is defined here.
//! - **Owned by one writer**: spaces belong to the Resource Manager,
//!   transactions to the Transaction Processor. Other subsystems only ever
//!   hold clones.
//! - **Minor units**: money is a `u64` count of the smallest currency unit so
//!   rounding is exact.

pub mod entities;
pub mod errors;
pub mod snapshots;
pub mod time;

pub use entities::*;
pub use errors::*;
pub use snapshots::*;
pub use time::{MockTimeSource, SystemTimeSource, TimeSource};

/// Generates a prefixed identifier such as `TXN_4f0c...`.
#[must_use]
pub fn prefixed_id(prefix: &str) -> String {
    format!("{}_{}", prefix, uuid::Uuid::new_v4().simple())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefixed_id_is_unique() {
        let a = prefixed_id("TXN");
        let b = prefixed_id("TXN");
        assert!(a.starts_with("TXN_"));
        assert_ne!(a, b);
    }
}
