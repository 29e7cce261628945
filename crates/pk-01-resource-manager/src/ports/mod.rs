//! Ports layer for the Resource Manager.
//!
//! - Inbound (Driving): `ResourceManagerApi`
//! - Outbound (Driven): `SpaceRepository`

pub mod inbound;
pub mod outbound;

pub use inbound::*;
pub use outbound::*;
