//! Ports layer for the Access Controller.
//!
//! - Inbound (Driving): `AccessControllerApi`
//! - Outbound (Driven): `PasswordHasher`

pub mod inbound;
pub mod outbound;

pub use inbound::*;
pub use outbound::*;
