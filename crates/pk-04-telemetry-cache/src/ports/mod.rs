//! Ports layer for the Telemetry Cache.
//!
//! - Inbound (Driving): `TelemetryCacheApi`
//! - Outbound (Driven): `ConnectionFactory`, `SystemProbe`

pub mod inbound;
pub mod outbound;

pub use inbound::*;
pub use outbound::*;
