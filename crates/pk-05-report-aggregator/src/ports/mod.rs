//! Ports layer for the Report Aggregator.
//!
//! - Inbound (Driving): `ReportAggregatorApi`
//! - Outbound (Driven): `ReportDataSource`, `ReportRenderer`

pub mod inbound;
pub mod outbound;

pub use inbound::*;
pub use outbound::*;
