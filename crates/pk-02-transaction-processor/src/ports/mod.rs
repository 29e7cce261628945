//! Ports layer for the Transaction Processor.
//!
//! - Inbound (Driving): `TransactionProcessorApi`
//! - Outbound (Driven): `PaymentGateway`

pub mod inbound;
pub mod outbound;

pub use inbound::*;
pub use outbound::*;
