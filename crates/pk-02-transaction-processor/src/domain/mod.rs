//! # Domain Layer - Transaction Processor
//!
//! - `entities`: payment methods, rounding policy, configuration
//! - `pricing`: tax and rounding in minor units
//! - `ledger`: transaction storage
//! - `errors`: `PaymentError`

pub mod entities;
pub mod errors;
pub mod ledger;
pub mod pricing;

pub use entities::*;
pub use errors::*;
pub use ledger::Ledger;
pub use pricing::{quote, Quote};
