//! # Domain Layer - Report Aggregator
//!
//! - `entities`: templates, reports, date ranges
//! - `gather`: per-kind data gathering
//! - `schedule`: schedule strings and due-time rules
//! - `errors`: `ReportError`

pub mod entities;
pub mod errors;
pub mod gather;
pub mod schedule;

pub use entities::*;
pub use errors::*;
pub use gather::*;
pub use schedule::*;
