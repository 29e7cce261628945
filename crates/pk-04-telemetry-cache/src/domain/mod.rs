//! # Domain Layer - Telemetry Cache
//!
//! - `cache`: bounded TTL store
//! - `history`: metrics ring and response-time window
//! - `entities`: configuration and value types
//! - `errors`: `TelemetryCacheError`

pub mod cache;
pub mod entities;
pub mod errors;
pub mod history;

pub use cache::TtlCache;
pub use entities::*;
pub use errors::*;
pub use history::{MetricsHistory, ResponseSamples};
