//! # Domain Errors
//!
//! Error types for the Telemetry Cache.

use shared_types::{Classify, ErrorKind};
use thiserror::Error;

/// Telemetry Cache error type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TelemetryCacheError {
    /// No connection became free within the acquire timeout.
    #[error("Connection pool exhausted after {timeout_ms}ms")]
    PoolExhausted { timeout_ms: u64 },

    #[error("Connection pool closed")]
    PoolClosed,

    /// The connection factory failed to open a connection.
    #[error("Connection error: {0}")]
    Connection(String),

    /// A cached value did not match the requested type.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl Classify for TelemetryCacheError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::Serialization(_) => ErrorKind::Validation,
            Self::PoolExhausted { .. } | Self::PoolClosed | Self::Connection(_) => {
                ErrorKind::Downstream
            }
        }
    }
}
