//! Outbound (Driven) ports for the Telemetry Cache.

use async_trait::async_trait;

use crate::domain::{ProbeReading, TelemetryCacheError};

/// Opens connections for the pool.
#[async_trait]
pub trait ConnectionFactory<C>: Send + Sync {
    async fn connect(&self) -> Result<C, TelemetryCacheError>;
}

/// Reads host CPU and memory figures.
pub trait SystemProbe: Send + Sync {
    fn read(&self) -> ProbeReading;
}
