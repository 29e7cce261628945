//! # Parking Telemetry
//!
//! Structured logging and Prometheus metrics for the parking coordination
//! core.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use pk_telemetry::{init_telemetry, TelemetryConfig};
//!
//! let _guard = init_telemetry(TelemetryConfig::from_env())?;
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `PK_SERVICE_NAME` | `parking-core` | Service name in the startup log |
//! | `PK_LOG_LEVEL` / `RUST_LOG` | `info` | Log filter |
//! | `PK_CONSOLE_OUTPUT` | `true` | Write logs to stdout |
//! | `PK_JSON_LOGS` | `false` (`true` in containers) | JSON log lines |

#![cfg_attr(not(test), warn(clippy::unwrap_used))]

mod config;
pub mod metrics;
mod tracing_setup;

pub use config::TelemetryConfig;
pub use metrics::{
    gather_metrics, register_metrics, HistogramTimer, ACCESS_DENIED, BUS_EVENTS,
    HANDLER_DURATION, JOB_FAILURES, LOGINS, PAYMENTS, PAYMENT_AMOUNT, REPORTS, SPACES_OCCUPIED,
    SPACE_TRANSITIONS,
};
pub use tracing_setup::env_filter;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("tracing subscriber rejected: {0}")]
    TracerInit(String),

    #[error("metrics registry: {0}")]
    MetricsInit(String),

    #[error("bad telemetry setting: {0}")]
    Config(String),
}

/// Registers the metric families, then installs the global subscriber.
/// Keep the returned guard alive until the process exits.
pub fn init_telemetry(config: TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    register_metrics()?;
    tracing_setup::init_tracing(&config)?;
    Ok(TelemetryGuard {
        service_name: config.service_name,
    })
}

pub struct TelemetryGuard {
    service_name: String,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        tracing::info!(service = %self.service_name, "Telemetry stopped");
    }
}
