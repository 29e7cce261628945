//! # Parking Coordination Runtime
//!
//! ## Startup Sequence
//!
//! 1. Initialize logging and metrics
//! 2. Load configuration (file, then `PK_*` environment overrides)
//! 3. Validate it; the default JWT secret is refused
//! 4. Build the subsystem container and start the runtime
//! 5. Run until Ctrl+C, then shut down gracefully

use anyhow::{Context, Result};
use pk_03_access_controller::DEFAULT_JWT_SECRET;
use pk_runtime::{ParkingRuntime, SubsystemContainer, SystemConfig};
use pk_telemetry::{init_telemetry, TelemetryConfig};
use rand::Rng;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let _telemetry =
        init_telemetry(TelemetryConfig::from_env()).context("failed to initialize telemetry")?;

    let mut config = SystemConfig::from_env().context("failed to load configuration")?;

    // Development only: replace the placeholder secret with a throwaway one.
    if std::env::var("PK_DEV_MODE").is_ok() && config.security.access.jwt_secret == DEFAULT_JWT_SECRET
    {
        let secret: [u8; 32] = rand::thread_rng().gen();
        config.security.access.jwt_secret = hex::encode(secret);
        warn!("PK_DEV_MODE: using an ephemeral JWT secret; sessions will not survive a restart");
    }

    config.validate().context("invalid configuration")?;

    let runtime = ParkingRuntime::new(SubsystemContainer::new(config));
    runtime.start().await.context("failed to start runtime")?;

    info!("Parking runtime is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;

    runtime.shutdown().await;
    Ok(())
}
