//! # Parking Runtime Library
//!
//! Builds the five subsystems, wires them over the shared event bus and runs
//! the periodic scheduler. The `pk-runtime` binary is a thin shell over
//! [`ParkingRuntime`].
//!
//! ## Modules
//!
//! - `container/` - configuration and the subsystem container
//! - `wiring/` - security gate, call router and the coordination bus handlers
//! - `scheduler/` - the cooperative periodic scheduler and its jobs
//! - `runtime.rs` - startup and shutdown sequencing
//!
//! ## Coordination Flow
//!
//! ```text
//! CallRouter::initiate_payment
//!     │ SecurityGate (payment scope)
//!     ▼
//! Transaction Processor ── PaymentInitiated/Completed/Failed ──► Event Bus
//!                                                                  │
//!                                           CoordinationBus ◄──────┘
//!                                                  │
//!                          ┌───────────────────────┼──────────────────────┐
//!                          ▼                       ▼                      ▼
//!                   MetricsObserver     PaymentParkingCoordinator   ReportingBridge
//!                                        (space status, gate,        (cross-domain
//!                                         PaymentSettled/Reverted)    view)
//! ```

#![cfg_attr(not(test), warn(clippy::unwrap_used))]

pub mod container;
pub mod errors;
pub mod runtime;
pub mod scheduler;
pub mod wiring;

pub use container::{
    ConfigError, CoordinationConfig, Infrastructure, IntervalConfig, SecurityConfig,
    SubsystemContainer, SystemConfig,
};
pub use errors::CoordinationError;
pub use runtime::ParkingRuntime;
pub use scheduler::{PeriodicJob, Scheduler};
pub use wiring::{CallRouter, PaymentParkingCoordinator, ReportingBridge, SecurityGate};
