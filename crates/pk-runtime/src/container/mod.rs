//! # Subsystem Container
//!
//! Central container holding all subsystem instances with their
//! configuration and injected infrastructure.
//!
//! - Subsystems initialized in dependency order
//! - Cross-subsystem reactions happen on the event bus, not inside services

pub mod config;
pub mod subsystems;

pub use config::{ConfigError, CoordinationConfig, IntervalConfig, SecurityConfig, SystemConfig};
pub use subsystems::{Infrastructure, SubsystemContainer};
