//! # Telemetry Cache Subsystem
//!
//! **Subsystem ID:** 4
//!
//! ## Purpose
//!
//! Shared infrastructure for the other subsystems: a bounded connection
//! pool, a TTL key/value cache, a capped performance-metrics history and
//! the cross-domain snapshot view read by reporting.
//!
//! ## Bounded Resources
//!
//! | Resource | Bound | Eviction |
//! |----------|-------|----------|
//! | Connection pool | `pool.size` permits | Waiters time out after `acquire_timeout_ms` |
//! | TTL cache | `cache.max_keys` | Expired first, then oldest inserted |
//! | Metrics history | `history_capacity` | Oldest snapshot |
//! | Response-time samples | `sample_capacity` | Oldest sample |
//!
//! ## Connection Checkout
//!
//! ```text
//! acquire ──► permit (timeout) ──► idle.pop() or factory.connect()
//!                                          │
//!                                          ▼
//!                                  PooledConnection
//!                                          │ Drop
//!                                          ▼
//!                              idle.push(conn), permit released
//! ```
//!
//! ## Module Structure (Hexagonal Architecture)
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  adapters/pool.rs     - ConnectionPool, PooledConnection        │
//! │  adapters/probe.rs    - HostProbe, StaticProbe                  │
//! │  adapters/loopback.rs - LoopbackFactory                         │
//! └─────────────────────────────────────────────────────────────────┘
//!                          ↑ implements ↑
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  ports/inbound.rs  - TelemetryCacheApi trait                    │
//! │  ports/outbound.rs - ConnectionFactory, SystemProbe traits      │
//! └─────────────────────────────────────────────────────────────────┘
//!                          ↑ uses ↑
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  domain/cache.rs   - TtlCache                                   │
//! │  domain/history.rs - MetricsHistory, ResponseSamples            │
//! │  domain/errors.rs  - TelemetryCacheError                        │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

#![cfg_attr(not(test), warn(clippy::unwrap_used))]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;
pub mod view;

pub use adapters::*;
pub use domain::*;
pub use ports::*;
pub use service::TelemetryCacheService;
pub use view::CrossDomainView;
