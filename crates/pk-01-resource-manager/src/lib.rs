//! # Resource Manager Subsystem
//!
//! **Subsystem ID:** 1
//!
//! ## Purpose
//!
//! Owns the parking space table: assignment, release, reservation with timed
//! expiry, maintenance, gates, and derived occupancy statistics. Every state
//! change is announced on the shared bus followed by a fresh `StatsUpdated`.
//!
//! ## Space State Machine
//!
//! ```text
//!            ┌──────── assign ────────┐
//!            │                        ▼
//! [AVAILABLE] ◄──── release ───── [OCCUPIED] ◄──┐
//!   │  ▲  ▲                          │          │ revert
//!   │  │  │                          ▼          │
//!   │  │  └──── release ──── [PAYMENT_PENDING] ─┘
//!   │  │
//!   │  ├── expire/cancel ── [RESERVED] ── claim ──► [OCCUPIED]
//!   │  │
//!   │  └──── clear ──────── [MAINTENANCE]
//!   │
//!   └── reserve / mark_maintenance
//! ```
//!
//! ## Domain Invariants
//!
//! | Invariant | Enforcement Location |
//! |-----------|---------------------|
//! | Vehicle present only in `occupied` / `payment_pending` | `domain/transitions.rs` - `transition()` |
//! | Status changes follow state machine edges | `SpaceStatus::can_transition_to` |
//! | One space per plate | `service.rs` - `assign_space()` |
//! | Stats equal a recount of the table | `service.rs` - `apply()` |
//! | Stale reservation timers are no-ops | `service.rs` - generation check |
//!
//! ## Module Structure (Hexagonal Architecture)
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  adapters/memory.rs - InMemorySpaceRepository                   │
//! └─────────────────────────────────────────────────────────────────┘
//!                          ↑ implements ↑
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  ports/inbound.rs  - ResourceManagerApi trait                   │
//! │  ports/outbound.rs - SpaceRepository trait                      │
//! └─────────────────────────────────────────────────────────────────┘
//!                          ↑ uses ↑
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  domain/entities.rs    - ZoneSpec, ZoneOccupancy, GateState     │
//! │  domain/transitions.rs - transition(), occupy()                 │
//! │  domain/errors.rs      - ResourceError enum                     │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

#![cfg_attr(not(test), warn(clippy::unwrap_used))]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::*;
pub use domain::*;
pub use ports::*;
pub use service::ResourceManagerService;
