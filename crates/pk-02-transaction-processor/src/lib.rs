//! # Transaction Processor Subsystem
//!
//! **Subsystem ID:** 2
//!
//! ## Purpose
//!
//! Validates and prices payments, runs the method-specific charge step,
//! issues receipts and records linked refunds. Every state change of a
//! transaction is announced on the shared bus.
//!
//! ## Transaction Lifecycle
//!
//! ```text
//! prepare_payment          execute_payment
//!      │                         │
//!      ▼                         ▼
//! [PENDING] ── PaymentInitiated ──► charge ──ok──► [COMPLETED] ── PaymentCompleted
//!                                     │                 │
//!                                     └─err/timeout─► [FAILED] ── PaymentFailed
//!                                                       │
//!                       refund_payment ─────────────────┘
//!                              │
//!                              ▼
//!                    new [REFUNDED] record ── RefundCompleted
//! ```
//!
//! Preparation is split from execution so the coordination layer can bind a
//! transaction to a space before `PaymentInitiated` is published.
//!
//! ## Pricing
//!
//! | Field | Value |
//! |-------|-------|
//! | `tax` | `total - amount` |
//! | `total` | `round(amount * (10000 + tax_rate_bps) / 10000)` per `RoundingPolicy` |
//!
//! All amounts are `u64` minor units.
//!
//! ## Module Structure (Hexagonal Architecture)
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  adapters/gateway.rs - SimulatedGateway                         │
//! └─────────────────────────────────────────────────────────────────┘
//!                          ↑ implements ↑
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  ports/inbound.rs  - TransactionProcessorApi, PaymentRequest    │
//! │  ports/outbound.rs - PaymentGateway                             │
//! └─────────────────────────────────────────────────────────────────┘
//!                          ↑ uses ↑
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  domain/entities.rs - PaymentConfig, PaymentMethodKind          │
//! │  domain/pricing.rs  - quote()                                   │
//! │  domain/ledger.rs   - Ledger                                    │
//! │  domain/errors.rs   - PaymentError                              │
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
pub use service::TransactionProcessorService;
