//! # Cross-Subsystem Wiring
//!
//! Everything that connects subsystems lives here; the services themselves
//! never call each other.
//!
//! ```text
//!   callers ──► CallRouter ──► SecurityGate ──► subsystem APIs
//!
//!   event bus ──► CoordinationBus ──┬─► MetricsObserver
//!                                   ├─► PaymentParkingCoordinator
//!                                   └─► ReportingBridge
//! ```

pub mod bindings;
pub mod event_loop;
pub mod observer;
pub mod payment_parking;
pub mod reporting;
pub mod router;
pub mod security_gate;

pub use bindings::{BindingTable, TransactionBinding};
pub use event_loop::CoordinationBus;
pub use observer::MetricsObserver;
pub use payment_parking::PaymentParkingCoordinator;
pub use reporting::{ReportingBridge, ViewDataSource};
pub use router::{CallRouter, REFUND_PERMISSION};
pub use security_gate::SecurityGate;
