//! # Shared Bus
//!
//! In-process event bus connecting the parking subsystems. A subsystem
//! announces a state change by publishing a [`ParkingEvent`]; it never calls
//! another subsystem to make it react.
//!
//! ```text
//!  pk-01 .. pk-05 ──publish()──► InMemoryEventBus ──subscribe()──► coordination loop
//!                                      │
//!                                      └──event_stream()──► ad-hoc consumers
//! ```
//!
//! One subscription sees events in the order they were published. Anything
//! that must not reorder work for one space or transaction consumes a single
//! subscription from a single task.

#![cfg_attr(not(test), warn(clippy::unwrap_used))]

pub mod events;
pub mod publisher;
pub mod subscriber;

pub use events::{source, EventFilter, EventTopic, ParkingEvent, CACHE_REFRESH_CONTEXT};
pub use publisher::{EventPublisher, InMemoryEventBus};
pub use subscriber::{EventStream, Subscription, SubscriptionError};

/// Backlog a subscription may accumulate before it starts losing events.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;
