//! # Event Publisher
//!
//! Subsystems hold an `Arc<dyn EventPublisher>`; the runtime owns the
//! concrete [`InMemoryEventBus`] and hands out subscriptions.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::{debug, trace};

use crate::events::{EventFilter, EventTopic, ParkingEvent};
use crate::subscriber::{EventStream, Subscription};
use crate::DEFAULT_CHANNEL_CAPACITY;

/// Publishing side of the bus.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Delivers `event` to every live subscription and returns how many
    /// there were. Zero is not an error: nobody may be listening yet.
    async fn publish(&self, event: ParkingEvent) -> usize;

    fn events_published(&self) -> u64;
}

/// Broadcast bus. Every subscription sees every event in publish order and
/// applies its own filter.
pub struct InMemoryEventBus {
    sender: broadcast::Sender<ParkingEvent>,
    published: AtomicU64,
    by_topic: Mutex<HashMap<EventTopic, u64>>,
    capacity: usize,
}

impl InMemoryEventBus {
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// `capacity` is how far the slowest subscription may fall behind
    /// before it starts losing events.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            published: AtomicU64::new(0),
            by_topic: Mutex::new(HashMap::new()),
            capacity,
        }
    }

    /// Only events published after this call are delivered.
    #[must_use]
    pub fn subscribe(&self, filter: EventFilter) -> Subscription {
        debug!(topics = ?filter.topics, "Subscription opened");
        Subscription::new(self.sender.subscribe(), filter)
    }

    #[must_use]
    pub fn event_stream(&self, filter: EventFilter) -> EventStream {
        debug!(topics = ?filter.topics, "Event stream opened");
        EventStream::new(self.sender.subscribe(), filter)
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Events published so far on `topic`.
    #[must_use]
    pub fn published_on(&self, topic: EventTopic) -> u64 {
        self.by_topic.lock().get(&topic).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventBus {
    async fn publish(&self, event: ParkingEvent) -> usize {
        let name = event.name();
        let topic = event.topic();
        self.published.fetch_add(1, Ordering::Relaxed);
        *self.by_topic.lock().entry(topic).or_insert(0) += 1;

        match self.sender.send(event) {
            Ok(receivers) => {
                debug!(event = name, ?topic, receivers, "Event published");
                receivers
            }
            Err(_) => {
                trace!(event = name, ?topic, "Event published with no subscribers");
                0
            }
        }
    }

    fn events_published(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }
}
