//! # Event Subscriber
//!
//! Two ways to consume the bus: a [`Subscription`] polled by hand (the
//! coordination loop uses this) or an [`EventStream`] for combinators.
//!
//! A subscription that falls more than the channel capacity behind loses the
//! oldest events. The loss is logged and counted, never surfaced as an error.

use std::pin::Pin;
use std::task::{Context, Poll};

use thiserror::Error;
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::{Stream, StreamExt};
use tracing::warn;

use crate::events::{EventFilter, ParkingEvent};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    #[error("Event bus closed")]
    Closed,
}

pub struct Subscription {
    receiver: broadcast::Receiver<ParkingEvent>,
    filter: EventFilter,
    lagged: u64,
}

impl Subscription {
    pub(crate) fn new(receiver: broadcast::Receiver<ParkingEvent>, filter: EventFilter) -> Self {
        Self {
            receiver,
            filter,
            lagged: 0,
        }
    }

    /// Waits for the next event accepted by the filter. `None` once the bus
    /// is gone.
    pub async fn recv(&mut self) -> Option<ParkingEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if self.filter.matches(&event) => return Some(event),
                Ok(_) => {}
                Err(RecvError::Lagged(missed)) => self.record_lag(missed),
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Non-blocking variant of [`recv`](Self::recv). `Ok(None)` means the
    /// backlog holds nothing this filter accepts.
    pub fn try_recv(&mut self) -> Result<Option<ParkingEvent>, SubscriptionError> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) if self.filter.matches(&event) => return Ok(Some(event)),
                Ok(_) => {}
                Err(TryRecvError::Lagged(missed)) => self.record_lag(missed),
                Err(TryRecvError::Empty) => return Ok(None),
                Err(TryRecvError::Closed) => return Err(SubscriptionError::Closed),
            }
        }
    }

    #[must_use]
    pub fn filter(&self) -> &EventFilter {
        &self.filter
    }

    /// Events this subscription never saw because it fell behind.
    #[must_use]
    pub fn lagged(&self) -> u64 {
        self.lagged
    }

    fn record_lag(&mut self, missed: u64) {
        self.lagged += missed;
        warn!(missed, total = self.lagged, "Subscription lagged behind the bus");
    }
}

/// Filtered `Stream` over the bus.
pub struct EventStream {
    inner: Pin<Box<dyn Stream<Item = ParkingEvent> + Send>>,
    filter: EventFilter,
}

impl EventStream {
    pub(crate) fn new(receiver: broadcast::Receiver<ParkingEvent>, filter: EventFilter) -> Self {
        let accepts = filter.clone();
        let inner = BroadcastStream::new(receiver).filter_map(move |item| match item {
            Ok(event) => accepts.matches(&event).then_some(event),
            Err(BroadcastStreamRecvError::Lagged(missed)) => {
                warn!(missed, "Event stream lagged behind the bus");
                None
            }
        });
        Self {
            inner: Box::pin(inner),
            filter,
        }
    }

    #[must_use]
    pub fn filter(&self) -> &EventFilter {
        &self.filter
    }
}

impl Stream for EventStream {
    type Item = ParkingEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventTopic;
    use crate::publisher::InMemoryEventBus;
    use crate::EventPublisher;
    use std::time::Duration;
    use tokio::time::timeout;

    fn gate_opened(gate: &str) -> ParkingEvent {
        ParkingEvent::GateOpened {
            gate_id: gate.to_string(),
        }
    }

    #[tokio::test]
    async fn test_recv_skips_events_outside_filter() {
        let bus = InMemoryEventBus::new();
        let mut sub = bus.subscribe(EventFilter::topics(vec![EventTopic::Integration]));

        bus.publish(gate_opened("G1")).await;
        bus.publish(ParkingEvent::PaymentReverted {
            transaction_id: "TXN_1".to_string(),
            space_id: "A_1".to_string(),
            error: "declined".to_string(),
        })
        .await;

        let received = timeout(Duration::from_millis(100), sub.recv())
            .await
            .expect("timeout")
            .expect("event");
        assert!(matches!(received, ParkingEvent::PaymentReverted { .. }));
    }

    #[tokio::test]
    async fn test_events_arrive_in_publish_order() {
        let bus = InMemoryEventBus::new();
        let mut sub = bus.subscribe(EventFilter::all());

        for gate in ["G1", "G2", "G3"] {
            bus.publish(gate_opened(gate)).await;
        }

        let mut seen = Vec::new();
        while let Ok(Some(ParkingEvent::GateOpened { gate_id })) = sub.try_recv() {
            seen.push(gate_id);
        }
        assert_eq!(seen, vec!["G1", "G2", "G3"]);
    }

    #[tokio::test]
    async fn test_slow_subscription_counts_lost_events() {
        let bus = InMemoryEventBus::with_capacity(2);
        let mut sub = bus.subscribe(EventFilter::all());

        for gate in ["G1", "G2", "G3", "G4"] {
            bus.publish(gate_opened(gate)).await;
        }

        let first = sub.try_recv().expect("open").expect("event");
        assert!(matches!(first, ParkingEvent::GateOpened { ref gate_id } if gate_id == "G3"));
        assert_eq!(sub.lagged(), 2);
    }

    #[tokio::test]
    async fn test_dropped_subscriptions_release_receivers() {
        let bus = InMemoryEventBus::new();
        {
            let _a = bus.subscribe(EventFilter::all());
            let _b = bus.subscribe(EventFilter::all());
            assert_eq!(bus.subscriber_count(), 2);
        }
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_try_recv_empty() {
        let bus = InMemoryEventBus::new();
        let mut sub = bus.subscribe(EventFilter::all());

        assert!(matches!(sub.try_recv(), Ok(None)));
    }

    #[tokio::test]
    async fn test_event_stream_yields_matching_events() {
        let bus = InMemoryEventBus::new();
        let mut stream = bus.event_stream(EventFilter::topics(vec![EventTopic::Parking]));
        assert_eq!(EventStream::filter(&stream).topics, vec![EventTopic::Parking]);

        bus.publish(ParkingEvent::SessionExpired {
            user_id: "USR_1".into(),
            scope: shared_types::Scope::Parking,
        })
        .await;
        bus.publish(gate_opened("G7")).await;

        let next = timeout(Duration::from_millis(100), stream.next())
            .await
            .expect("timeout")
            .expect("event");
        assert!(matches!(next, ParkingEvent::GateOpened { ref gate_id } if gate_id == "G7"));
    }
}
