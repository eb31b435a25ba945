//! Order lifecycle events and the port they are published through.

use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use store::OrderStatus;

use crate::snapshot::OrderSnapshot;

/// Trait for domain events.
///
/// Domain events represent facts that have happened in the domain.
/// They are immutable and named in past tense.
pub trait DomainEvent: Clone + Send + Sync {
    /// Returns the event type name, used to route the event to its handlers.
    fn event_type(&self) -> &'static str;
}

/// Events published once the originating transaction has committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum OrderEvent {
    /// A cart was checked out into a new order.
    OrderPlaced(OrderPlacedData),

    /// An administrator moved an order to a different status.
    OrderStatusChanged(OrderStatusChangedData),
}

impl OrderEvent {
    pub const ORDER_PLACED: &'static str = "OrderPlaced";
    pub const ORDER_STATUS_CHANGED: &'static str = "OrderStatusChanged";

    /// The order as it was right after the commit.
    pub fn order(&self) -> &OrderSnapshot {
        match self {
            OrderEvent::OrderPlaced(data) => &data.order,
            OrderEvent::OrderStatusChanged(data) => &data.order,
        }
    }
}

impl DomainEvent for OrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            OrderEvent::OrderPlaced(_) => Self::ORDER_PLACED,
            OrderEvent::OrderStatusChanged(_) => Self::ORDER_STATUS_CHANGED,
        }
    }
}

/// Data for OrderPlaced event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPlacedData {
    pub order: OrderSnapshot,
}

/// Data for OrderStatusChanged event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderStatusChangedData {
    pub order: OrderSnapshot,
    pub old_status: OrderStatus,
    pub new_status: OrderStatus,
}

/// Hands committed events to whoever reacts to them.
///
/// Publishing never fails from the caller's point of view and never waits
/// for handlers to run.
pub trait EventPublisher: Send + Sync {
    fn publish(&self, event: OrderEvent);
}

/// Publisher that drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopPublisher;

impl EventPublisher for NoopPublisher {
    fn publish(&self, event: OrderEvent) {
        tracing::debug!(event_type = event.event_type(), "event dropped, no subscribers");
    }
}

/// Publisher that keeps every event it receives, for tests.
#[derive(Debug, Default)]
pub struct RecordingPublisher {
    events: Mutex<Vec<OrderEvent>>,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of every event published so far.
    pub fn events(&self) -> Vec<OrderEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Returns how many events of the given type were published.
    pub fn count(&self, event_type: &str) -> usize {
        self.events()
            .iter()
            .filter(|event| event.event_type() == event_type)
            .count()
    }
}

impl EventPublisher for RecordingPublisher {
    fn publish(&self, event: OrderEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use common::UserId;
    use store::{Order, PaymentMethod};

    use super::*;

    fn placed() -> OrderEvent {
        let order = Order::new(UserId::new(), "1 Main St", PaymentMethod::Cod);
        OrderEvent::OrderPlaced(OrderPlacedData {
            order: OrderSnapshot::new(&order, Some("ada@example.com".into())),
        })
    }

    #[test]
    fn test_serialized_tag_matches_event_type() {
        let event = placed();
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["type"], event.event_type());
        assert_eq!(json["data"]["order"]["order_status"], "PENDING");

        let back: OrderEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn test_recording_publisher_counts_by_type() {
        let publisher = RecordingPublisher::new();
        publisher.publish(placed());
        publisher.publish(placed());

        assert_eq!(publisher.count(OrderEvent::ORDER_PLACED), 2);
        assert_eq!(publisher.count(OrderEvent::ORDER_STATUS_CHANGED), 0);
        assert_eq!(publisher.events().len(), 2);
    }
}
