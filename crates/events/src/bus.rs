//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! Handlers publish an [`OrderEvent`] after their transaction commits.
//! Subscribers (the email notifier) run as background tasks and never
//! block the request that produced the event.

use chrono::{DateTime, Utc};
use orderflow_core::types::DbId;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// OrderEvent
// ---------------------------------------------------------------------------

/// Something that happened to an order.
///
/// Constructed via [`OrderEvent::new`] and enriched with the builder
/// methods [`with_product`](OrderEvent::with_product),
/// [`with_actor`](OrderEvent::with_actor),
/// [`with_recipients`](OrderEvent::with_recipients) and
/// [`with_payload`](OrderEvent::with_payload).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderEvent {
    /// Dot-separated event name, e.g. `"product.route"` or `"order.submit"`.
    pub event_type: String,

    pub order_id: DbId,

    /// Set for product-level events.
    pub product_id: Option<DbId>,

    /// The user whose action produced the event.
    pub actor_user_id: Option<DbId>,

    /// Users that were notified in-app; external channels reuse this list.
    pub recipients: Vec<DbId>,

    /// Human-readable summary, identical to the in-app notification text.
    pub message: String,

    /// Event-specific data.
    pub payload: serde_json::Value,

    pub timestamp: DateTime<Utc>,
}

impl OrderEvent {
    pub fn new(event_type: impl Into<String>, order_id: DbId, message: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            order_id,
            product_id: None,
            actor_user_id: None,
            recipients: Vec::new(),
            message: message.into(),
            payload: serde_json::Value::Object(Default::default()),
            timestamp: Utc::now(),
        }
    }

    pub fn with_product(mut self, product_id: DbId) -> Self {
        self.product_id = Some(product_id);
        self
    }

    pub fn with_actor(mut self, user_id: DbId) -> Self {
        self.actor_user_id = Some(user_id);
        self
    }

    pub fn with_recipients(mut self, recipients: Vec<DbId>) -> Self {
        self.recipients = recipients;
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
///
/// Shared via `Arc<EventBus>`. Every subscriber independently receives every
/// published [`OrderEvent`].
///
/// ```rust
/// use orderflow_events::bus::{EventBus, OrderEvent};
///
/// let bus = EventBus::default();
/// let mut rx = bus.subscribe();
///
/// bus.publish(OrderEvent::new("order.submit", 1, "Order ORD-2026-000001 was submitted"));
/// ```
pub struct EventBus {
    sender: broadcast::Sender<OrderEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full the oldest unconsumed events are dropped and
    /// slow receivers observe `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    ///
    /// With no subscribers the event is dropped; the in-app notification
    /// rows are already committed by then.
    pub fn publish(&self, event: OrderEvent) {
        // A SendError only means there are zero receivers.
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<OrderEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
