//! Change notifications for scan store subscribers.
//!
//! Every committed command publishes one [`StoreEvent`] on a broadcast
//! channel. History views subscribe instead of polling the store.

use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Something that changed in the scan store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StoreEvent {
    ItemAdded { id: Uuid, content: String },
    ItemRemoved { id: Uuid },
    ItemsCleared { removed: usize },
    ItemUpdated { id: Uuid, content: String, bound: bool },
}

impl StoreEvent {
    /// Dot-namespaced event name, used as the SSE event field.
    pub fn event_type(&self) -> &'static str {
        match self {
            StoreEvent::ItemAdded { .. } => "item.added",
            StoreEvent::ItemRemoved { .. } => "item.removed",
            StoreEvent::ItemsCleared { .. } => "items.cleared",
            StoreEvent::ItemUpdated { .. } => "item.updated",
        }
    }
}

/// Fan-out channel for [`StoreEvent`]s.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<StoreEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publish to all subscribers. Dropped silently when nobody listens.
    pub fn emit(&self, event: StoreEvent) {
        tracing::debug!(
            event_type = event.event_type(),
            subscriber_count = self.tx.receiver_count(),
            "EventBus emit"
        );
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_events_in_order() {
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe();
        let id = Uuid::new_v4();
        bus.emit(StoreEvent::ItemRemoved { id });
        bus.emit(StoreEvent::ItemsCleared { removed: 2 });

        assert_eq!(rx.recv().await.unwrap(), StoreEvent::ItemRemoved { id });
        assert_eq!(
            rx.recv().await.unwrap(),
            StoreEvent::ItemsCleared { removed: 2 }
        );
    }

    #[test]
    fn emit_without_subscribers_is_fine() {
        let bus = EventBus::new(4);
        bus.emit(StoreEvent::ItemsCleared { removed: 0 });
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn serializes_with_type_tag() {
        let json = serde_json::to_value(StoreEvent::ItemsCleared { removed: 3 }).unwrap();
        assert_eq!(json["type"], "items_cleared");
        assert_eq!(json["removed"], 3);
    }
}
