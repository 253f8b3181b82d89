//! Lifecycle event bus.
//!
//! Replaces bubbling DOM custom events with an explicit subscriber
//! registration surface: external code (analytics, other modules)
//! subscribes for a receiver; delivery is fire-and-forget and never
//! awaited.

use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::domain::entities::ElementId;

/// A lifecycle notification for one image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LazyLoadEvent {
    /// The resolved source was copied onto the element.
    Loaded {
        /// The element that finished loading.
        element: ElementId,
        /// The resolved URL.
        url: String,
    },
    /// The task reached terminal failure.
    LoadError {
        /// The element that failed.
        element: ElementId,
        /// Description of the final error.
        error: String,
        /// Probe attempts consumed (0 for a missing source).
        attempts: u32,
    },
}

/// Fan-out of lifecycle events to any number of subscribers.
#[derive(Debug, Default)]
pub struct EventBus {
    subscribers: Mutex<Vec<mpsc::UnboundedSender<LazyLoadEvent>>>,
}

impl EventBus {
    /// Creates an empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a subscriber and returns its receiver.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<LazyLoadEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.lock().push(tx);
        rx
    }

    /// Delivers an event to all live subscribers, dropping closed ones.
    pub fn emit(&self, event: &LazyLoadEvent) {
        self.subscribers
            .lock()
            .retain(|tx| tx.send(event.clone()).is_ok());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_delivery_to_all_subscribers() {
        let bus = EventBus::new();
        let mut rx_a = bus.subscribe();
        let mut rx_b = bus.subscribe();

        let event = LazyLoadEvent::Loaded {
            element: ElementId::new(1),
            url: "a.jpg".to_string(),
        };
        bus.emit(&event);

        assert_eq!(rx_a.recv().await, Some(event.clone()));
        assert_eq!(rx_b.recv().await, Some(event));
    }

    #[tokio::test]
    async fn test_closed_subscribers_are_pruned() {
        let bus = EventBus::new();
        drop(bus.subscribe());
        let mut live = bus.subscribe();

        bus.emit(&LazyLoadEvent::LoadError {
            element: ElementId::new(2),
            error: "probe failed".to_string(),
            attempts: 3,
        });

        assert!(live.recv().await.is_some());
        assert_eq!(bus.subscribers.lock().len(), 1);
    }
}
