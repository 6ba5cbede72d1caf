//! Event fan-out to subscribed clients

use focuslock_api::Event;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;

const EVENT_CHANNEL_CAPACITY: usize = 100;

/// Cloneable handle for publishing events.
///
/// Every connected client holds a receiver, but only clients that sent
/// `SubscribeEvents` are counted as subscribers and get events written out.
#[derive(Debug, Clone)]
pub struct EventBroadcaster {
    tx: broadcast::Sender<Event>,
    subscribers: Arc<AtomicUsize>,
}

impl EventBroadcaster {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            tx,
            subscribers: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Publish an event. Dropped silently when nobody is listening.
    pub fn broadcast(&self, event: Event) {
        let _ = self.tx.send(event);
    }

    /// New raw receiver for the event channel
    pub fn receiver(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }

    /// Number of clients subscribed to events
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.load(Ordering::SeqCst)
    }

    pub fn add_subscriber(&self) {
        self.subscribers.fetch_add(1, Ordering::SeqCst);
    }

    pub fn remove_subscriber(&self) {
        let _ = self
            .subscribers
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
    }
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use focuslock_api::EventPayload;

    #[test]
    fn subscriber_count_never_underflows() {
        let events = EventBroadcaster::new();
        events.remove_subscriber();
        assert_eq!(events.subscriber_count(), 0);

        events.add_subscriber();
        events.clone().add_subscriber();
        assert_eq!(events.subscriber_count(), 2);
        events.remove_subscriber();
        assert_eq!(events.subscriber_count(), 1);
    }

    #[tokio::test]
    async fn receivers_get_broadcasts() {
        let events = EventBroadcaster::new();
        let mut rx = events.receiver();

        events.broadcast(Event::new(EventPayload::Shutdown));
        let event = rx.recv().await.unwrap();
        assert!(matches!(event.payload, EventPayload::Shutdown));
    }
}
