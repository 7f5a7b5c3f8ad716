//! In-process event dispatch.
//!
//! The [`EventBus`] is the boundary the receiver hands decoded messages to.
//! It is a thin wrapper over `tokio::sync::broadcast`: publishing is
//! fire-and-forget and non-blocking, and subscribers that fall behind lose
//! the oldest events rather than exerting backpressure on the receiver.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use tokio::sync::broadcast::{self, Receiver, Sender};

/// Type-erased decoded message payload.
///
/// Channel codecs produce this; typed subscribers recover the concrete type
/// with [`Dispatch::downcast`].
pub type DispatchPayload = Arc<dyn Any + Send + Sync>;

/// A decoded message routed to its destination.
#[derive(Clone)]
pub struct Dispatch {
    routing_key: Arc<str>,
    payload: DispatchPayload,
}

impl Dispatch {
    /// Returns the routing key this message was dispatched under.
    #[must_use]
    pub fn routing_key(&self) -> &str {
        &self.routing_key
    }

    /// Recovers the typed payload, if `T` is the channel's payload type.
    #[must_use]
    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        Arc::clone(&self.payload).downcast::<T>().ok()
    }
}

impl fmt::Debug for Dispatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatch")
            .field("routing_key", &self.routing_key)
            .finish_non_exhaustive()
    }
}

/// Broadcast bus for dispatching decoded messages to in-process subscribers.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: Sender<Dispatch>,
}

impl EventBus {
    /// Creates a new bus buffering up to `capacity` undelivered events per
    /// subscriber.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribes to all dispatched messages.
    ///
    /// Subscribers filter by [`Dispatch::routing_key`] and downcast to
    /// their payload type.
    #[must_use]
    pub fn subscribe(&self) -> Receiver<Dispatch> {
        self.sender.subscribe()
    }

    /// Dispatches a decoded message under the given routing key.
    ///
    /// Returns the number of subscribers the message reached. Zero
    /// subscribers is not an error.
    pub fn publish(&self, routing_key: &str, payload: DispatchPayload) -> usize {
        self.sender
            .send(Dispatch {
                routing_key: Arc::from(routing_key),
                payload,
            })
            .unwrap_or(0)
    }

    /// Returns the number of active subscribers.
    #[must_use]
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_reaches_subscriber() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();

        let reached = bus.publish("messages.events", Arc::new(42_u64));
        assert_eq!(reached, 1);

        let dispatch = rx.recv().await.unwrap();
        assert_eq!(dispatch.routing_key(), "messages.events");
        assert_eq!(*dispatch.downcast::<u64>().unwrap(), 42);
    }

    #[tokio::test]
    async fn test_downcast_wrong_type_is_none() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();

        bus.publish("messages.events", Arc::new("text".to_string()));
        let dispatch = rx.recv().await.unwrap();
        assert!(dispatch.downcast::<u64>().is_none());
        assert!(dispatch.downcast::<String>().is_some());
    }

    #[test]
    fn test_publish_without_subscribers_is_fire_and_forget() {
        let bus = EventBus::new(8);
        assert_eq!(bus.receiver_count(), 0);
        assert_eq!(bus.publish("messages.events", Arc::new(1_u8)), 0);
    }
}
