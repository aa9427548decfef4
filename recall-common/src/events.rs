//! Broadcast event bus
//!
//! Services define their own event enum and share one `EventBus<E>` among
//! producers (worker tasks) and consumers (log sinks, tests).

use tokio::sync::broadcast;

/// Multi-producer, multi-consumer event bus backed by `tokio::sync::broadcast`
///
/// Subscribers that fall more than `capacity` events behind miss the oldest
/// ones and observe `RecvError::Lagged`.
///
/// # Examples
///
/// ```
/// use recall_common::events::EventBus;
///
/// let bus: EventBus<String> = EventBus::new(16);
/// let mut rx = bus.subscribe();
/// bus.emit_lossy("hello".to_string());
/// assert_eq!(rx.try_recv().unwrap(), "hello");
/// ```
#[derive(Clone)]
pub struct EventBus<E> {
    tx: broadcast::Sender<E>,
    capacity: usize,
}

impl<E: Clone> EventBus<E> {
    /// Creates a new EventBus with specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx, capacity: capacity.max(1) }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<E> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists,
    /// `Err` if nobody is listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(&self, event: E) -> Result<usize, broadcast::error::SendError<E>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: E) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_without_subscribers_fails() {
        let bus: EventBus<u32> = EventBus::new(4);
        assert!(bus.emit(1).is_err());
        bus.emit_lossy(2);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_every_subscriber_receives_event() {
        let bus: EventBus<u32> = EventBus::new(4);
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();

        assert_eq!(bus.emit(7).unwrap(), 2);
        assert_eq!(a.recv().await.unwrap(), 7);
        assert_eq!(b.recv().await.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_slow_subscriber_lags() {
        let bus: EventBus<u32> = EventBus::new(2);
        let mut rx = bus.subscribe();
        for i in 0..5 {
            bus.emit_lossy(i);
        }

        assert!(matches!(
            rx.recv().await,
            Err(broadcast::error::RecvError::Lagged(3))
        ));
        assert_eq!(rx.recv().await.unwrap(), 3);
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let bus: EventBus<u32> = EventBus::new(0);
        assert_eq!(bus.capacity(), 1);
    }
}
