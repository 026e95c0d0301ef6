use tokio::sync::broadcast;
use tracing::trace;

use tollgate_core::{EventSink, GateEvent};

/// Default capacity of the event channel. Slower subscribers lag and lose
/// the oldest events.
pub const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Publishes gate events on a tokio broadcast channel.
#[derive(Debug, Clone)]
pub struct BroadcastSink {
    tx: broadcast::Sender<GateEvent>,
}

impl BroadcastSink {
    pub fn new(tx: broadcast::Sender<GateEvent>) -> Self {
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<GateEvent> {
        self.tx.subscribe()
    }
}

impl EventSink for BroadcastSink {
    fn publish(&mut self, event: GateEvent) {
        trace!(kind = %event.kind, message = %event.message, "Publishing event");
        // No subscribers is not an error
        let _ = self.tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tollgate_core::Notice;

    #[test]
    fn test_publish_without_subscribers() {
        let (tx, _) = broadcast::channel(4);
        let mut sink = BroadcastSink::new(tx);
        sink.publish(Notice::status("nobody listens").stamp(0));
    }

    #[test]
    fn test_subscriber_receives() {
        let (tx, _) = broadcast::channel(4);
        let mut sink = BroadcastSink::new(tx);
        let mut rx = sink.subscribe();

        sink.publish(Notice::rfid("01020304").stamp(7));

        let event = rx.try_recv().unwrap();
        assert_eq!(event.message, "01020304");
        assert_eq!(event.timestamp, 7);
    }
}
