//! Broadcast dispatcher for committed state changes.

use domain::StateChange;
use tokio::sync::broadcast;

/// Fan-out channel for committed state changes.
///
/// A `Broadcaster` is injected into the coordinator at construction; there
/// is no module-level channel anywhere. The coordinator calls
/// [`Broadcaster::publish`] only after a transaction has committed, so a
/// subscriber can never observe a change that is not durable, and an aborted
/// transaction emits nothing.
#[derive(Clone)]
pub struct Broadcaster {
    tx: broadcast::Sender<StateChange>,
}

impl Broadcaster {
    /// Creates a dispatcher whose subscribers buffer up to `capacity`
    /// undelivered events before lagging.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Enqueues a committed change for every current subscriber.
    ///
    /// This never blocks: delivery is asynchronous, a slow subscriber lags
    /// on its own receiver, and having no subscribers at all is fine.
    pub fn publish(&self, change: StateChange) {
        let event = change.event_name();
        match self.tx.send(change) {
            Ok(receivers) => {
                tracing::debug!(event, receivers, "broadcast published");
            }
            Err(_) => {
                tracing::debug!(event, "broadcast dropped, no subscribers");
            }
        }
        metrics::counter!("broadcasts_total").increment(1);
    }

    /// Opens a raw event stream without the initial snapshot. Use
    /// `Coordinator::subscribe` to get the snapshot-then-events contract.
    pub fn subscribe_raw(&self) -> broadcast::Receiver<StateChange> {
        self.tx.subscribe()
    }

    /// Number of currently connected subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use domain::{ChangeAction, Money, Room, RoomCategory};

    fn room_update() -> StateChange {
        StateChange::RoomUpdate {
            action: ChangeAction::Created,
            room: Room::new("101", RoomCategory::Double, Money::from_dollars(100)).unwrap(),
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn delivers_to_all_subscribers() {
        let broadcaster = Broadcaster::new(16);
        let mut a = broadcaster.subscribe_raw();
        let mut b = broadcaster.subscribe_raw();

        broadcaster.publish(room_update());

        assert_eq!(a.recv().await.unwrap().event_name(), "room_update");
        assert_eq!(b.recv().await.unwrap().event_name(), "room_update");
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_a_no_op() {
        let broadcaster = Broadcaster::new(16);
        broadcaster.publish(room_update());
        assert_eq!(broadcaster.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn events_arrive_in_publish_order() {
        let broadcaster = Broadcaster::new(16);
        let mut rx = broadcaster.subscribe_raw();

        for _ in 0..3 {
            broadcaster.publish(room_update());
        }
        broadcaster.publish(StateChange::InitialState {
            rooms: vec![],
            timestamp: Utc::now(),
        });

        for _ in 0..3 {
            assert_eq!(rx.recv().await.unwrap().event_name(), "room_update");
        }
        assert_eq!(rx.recv().await.unwrap().event_name(), "initial_state");
    }
}
