//! services/api/src/web/hub.rs
//!
//! The live status channel: one broadcast room per entry id. Clients join a
//! room over the WebSocket; the webhook handler and the optimistic
//! re-analyze path publish `entry_update` events into it. Nothing is
//! persisted: an event published into an empty room is lost, and clients
//! re-fetch the authoritative row on reconnect.

use journal_core::analysis::EntryUpdate;
use journal_core::ports::StatusPublisher;
use std::collections::HashMap;
use std::sync::RwLock;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Per-room buffer; a client that falls further behind sees a lag error and
/// keeps going, since last-write-wins is the only delivery guarantee.
const ROOM_CAPACITY: usize = 32;

#[derive(Default)]
pub struct LiveStatusHub {
    rooms: RwLock<HashMap<Uuid, broadcast::Sender<EntryUpdate>>>,
}

impl LiveStatusHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Joins the room for an entry, creating it on first subscription.
    pub fn subscribe(&self, entry_id: Uuid) -> broadcast::Receiver<EntryUpdate> {
        let mut rooms = self.rooms.write().expect("status hub lock poisoned");
        rooms
            .entry(entry_id)
            .or_insert_with(|| broadcast::channel(ROOM_CAPACITY).0)
            .subscribe()
    }

    fn room_count(&self) -> usize {
        self.rooms.read().expect("status hub lock poisoned").len()
    }
}

impl StatusPublisher for LiveStatusHub {
    fn publish(&self, entry_id: Uuid, update: EntryUpdate) {
        let stale = {
            let rooms = self.rooms.read().expect("status hub lock poisoned");
            match rooms.get(&entry_id) {
                // A send error means every receiver is gone; mark the room
                // for pruning instead of letting it leak.
                Some(sender) => sender.send(update).is_err(),
                None => false,
            }
        };
        if stale {
            let mut rooms = self.rooms.write().expect("status hub lock poisoned");
            if let Some(sender) = rooms.get(&entry_id) {
                if sender.receiver_count() == 0 {
                    rooms.remove(&entry_id);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use journal_core::domain::EntryStatus;

    #[tokio::test]
    async fn subscribers_receive_room_events() {
        let hub = LiveStatusHub::new();
        let entry_id = Uuid::new_v4();
        let mut rx = hub.subscribe(entry_id);

        hub.publish(entry_id, EntryUpdate::status_only(EntryStatus::Processing));
        let update = rx.recv().await.unwrap();
        assert_eq!(update.status, EntryStatus::Processing);
    }

    #[tokio::test]
    async fn events_do_not_cross_rooms() {
        let hub = LiveStatusHub::new();
        let watched = Uuid::new_v4();
        let other = Uuid::new_v4();
        let mut rx = hub.subscribe(watched);

        hub.publish(other, EntryUpdate::status_only(EntryStatus::Failed));
        hub.publish(watched, EntryUpdate::status_only(EntryStatus::Completed));
        assert_eq!(rx.recv().await.unwrap().status, EntryStatus::Completed);
    }

    #[tokio::test]
    async fn publishing_to_an_empty_room_is_dropped() {
        let hub = LiveStatusHub::new();
        // No panic, no buffering.
        hub.publish(Uuid::new_v4(), EntryUpdate::status_only(EntryStatus::Failed));
        assert_eq!(hub.room_count(), 0);
    }

    #[tokio::test]
    async fn abandoned_rooms_are_pruned_on_next_publish() {
        let hub = LiveStatusHub::new();
        let entry_id = Uuid::new_v4();
        drop(hub.subscribe(entry_id));
        assert_eq!(hub.room_count(), 1);

        hub.publish(entry_id, EntryUpdate::status_only(EntryStatus::Completed));
        assert_eq!(hub.room_count(), 0);
    }
}
