//! The in-memory room registry (spec §3 Room, §4.F, §5 "Room map").
//!
//! Created on first join, deleted when empty, never persisted — exactly the
//! teacher's `ChatServer` session map, generalized from a single global room
//! to one room per `meetingId`. All operations here are synchronous; the
//! registry is guarded by a plain `std::sync::Mutex` rather than an async
//! lock because nothing inside the critical section ever awaits (lookups
//! are O(1), sends are a non-blocking channel push), so the mutex is never
//! held across a suspension point (spec §5).

use std::collections::HashMap;
use std::sync::Mutex;

use tokio::sync::mpsc::UnboundedSender;

use crate::events::{ParticipantSnapshot, ServerEvent};

#[derive(Clone)]
struct Member {
    user_id: String,
    username: String,
    tx: UnboundedSender<ServerEvent>,
}

#[derive(Default)]
struct Room {
    members: HashMap<String, Member>,
}

#[derive(Default)]
pub struct RoomRegistry {
    rooms: Mutex<HashMap<String, Room>>,
}

impl RoomRegistry {
    /// Join `meeting_id`, returning the snapshot of members already present
    /// (before this socket is added) so the caller can emit
    /// `existing-participants` to the joiner only (spec §4.F).
    pub fn join(
        &self,
        meeting_id: &str,
        socket_id: &str,
        user_id: &str,
        username: &str,
        tx: UnboundedSender<ServerEvent>,
    ) -> Vec<ParticipantSnapshot> {
        let mut rooms = self.rooms.lock().expect("room registry poisoned");
        let room = rooms.entry(meeting_id.to_string()).or_default();
        let existing = room
            .members
            .iter()
            .map(|(sid, m)| ParticipantSnapshot {
                socket_id: sid.clone(),
                user_id: m.user_id.clone(),
                username: m.username.clone(),
            })
            .collect();
        room.members.insert(
            socket_id.to_string(),
            Member {
                user_id: user_id.to_string(),
                username: username.to_string(),
                tx,
            },
        );
        existing
    }

    /// Remove a socket from a room, deleting the room if it's now empty.
    /// Returns the removed member's user id, if it was present.
    pub fn leave(&self, meeting_id: &str, socket_id: &str) -> Option<String> {
        let mut rooms = self.rooms.lock().expect("room registry poisoned");
        let Some(room) = rooms.get_mut(meeting_id) else {
            return None;
        };
        let removed = room.members.remove(socket_id).map(|m| m.user_id);
        if room.members.is_empty() {
            rooms.remove(meeting_id);
        }
        removed
    }

    /// Send `event` to every socket in the room except `exclude_socket_id`.
    pub fn broadcast_except(&self, meeting_id: &str, exclude_socket_id: &str, event: ServerEvent) {
        let rooms = self.rooms.lock().expect("room registry poisoned");
        let Some(room) = rooms.get(meeting_id) else {
            return;
        };
        for (sid, member) in room.members.iter() {
            if sid != exclude_socket_id {
                let _ = member.tx.send(event.clone());
            }
        }
    }

    /// Send `event` to every socket in the room, including the sender.
    pub fn broadcast_all(&self, meeting_id: &str, event: ServerEvent) {
        let rooms = self.rooms.lock().expect("room registry poisoned");
        let Some(room) = rooms.get(meeting_id) else {
            return;
        };
        for member in room.members.values() {
            let _ = member.tx.send(event.clone());
        }
    }

    /// Send `event` to exactly one socket: the first member matching
    /// `user_id`, or — for the legacy `to` fallback (spec §4.F) — the member
    /// whose socket id equals `to`. Silently does nothing if not found.
    pub fn send_to(&self, meeting_id: &str, to: &str, event: ServerEvent) {
        let rooms = self.rooms.lock().expect("room registry poisoned");
        let Some(room) = rooms.get(meeting_id) else {
            return;
        };
        if let Some(member) = room.members.values().find(|m| m.user_id == to) {
            let _ = member.tx.send(event);
            return;
        }
        if let Some(member) = room.members.get(to) {
            let _ = member.tx.send(event);
        }
    }

    /// Send `event` directly to one socket by its own id (used to notify a
    /// socket about its own request, e.g. a refused `join-meeting`).
    pub fn send_to_socket(&self, meeting_id: &str, socket_id: &str, event: ServerEvent) {
        let rooms = self.rooms.lock().expect("room registry poisoned");
        let Some(room) = rooms.get(meeting_id) else {
            return;
        };
        if let Some(member) = room.members.get(socket_id) {
            let _ = member.tx.send(event);
        }
    }

    #[cfg(test)]
    pub fn room_size(&self, meeting_id: &str) -> usize {
        self.rooms
            .lock()
            .expect("room registry poisoned")
            .get(meeting_id)
            .map(|r| r.members.len())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::unbounded_channel;

    fn sender() -> (UnboundedSender<ServerEvent>, tokio::sync::mpsc::UnboundedReceiver<ServerEvent>) {
        unbounded_channel()
    }

    #[test]
    fn first_joiner_sees_no_existing_participants() {
        let registry = RoomRegistry::default();
        let (tx, _rx) = sender();
        let existing = registry.join("m1", "s1", "u1", "Alice", tx);
        assert!(existing.is_empty());
        assert_eq!(registry.room_size("m1"), 1);
    }

    #[test]
    fn second_joiner_sees_the_first_but_not_itself() {
        let registry = RoomRegistry::default();
        let (tx1, _rx1) = sender();
        let (tx2, _rx2) = sender();
        registry.join("m1", "s1", "u1", "Alice", tx1);
        let existing = registry.join("m1", "s2", "u2", "Bob", tx2);
        assert_eq!(existing.len(), 1);
        assert_eq!(existing[0].user_id, "u1");
    }

    #[test]
    fn room_is_deleted_once_empty() {
        let registry = RoomRegistry::default();
        let (tx, _rx) = sender();
        registry.join("m1", "s1", "u1", "Alice", tx);
        registry.leave("m1", "s1");
        assert_eq!(registry.room_size("m1"), 0);
    }

    #[test]
    fn broadcast_except_skips_the_sender() {
        let registry = RoomRegistry::default();
        let (tx1, mut rx1) = sender();
        let (tx2, mut rx2) = sender();
        registry.join("m1", "s1", "u1", "Alice", tx1);
        registry.join("m1", "s2", "u2", "Bob", tx2);

        registry.broadcast_except(
            "m1",
            "s1",
            ServerEvent::UserJoined {
                socket_id: "s1".into(),
                user_id: "u1".into(),
                username: "Alice".into(),
            },
        );

        assert!(rx1.try_recv().is_err());
        assert!(rx2.try_recv().is_ok());
    }

    #[test]
    fn send_to_prefers_user_id_match_over_socket_id() {
        let registry = RoomRegistry::default();
        let (tx1, mut rx1) = sender();
        registry.join("m1", "s1", "u1", "Alice", tx1);

        registry.send_to(
            "m1",
            "u1",
            ServerEvent::MutedByHost {
                meeting_id: "m1".into(),
            },
        );
        assert!(rx1.try_recv().is_ok());
    }
}
