use std::{collections::HashSet, sync::Arc};

use axum::extract::ws::Message;
use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{dto::ws::ServerMessage, services::session_engine::Outbox};

/// Identifier of one realtime connection.
pub type ConnectionId = Uuid;

#[derive(Clone)]
/// Handle used to push messages to a connected client.
pub struct ConnectionHandle {
    /// Connection identifier.
    pub id: ConnectionId,
    /// Queue drained by the connection's writer task.
    pub tx: mpsc::UnboundedSender<Message>,
}

/// Connections grouped by the session rooms they joined.
#[derive(Default)]
pub struct RoomRegistry {
    connections: DashMap<ConnectionId, ConnectionHandle>,
    rooms: DashMap<Uuid, HashSet<ConnectionId>>,
    memberships: DashMap<ConnectionId, HashSet<Uuid>>,
}

impl RoomRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a freshly opened connection.
    pub fn register(&self, handle: ConnectionHandle) {
        self.connections.insert(handle.id, handle);
    }

    /// Forget a connection and remove it from every room it joined.
    pub fn unregister(&self, connection_id: ConnectionId) {
        self.connections.remove(&connection_id);
        let Some((_, sessions)) = self.memberships.remove(&connection_id) else {
            return;
        };

        for session_id in sessions {
            let emptied = self
                .rooms
                .get_mut(&session_id)
                .map(|mut members| {
                    members.remove(&connection_id);
                    members.is_empty()
                })
                .unwrap_or(false);
            if emptied {
                self.rooms
                    .remove_if(&session_id, |_, members| members.is_empty());
            }
        }
    }

    /// Add a connection to the room of `session_id`; joining twice is a no-op.
    pub fn join(&self, session_id: Uuid, connection_id: ConnectionId) {
        self.rooms
            .entry(session_id)
            .or_default()
            .insert(connection_id);
        self.memberships
            .entry(connection_id)
            .or_default()
            .insert(session_id);
    }

    /// Number of open connections.
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Number of connections subscribed to `session_id`.
    pub fn room_size(&self, session_id: Uuid) -> usize {
        self.rooms
            .get(&session_id)
            .map(|members| members.len())
            .unwrap_or(0)
    }

    /// Send `message` once to every member of the room.
    ///
    /// Members whose writer is gone are skipped; they are cleaned up when their reader exits.
    pub fn broadcast(&self, session_id: Uuid, message: &ServerMessage) {
        let Some(payload) = encode(message) else {
            return;
        };

        let members: Vec<ConnectionId> = self
            .rooms
            .get(&session_id)
            .map(|members| members.iter().copied().collect())
            .unwrap_or_default();

        let mut delivered = 0usize;
        for connection_id in members {
            if self.send_text(connection_id, &payload) {
                delivered += 1;
            }
        }
        debug!(
            %session_id,
            event = message.event_name(),
            delivered,
            "room broadcast"
        );
    }

    /// Send `message` to a single connection.
    pub fn reply(&self, connection_id: ConnectionId, message: &ServerMessage) {
        if let Some(payload) = encode(message) {
            self.send_text(connection_id, &payload);
        }
    }

    fn send_text(&self, connection_id: ConnectionId, payload: &str) -> bool {
        let Some(tx) = self
            .connections
            .get(&connection_id)
            .map(|handle| handle.tx.clone())
        else {
            return false;
        };
        tx.send(Message::Text(payload.to_owned().into())).is_ok()
    }
}

/// Serialize once per message; failures are permanent and only logged.
fn encode(message: &ServerMessage) -> Option<String> {
    match serde_json::to_string(message) {
        Ok(payload) => Some(payload),
        Err(err) => {
            warn!(error = %err, event = message.event_name(), "failed to serialize message");
            None
        }
    }
}

/// [`Outbox`] bound to the connection that sent the event being handled.
pub struct ConnectionOutbox {
    rooms: Arc<RoomRegistry>,
    connection_id: ConnectionId,
}

impl ConnectionOutbox {
    /// Bind `rooms` to `connection_id`.
    pub fn new(rooms: Arc<RoomRegistry>, connection_id: ConnectionId) -> Self {
        Self {
            rooms,
            connection_id,
        }
    }
}

impl Outbox for ConnectionOutbox {
    fn subscribe(&self, session_id: Uuid) {
        self.rooms.join(session_id, self.connection_id);
    }

    fn broadcast(&self, session_id: Uuid, message: &ServerMessage) {
        self.rooms.broadcast(session_id, message);
    }

    fn reply(&self, message: &ServerMessage) {
        self.rooms.reply(self.connection_id, message);
    }
}
