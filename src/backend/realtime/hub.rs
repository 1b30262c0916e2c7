/**
 * Real-time Event Hub
 *
 * In-process publish/subscribe fan-out from handlers and jobs to live
 * connections. Each connection owns a bounded outbound queue drained by its
 * socket writer task; publishing never waits on a slow connection. When a
 * queue is full the event is dropped for that connection and logged.
 *
 * # Channels
 *
 * - `user_{id}` - every live connection of one user
 * - `conversation_{id}` - connections that joined the room
 *
 * Addressing a user is one call no matter how many connections they have.
 */

use dashmap::DashMap;
use std::collections::HashSet;
use tokio::sync::mpsc::{self, error::TrySendError};
use uuid::Uuid;

use super::{Channel, ConnectionId};
use crate::shared::RealtimeEvent;

/// Outbound queue depth per connection
pub const DEFAULT_CONNECTION_CAPACITY: usize = 256;

struct Connection {
    user_id: Uuid,
    tx: mpsc::Sender<RealtimeEvent>,
    channels: HashSet<Channel>,
}

/// Registry of live connections and their channel subscriptions
pub struct Hub {
    connections: DashMap<ConnectionId, Connection>,
    channels: DashMap<Channel, HashSet<ConnectionId>>,
    capacity: usize,
}

impl Hub {
    pub fn new(capacity: usize) -> Self {
        Self {
            connections: DashMap::new(),
            channels: DashMap::new(),
            capacity: capacity.max(1),
        }
    }

    /// Register a connection for `user_id`
    ///
    /// # Returns
    ///
    /// The new connection id and the receiving end of its outbound queue
    pub fn register(&self, user_id: Uuid) -> (ConnectionId, mpsc::Receiver<RealtimeEvent>) {
        let (tx, rx) = mpsc::channel(self.capacity);
        let connection_id = Uuid::new_v4();
        self.connections.insert(
            connection_id,
            Connection {
                user_id,
                tx,
                channels: HashSet::new(),
            },
        );
        tracing::debug!("[Realtime] Registered connection {} for user {}", connection_id, user_id);
        (connection_id, rx)
    }

    /// Remove a connection and all its subscriptions
    pub fn unregister(&self, connection_id: ConnectionId) -> bool {
        let Some((_, connection)) = self.connections.remove(&connection_id) else {
            return false;
        };
        for channel in connection.channels {
            if let Some(mut members) = self.channels.get_mut(&channel) {
                members.remove(&connection_id);
            }
            self.channels.remove_if(&channel, |_, members| members.is_empty());
        }
        tracing::debug!("[Realtime] Unregistered connection {}", connection_id);
        true
    }

    /// Subscribe a registered connection to a channel
    pub fn subscribe(&self, connection_id: ConnectionId, channel: Channel) -> bool {
        {
            let Some(mut connection) = self.connections.get_mut(&connection_id) else {
                return false;
            };
            connection.channels.insert(channel);
        }
        self.channels.entry(channel).or_default().insert(connection_id);
        true
    }

    /// Deliver to every subscriber of `channel`, optionally skipping one connection
    ///
    /// # Returns
    ///
    /// Number of connections the event was queued for
    pub fn emit_to(&self, channel: Channel, event: &RealtimeEvent, except: Option<ConnectionId>) -> usize {
        let targets: Vec<ConnectionId> = match self.channels.get(&channel) {
            Some(members) => members
                .iter()
                .copied()
                .filter(|id| Some(*id) != except)
                .collect(),
            None => Vec::new(),
        };

        let delivered = targets
            .into_iter()
            .filter(|id| self.send_to(*id, event.clone()))
            .count();
        tracing::debug!("[Realtime] {} -> {} ({} connections)", event.name(), channel, delivered);
        delivered
    }

    /// Deliver to every live connection, optionally skipping one
    pub fn emit_all(&self, event: &RealtimeEvent, except: Option<ConnectionId>) -> usize {
        let targets: Vec<ConnectionId> = self
            .connections
            .iter()
            .map(|entry| *entry.key())
            .filter(|id| Some(*id) != except)
            .collect();

        let delivered = targets
            .into_iter()
            .filter(|id| self.send_to(*id, event.clone()))
            .count();
        tracing::debug!("[Realtime] {} -> everyone ({} connections)", event.name(), delivered);
        delivered
    }

    /// Queue an event for one connection
    pub fn send_to(&self, connection_id: ConnectionId, event: RealtimeEvent) -> bool {
        let Some(tx) = self.connections.get(&connection_id).map(|c| c.tx.clone()) else {
            return false;
        };
        match tx.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(event)) => {
                tracing::warn!(
                    "[Realtime] Dropping {} for slow connection {}",
                    event.name(),
                    connection_id
                );
                false
            }
            Err(TrySendError::Closed(_)) => {
                tracing::debug!("[Realtime] Connection {} already closed", connection_id);
                false
            }
        }
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Live connections of a user
    pub fn user_connections(&self, user_id: Uuid) -> Vec<ConnectionId> {
        self.connections
            .iter()
            .filter(|entry| entry.value().user_id == user_id)
            .map(|entry| *entry.key())
            .collect()
    }

    pub fn is_subscribed(&self, connection_id: ConnectionId, channel: Channel) -> bool {
        self.channels
            .get(&channel)
            .map(|members| members.contains(&connection_id))
            .unwrap_or(false)
    }
}

impl Default for Hub {
    fn default() -> Self {
        Self::new(DEFAULT_CONNECTION_CAPACITY)
    }
}
