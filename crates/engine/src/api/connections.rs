//! Connection management for WebSocket clients.
//!
//! Every connected observer receives every broadcast; clients decide from the
//! topic and ids whether the change concerns the view they have open.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

use combatdesk_shared::{BroadcastPayload, ServerMessage, Topic};

use crate::infrastructure::ports::BroadcastPort;

/// Manages all active WebSocket connections.
pub struct ConnectionManager {
    /// Map of connection_id -> sender channel
    connections: RwLock<HashMap<Uuid, mpsc::Sender<ServerMessage>>>,
}

impl ConnectionManager {
    /// Create a new connection manager.
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
        }
    }

    /// Register a new connection.
    pub async fn register(&self, connection_id: Uuid, sender: mpsc::Sender<ServerMessage>) {
        let mut connections = self.connections.write().await;
        connections.insert(connection_id, sender);
        tracing::debug!(connection_id = %connection_id, "Connection registered");
    }

    /// Unregister a connection.
    pub async fn unregister(&self, connection_id: Uuid) {
        let mut connections = self.connections.write().await;
        if connections.remove(&connection_id).is_some() {
            tracing::debug!(connection_id = %connection_id, "Connection unregistered");
        }
    }

    pub async fn count(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Send a message to one connection.
    pub async fn send_to(
        &self,
        connection_id: Uuid,
        message: ServerMessage,
    ) -> Result<(), ConnectionError> {
        let connections = self.connections.read().await;
        let sender = connections
            .get(&connection_id)
            .ok_or(ConnectionError::NotFound)?;
        sender
            .try_send(message)
            .map_err(|e| ConnectionError::SendFailed(e.to_string()))
    }

    /// Broadcast a message to every connection.
    ///
    /// At most once: a full or closed channel drops the message for that
    /// connection only.
    pub async fn broadcast_all(&self, message: ServerMessage) {
        let connections = self.connections.read().await;
        for (connection_id, sender) in connections.iter() {
            if let Err(e) = sender.try_send(message.clone()) {
                tracing::warn!(
                    connection_id = %connection_id,
                    error = %e,
                    "Failed to broadcast message"
                );
            }
        }
    }
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BroadcastPort for ConnectionManager {
    async fn broadcast(&self, topic: Topic, payload: BroadcastPayload) {
        self.broadcast_all(ServerMessage::Broadcast { topic, payload })
            .await;
    }
}

/// Errors that can occur during connection operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConnectionError {
    #[error("Connection not found")]
    NotFound,
    #[error("Failed to send message: {0}")]
    SendFailed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn broadcast_reaches_every_connection() {
        let manager = ConnectionManager::new();
        let (tx_a, mut rx_a) = mpsc::channel(4);
        let (tx_b, mut rx_b) = mpsc::channel(4);
        manager.register(Uuid::new_v4(), tx_a).await;
        manager.register(Uuid::new_v4(), tx_b).await;

        let encounter_id = Uuid::new_v4();
        manager
            .broadcast(
                Topic::CombatChanged,
                BroadcastPayload::encounter(encounter_id),
            )
            .await;

        let expected = ServerMessage::Broadcast {
            topic: Topic::CombatChanged,
            payload: BroadcastPayload::encounter(encounter_id),
        };
        assert_eq!(rx_a.recv().await, Some(expected.clone()));
        assert_eq!(rx_b.recv().await, Some(expected));
    }

    #[tokio::test]
    async fn full_channel_drops_without_blocking_others() {
        let manager = ConnectionManager::new();
        let (slow_tx, mut slow_rx) = mpsc::channel(1);
        let (fast_tx, mut fast_rx) = mpsc::channel(4);
        manager.register(Uuid::new_v4(), slow_tx).await;
        manager.register(Uuid::new_v4(), fast_tx).await;

        manager.broadcast_all(ServerMessage::Pong).await;
        manager.broadcast_all(ServerMessage::Pong).await;

        assert_eq!(slow_rx.recv().await, Some(ServerMessage::Pong));
        assert!(slow_rx.try_recv().is_err());
        assert_eq!(fast_rx.recv().await, Some(ServerMessage::Pong));
        assert_eq!(fast_rx.recv().await, Some(ServerMessage::Pong));
    }

    #[tokio::test]
    async fn unregister_and_send_to_unknown() {
        let manager = ConnectionManager::new();
        let connection_id = Uuid::new_v4();
        let (tx, _rx) = mpsc::channel(1);
        manager.register(connection_id, tx).await;
        assert_eq!(manager.count().await, 1);
        assert!(manager
            .send_to(connection_id, ServerMessage::Pong)
            .await
            .is_ok());

        manager.unregister(connection_id).await;
        assert_eq!(manager.count().await, 0);
        assert!(matches!(
            manager.send_to(connection_id, ServerMessage::Pong).await,
            Err(ConnectionError::NotFound)
        ));
    }
}
