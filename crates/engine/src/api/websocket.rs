//! WebSocket endpoint for live change notifications.
//!
//! The socket is a one-way invalidation feed: the engine pushes
//! `ServerMessage::Broadcast` for every store change and clients re-fetch over
//! HTTP. The only client message the engine answers is a heartbeat.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use uuid::Uuid;

use combatdesk_shared::{ClientMessage, ServerMessage};

use super::connections::ConnectionManager;

/// Buffer size for per-connection message channels.
pub const CONNECTION_CHANNEL_BUFFER: usize = 256;

/// WebSocket state shared across connections.
pub struct WsState {
    pub connections: Arc<ConnectionManager>,
}

/// WebSocket upgrade handler - entry point for new connections.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<WsState>>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle an individual WebSocket connection.
async fn handle_socket(socket: WebSocket, state: Arc<WsState>) {
    let (mut ws_sender, mut ws_receiver) = socket.split();

    let connection_id = Uuid::new_v4();

    // Bounded so a stalled client cannot grow memory without limit
    let (tx, mut rx) = mpsc::channel::<ServerMessage>(CONNECTION_CHANNEL_BUFFER);

    state.connections.register(connection_id, tx.clone()).await;
    let connections = state.connections.count().await;
    tracing::info!(
        connection_id = %connection_id,
        connections = connections,
        "WebSocket connection established"
    );

    let hello = ServerMessage::Connected {
        connection_id: connection_id.to_string(),
    };
    if let Err(e) = state.connections.send_to(connection_id, hello).await {
        tracing::warn!(connection_id = %connection_id, error = %e, "Failed to queue Connected message");
    }

    // Forward messages from the channel to the WebSocket
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            match serde_json::to_string(&msg) {
                Ok(json) => {
                    if ws_sender.send(Message::Text(json.into())).await.is_err() {
                        break;
                    }
                }
                Err(e) => tracing::error!(error = %e, "Failed to serialize server message"),
            }
        }
    });

    while let Some(result) = ws_receiver.next().await {
        match result {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientMessage>(text.as_str()) {
                Ok(msg) => {
                    if let Some(response) = handle_message(msg, connection_id) {
                        if tx.try_send(response).is_err() {
                            tracing::warn!(
                                connection_id = %connection_id,
                                "Failed to send response, channel full or closed"
                            );
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(connection_id = %connection_id, error = %e, "Failed to parse message");
                    let error = parse_error(&e);
                    let _ = tx.try_send(error);
                }
            },
            Ok(Message::Ping(_)) => {
                let _ = tx.try_send(ServerMessage::Pong);
            }
            Ok(Message::Close(_)) => {
                tracing::info!(connection_id = %connection_id, "WebSocket closed by client");
                break;
            }
            Err(e) => {
                tracing::error!(connection_id = %connection_id, error = %e, "WebSocket error");
                break;
            }
            _ => {}
        }
    }

    state.connections.unregister(connection_id).await;
    send_task.abort();

    tracing::info!(connection_id = %connection_id, "WebSocket connection terminated");
}

/// Dispatch a parsed client message.
fn handle_message(msg: ClientMessage, connection_id: Uuid) -> Option<ServerMessage> {
    match msg {
        ClientMessage::Heartbeat => Some(ServerMessage::Pong),
        ClientMessage::Unknown => {
            tracing::debug!(connection_id = %connection_id, "Ignoring unknown client message");
            None
        }
    }
}

fn parse_error(e: &serde_json::Error) -> ServerMessage {
    ServerMessage::Error {
        code: "PARSE_ERROR".to_string(),
        message: format!("Invalid message format: {}", e),
    }
}
