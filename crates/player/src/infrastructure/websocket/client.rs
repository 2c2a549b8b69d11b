//! Engine WebSocket client using tokio-tungstenite.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, Notify, RwLock};
use tokio_tungstenite::{connect_async, tungstenite::Message};

use combatdesk_shared::ClientMessage;

use super::core::{parse_server_message, BackoffState, MAX_RETRY_ATTEMPTS};
use super::protocol::{ConnectionEvent, ConnectionState};

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// WebSocket client for the engine's broadcast feed.
///
/// [`EngineClient::run`] owns the socket for its whole life: it connects,
/// forwards every server message to the owner, and reconnects with
/// exponential backoff until it succeeds, gives up, or is told to stop.
#[derive(Clone)]
pub struct EngineClient {
    url: String,
    state: Arc<RwLock<ConnectionState>>,
    /// Set when the owner asked to stop; suppresses reconnects
    intentional_disconnect: Arc<RwLock<bool>>,
    shutdown: Arc<Notify>,
}

impl EngineClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            state: Arc::new(RwLock::new(ConnectionState::Disconnected)),
            intentional_disconnect: Arc::new(RwLock::new(false)),
            shutdown: Arc::new(Notify::new()),
        }
    }

    pub async fn state(&self) -> ConnectionState {
        *self.state.read().await
    }

    async fn set_state(&self, new_state: ConnectionState, events: &mpsc::Sender<ConnectionEvent>) {
        {
            let mut state = self.state.write().await;
            if *state == new_state {
                return;
            }
            *state = new_state;
        }
        let _ = events.send(ConnectionEvent::StateChanged(new_state)).await;
    }

    async fn is_intentional(&self) -> bool {
        *self.intentional_disconnect.read().await
    }

    /// Connect and reconnect until stopped. Returns once the connection is
    /// closed on purpose or the retry budget is spent.
    pub async fn run(&self, events: mpsc::Sender<ConnectionEvent>) {
        {
            let mut flag = self.intentional_disconnect.write().await;
            *flag = false;
        }
        let mut backoff = BackoffState::default();

        loop {
            match self.connect_internal(&events).await {
                Ok(unexpected_close) => {
                    // The socket was up, so the next outage starts a fresh budget.
                    backoff.reset();
                    if !unexpected_close || self.is_intentional().await {
                        self.set_state(ConnectionState::Disconnected, &events).await;
                        return;
                    }
                    tracing::info!("Connection closed unexpectedly, initiating reconnection");
                }
                Err(e) => {
                    tracing::warn!(attempt = backoff.attempts(), error = %e, "Connection attempt failed");
                }
            }

            if self.is_intentional().await {
                self.set_state(ConnectionState::Disconnected, &events).await;
                return;
            }

            self.set_state(ConnectionState::Reconnecting, &events).await;
            let Some(delay) = backoff.next_delay_and_advance() else {
                tracing::error!("Max reconnection attempts reached, giving up");
                self.set_state(ConnectionState::Failed, &events).await;
                return;
            };
            tracing::info!(
                "Reconnection attempt {} of {}, waiting {}ms",
                backoff.attempts(),
                MAX_RETRY_ATTEMPTS,
                delay
            );

            tokio::select! {
                _ = tokio::time::sleep(Duration::from_millis(delay)) => {}
                _ = self.shutdown.notified() => {
                    tracing::info!("Reconnection cancelled - intentional disconnect");
                    self.set_state(ConnectionState::Disconnected, &events).await;
                    return;
                }
            }
        }
    }

    /// One socket session. Returns whether it ended unexpectedly.
    async fn connect_internal(&self, events: &mpsc::Sender<ConnectionEvent>) -> Result<bool> {
        self.set_state(ConnectionState::Connecting, events).await;

        let (ws_stream, _) = match connect_async(&self.url).await {
            Ok(connected) => connected,
            Err(e) => {
                tracing::error!(url = %self.url, error = %e, "Failed to connect to Engine");
                return Err(e.into());
            }
        };
        tracing::info!("Connected to Engine at {}", self.url);
        self.set_state(ConnectionState::Connected, events).await;
        if events.send(ConnectionEvent::Connected).await.is_err() {
            return Ok(false);
        }

        let (mut write, mut read) = ws_stream.split();
        let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
        heartbeat.tick().await;

        loop {
            tokio::select! {
                msg = read.next() => match msg {
                    Some(Ok(Message::Text(text))) => match parse_server_message(&text) {
                        Ok(server_msg) => {
                            if events.send(ConnectionEvent::Message(server_msg)).await.is_err() {
                                tracing::debug!("Event receiver dropped, closing connection");
                                return Ok(false);
                            }
                        }
                        Err(e) => {
                            tracing::warn!("Failed to parse server message: {}", e);
                        }
                    },
                    Some(Ok(Message::Close(_))) => {
                        tracing::info!("Server closed connection");
                        return Ok(!self.is_intentional().await);
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::error!("WebSocket error: {}", e);
                        return Ok(true);
                    }
                    None => return Ok(!self.is_intentional().await),
                },
                _ = heartbeat.tick() => {
                    let json = serde_json::to_string(&ClientMessage::Heartbeat)?;
                    if let Err(e) = write.send(Message::Text(json)).await {
                        tracing::error!("Failed to send heartbeat: {}", e);
                        return Ok(true);
                    }
                }
                _ = self.shutdown.notified() => {
                    let _ = write.send(Message::Close(None)).await;
                    return Ok(false);
                }
            }
        }
    }

    /// Close the socket and stop reconnecting.
    pub async fn disconnect(&self) {
        {
            let mut flag = self.intentional_disconnect.write().await;
            *flag = true;
        }
        self.shutdown.notify_one();
    }
}
