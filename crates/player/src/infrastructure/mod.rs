//! Infrastructure adapters: engine HTTP client, WebSocket feed, configuration.

pub mod config;
pub mod http_client;
pub mod websocket;
