//! WebSocket client for the engine's change feed.

mod client;
mod core;
mod protocol;

pub use client::EngineClient;
pub use self::core::{BackoffState, MAX_RETRY_ATTEMPTS};
pub use protocol::{ConnectionEvent, ConnectionState};
