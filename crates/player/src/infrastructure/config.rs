//! Client configuration from environment variables.

use uuid::Uuid;

use super::http_client::DEFAULT_ENGINE_URL;

pub const DEFAULT_ENGINE_WS_URL: &str = "ws://localhost:3000/ws";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub engine_url: String,
    pub engine_ws_url: String,
    /// Encounter to follow. Required by the terminal binary.
    pub encounter_id: Option<Uuid>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            engine_url: DEFAULT_ENGINE_URL.to_string(),
            engine_ws_url: DEFAULT_ENGINE_WS_URL.to_string(),
            encounter_id: None,
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let defaults = Self::default();

        let encounter_id = get("COMBATDESK_ENCOUNTER_ID").and_then(|raw| {
            Uuid::parse_str(&raw)
                .map_err(|e| {
                    tracing::warn!(value = %raw, error = %e, "Invalid COMBATDESK_ENCOUNTER_ID");
                })
                .ok()
        });

        Self {
            engine_url: get("COMBATDESK_ENGINE_URL").unwrap_or(defaults.engine_url),
            engine_ws_url: get("COMBATDESK_ENGINE_WS_URL").unwrap_or(defaults.engine_ws_url),
            encounter_id,
        }
    }
}
