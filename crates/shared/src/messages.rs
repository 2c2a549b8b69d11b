//! WebSocket message types for engine-client communication
//!
//! The engine never pushes resource bodies over the socket. A broadcast names
//! a topic plus the ids needed to decide what to re-fetch; clients then pull
//! the fresh state over HTTP.
//!
//! ## Versioning Policy
//!
//! - New variants can be added at the end (forward compatible)
//! - Unknown enum variants deserialize to `Unknown` for forward compatibility

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// Client Messages (Client → Engine)
// =============================================================================

/// Messages from a client to the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    /// Heartbeat ping
    Heartbeat,
    /// Unknown message type for forward compatibility
    #[serde(other)]
    Unknown,
}

// =============================================================================
// Server Messages (Engine → Client)
// =============================================================================

/// Messages from the engine to clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    /// Sent once after the socket is registered
    Connected { connection_id: String },
    /// Something changed; re-fetch what the topic names
    Broadcast {
        topic: Topic,
        payload: BroadcastPayload,
    },
    /// Heartbeat response
    Pong,
    /// The engine could not process a client message
    Error { code: String, message: String },
    /// Unknown message type for forward compatibility
    #[serde(other)]
    Unknown,
}

// =============================================================================
// Broadcast topics
// =============================================================================

/// Resource families a broadcast can invalidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Topic {
    #[serde(rename = "combatants:changed")]
    CombatantsChanged,
    #[serde(rename = "combat:changed")]
    CombatChanged,
    #[serde(rename = "encounters:changed")]
    EncountersChanged,
    #[serde(rename = "players:changed")]
    PlayersChanged,
    #[serde(rename = "inpcs:changed")]
    InpcsChanged,
    #[serde(rename = "campaigns:changed")]
    CampaignsChanged,
}

impl Topic {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CombatantsChanged => "combatants:changed",
            Self::CombatChanged => "combat:changed",
            Self::EncountersChanged => "encounters:changed",
            Self::PlayersChanged => "players:changed",
            Self::InpcsChanged => "inpcs:changed",
            Self::CampaignsChanged => "campaigns:changed",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Correlation ids carried by a broadcast. Only the ids relevant to the topic
/// are set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BroadcastPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub campaign_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encounter_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player_id: Option<Uuid>,
}

impl BroadcastPayload {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn encounter(encounter_id: Uuid) -> Self {
        Self {
            encounter_id: Some(encounter_id),
            ..Self::default()
        }
    }

    pub fn campaign(campaign_id: Uuid) -> Self {
        Self {
            campaign_id: Some(campaign_id),
            ..Self::default()
        }
    }

    pub fn with_encounter(mut self, encounter_id: Uuid) -> Self {
        self.encounter_id = Some(encounter_id);
        self
    }

    pub fn with_player(mut self, player_id: Uuid) -> Self {
        self.player_id = Some(player_id);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn broadcast_wire_shape() {
        let encounter_id = Uuid::new_v4();
        let msg = ServerMessage::Broadcast {
            topic: Topic::CombatantsChanged,
            payload: BroadcastPayload::encounter(encounter_id),
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "Broadcast");
        assert_eq!(json["topic"], "combatants:changed");
        assert_eq!(json["payload"]["encounterId"], encounter_id.to_string());
        assert!(json["payload"].get("campaignId").is_none());
    }

    #[test]
    fn unknown_messages_do_not_fail() {
        let msg: ServerMessage = serde_json::from_str(r#"{"type":"SomethingNew"}"#).unwrap();
        assert_eq!(msg, ServerMessage::Unknown);
        let msg: ClientMessage = serde_json::from_str(r#"{"type":"Heartbeat"}"#).unwrap();
        assert_eq!(msg, ClientMessage::Heartbeat);
    }
}
