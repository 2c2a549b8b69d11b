//! Port traits for the client's outbound boundaries.
//!
//! The reconciler only ever pulls state through [`TrackerApiPort`]; the HTTP
//! adapter lives in `infrastructure::http_client`.

use async_trait::async_trait;
use uuid::Uuid;

use combatdesk_shared::{
    CombatStateData, CombatantView, EncounterData, PlayerData, SetCombatStateRequest,
};

/// Errors from the engine's HTTP API.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ClientError {
    #[error("Resource not found")]
    NotFound,
    #[error("Request failed: {0}")]
    Request(String),
    #[error("Engine returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Invalid response: {0}")]
    Decode(String),
}

impl ClientError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}

/// Read and write access to the engine resources one encounter view needs.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TrackerApiPort: Send + Sync {
    async fn get_encounter(&self, encounter_id: Uuid) -> Result<EncounterData, ClientError>;

    /// Merged roster in storage order.
    async fn list_combatants(&self, encounter_id: Uuid)
        -> Result<Vec<CombatantView>, ClientError>;

    async fn get_combat(&self, encounter_id: Uuid) -> Result<CombatStateData, ClientError>;

    async fn list_players(&self, campaign_id: Uuid) -> Result<Vec<PlayerData>, ClientError>;

    async fn set_combat(
        &self,
        encounter_id: Uuid,
        request: SetCombatStateRequest,
    ) -> Result<CombatStateData, ClientError>;
}
