//! Engine HTTP client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use uuid::Uuid;

use combatdesk_shared::{
    CombatStateData, CombatantView, EncounterData, PlayerData, SetCombatStateRequest,
};

use crate::ports::{ClientError, TrackerApiPort};

/// Default engine base URL.
pub const DEFAULT_ENGINE_URL: &str = "http://localhost:3000";

const REQUEST_TIMEOUT_SECS: u64 = 10;

/// [`TrackerApiPort`] over the engine's REST API.
#[derive(Clone)]
pub struct HttpTrackerApi {
    client: Client,
    base_url: String,
}

impl HttpTrackerApi {
    pub fn new(base_url: &str) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ClientError> {
        let response = request
            .send()
            .await
            .map_err(|e| ClientError::Request(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(ClientError::NotFound);
        }
        if !status.is_success() {
            let body = response
                .text()
                .await
                .map_err(|e| ClientError::Request(e.to_string()))?;
            return Err(ClientError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::Decode(e.to_string()))
    }
}

impl Default for HttpTrackerApi {
    fn default() -> Self {
        Self::new(DEFAULT_ENGINE_URL)
    }
}

#[async_trait]
impl TrackerApiPort for HttpTrackerApi {
    async fn get_encounter(&self, encounter_id: Uuid) -> Result<EncounterData, ClientError> {
        let url = self.url(&format!("/api/encounters/{encounter_id}"));
        self.send_json(self.client.get(url)).await
    }

    async fn list_combatants(
        &self,
        encounter_id: Uuid,
    ) -> Result<Vec<CombatantView>, ClientError> {
        let url = self.url(&format!("/api/encounters/{encounter_id}/combatants"));
        self.send_json(self.client.get(url)).await
    }

    async fn get_combat(&self, encounter_id: Uuid) -> Result<CombatStateData, ClientError> {
        let url = self.url(&format!("/api/encounters/{encounter_id}/combat"));
        self.send_json(self.client.get(url)).await
    }

    async fn list_players(&self, campaign_id: Uuid) -> Result<Vec<PlayerData>, ClientError> {
        let url = self.url(&format!("/api/campaigns/{campaign_id}/players"));
        self.send_json(self.client.get(url)).await
    }

    async fn set_combat(
        &self,
        encounter_id: Uuid,
        request: SetCombatStateRequest,
    ) -> Result<CombatStateData, ClientError> {
        let url = self.url(&format!("/api/encounters/{encounter_id}/combat"));
        self.send_json(self.client.put(url).json(&request)).await
    }
}
