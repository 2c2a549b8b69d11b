//! Campaign entity - the scope that owns players, iNPCs and encounters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use combatdesk_domain::CampaignId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Campaign {
    pub id: CampaignId,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl Campaign {
    pub fn new(name: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: CampaignId::new(),
            name: name.into(),
            created_at: now,
        }
    }
}
