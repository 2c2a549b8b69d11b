//! Important NPC - a campaign-persistent actor templated from a compendium monster.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use combatdesk_domain::{CampaignId, InpcId, MonsterId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Inpc {
    pub id: InpcId,
    pub campaign_id: CampaignId,
    /// Compendium template, if the iNPC was built from one.
    #[serde(default)]
    pub monster_id: Option<MonsterId>,
    pub name: String,
    pub hp_max: i32,
    pub ac: i32,
    #[serde(default = "default_friendly")]
    pub friendly: bool,
    pub created_at: DateTime<Utc>,
}

fn default_friendly() -> bool {
    true
}

impl Inpc {
    pub fn new(
        campaign_id: CampaignId,
        name: impl Into<String>,
        hp_max: i32,
        ac: i32,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: InpcId::new(),
            campaign_id,
            monster_id: None,
            name: name.into(),
            hp_max: hp_max.max(1),
            ac,
            friendly: true,
            created_at: now,
        }
    }

    pub fn with_monster(mut self, monster_id: MonsterId) -> Self {
        self.monster_id = Some(monster_id);
        self
    }
}
