//! Campaign management.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use combatdesk_domain::{Campaign, CampaignId};
use combatdesk_shared::CampaignData;

use crate::infrastructure::ports::ClockPort;
use crate::stores::{TrackerState, TrackerStore};
use crate::use_cases::combat::{CombatError, EffectRunner, Effects, Mutation};

pub const DEFAULT_CAMPAIGN_NAME: &str = "New Campaign";

pub fn list_campaigns(state: &TrackerState) -> Vec<CampaignData> {
    let mut campaigns: Vec<&Campaign> = state.campaigns.iter().collect();
    campaigns.sort_by_key(|c| c.created_at);
    campaigns.into_iter().map(CampaignData::from).collect()
}

pub fn create_campaign(
    state: &mut TrackerState,
    name: &str,
    now: DateTime<Utc>,
) -> Result<Mutation<CampaignData>, CombatError> {
    let name = match name.trim() {
        "" => DEFAULT_CAMPAIGN_NAME,
        trimmed => trimmed,
    };
    let campaign = Campaign::new(name, now);
    let data = CampaignData::from(&campaign);
    tracing::info!(campaign_id = %campaign.id, name, "Campaign created");
    state.campaigns.push(campaign);

    let mut effects = Effects::none();
    effects.campaigns_changed();
    Ok(Mutation::new(data, effects))
}

/// Delete a campaign with its players, iNPCs, encounters and their sessions.
pub fn delete_campaign(
    state: &mut TrackerState,
    campaign_id: CampaignId,
) -> Result<Mutation<()>, CombatError> {
    let index = state
        .campaigns
        .iter()
        .position(|c| c.id == campaign_id)
        .ok_or_else(|| CombatError::not_found("Campaign", campaign_id))?;
    state.campaigns.remove(index);

    let encounter_ids: Vec<_> = state.encounters_in(campaign_id).map(|e| e.id).collect();
    state.encounters.retain(|e| e.campaign_id != campaign_id);
    state
        .sessions
        .retain(|s| !encounter_ids.contains(&s.encounter_id));
    state.players.retain(|p| p.campaign_id != campaign_id);
    state.inpcs.retain(|i| i.campaign_id != campaign_id);

    let mut effects = Effects::none();
    effects.campaigns_changed();
    effects.encounters_changed(campaign_id, None);
    tracing::info!(campaign_id = %campaign_id, encounters = encounter_ids.len(), "Campaign deleted");
    Ok(Mutation::new((), effects))
}

pub struct CampaignCrud {
    store: TrackerStore,
    effects: Arc<EffectRunner>,
    clock: Arc<dyn ClockPort>,
}

impl CampaignCrud {
    pub fn new(store: TrackerStore, effects: Arc<EffectRunner>, clock: Arc<dyn ClockPort>) -> Self {
        Self {
            store,
            effects,
            clock,
        }
    }

    pub async fn list(&self) -> Vec<CampaignData> {
        self.store.read(list_campaigns).await
    }

    pub async fn create(&self, name: &str) -> Result<CampaignData, CombatError> {
        let now = self.clock.now();
        let mutation = self
            .store
            .mutate(|s| create_campaign(s, name, now))
            .await?;
        Ok(self.effects.run(mutation).await)
    }

    pub async fn delete(&self, campaign_id: CampaignId) -> Result<(), CombatError> {
        let mutation = self
            .store
            .mutate(|s| delete_campaign(s, campaign_id))
            .await?;
        self.effects.run(mutation).await;
        Ok(())
    }
}
