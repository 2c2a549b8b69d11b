//! Encounter management.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use combatdesk_domain::{CampaignId, Encounter, EncounterId};
use combatdesk_shared::EncounterData;

use crate::infrastructure::ports::ClockPort;
use crate::stores::{TrackerState, TrackerStore};
use crate::use_cases::combat::{CombatError, EffectRunner, Effects, Mutation};

pub const DEFAULT_ENCOUNTER_NAME: &str = "New Encounter";

pub fn list_encounters(
    state: &TrackerState,
    campaign_id: CampaignId,
) -> Result<Vec<EncounterData>, CombatError> {
    if state.campaign(campaign_id).is_none() {
        return Err(CombatError::not_found("Campaign", campaign_id));
    }
    let mut encounters: Vec<&Encounter> = state.encounters_in(campaign_id).collect();
    encounters.sort_by_key(|e| e.created_at);
    Ok(encounters.into_iter().map(EncounterData::from).collect())
}

pub fn get_encounter(
    state: &TrackerState,
    encounter_id: EncounterId,
) -> Result<EncounterData, CombatError> {
    state
        .encounter(encounter_id)
        .map(EncounterData::from)
        .ok_or_else(|| CombatError::not_found("Encounter", encounter_id))
}

pub fn create_encounter(
    state: &mut TrackerState,
    campaign_id: CampaignId,
    name: &str,
    now: DateTime<Utc>,
) -> Result<Mutation<EncounterData>, CombatError> {
    if state.campaign(campaign_id).is_none() {
        return Err(CombatError::not_found("Campaign", campaign_id));
    }
    let name = match name.trim() {
        "" => DEFAULT_ENCOUNTER_NAME,
        trimmed => trimmed,
    };
    let encounter = Encounter::new(campaign_id, name, now);
    let data = EncounterData::from(&encounter);
    tracing::info!(campaign_id = %campaign_id, encounter_id = %encounter.id, "Encounter created");

    let mut effects = Effects::none();
    effects.encounters_changed(campaign_id, Some(encounter.id));
    state.encounters.push(encounter);
    Ok(Mutation::new(data, effects))
}

/// Delete an encounter together with its combat session.
pub fn delete_encounter(
    state: &mut TrackerState,
    encounter_id: EncounterId,
) -> Result<Mutation<()>, CombatError> {
    let index = state
        .encounters
        .iter()
        .position(|e| e.id == encounter_id)
        .ok_or_else(|| CombatError::not_found("Encounter", encounter_id))?;
    let encounter = state.encounters.remove(index);
    state.sessions.retain(|s| s.encounter_id != encounter_id);

    let mut effects = Effects::none();
    effects.encounters_changed(encounter.campaign_id, Some(encounter_id));
    tracing::info!(encounter_id = %encounter_id, "Encounter deleted");
    Ok(Mutation::new((), effects))
}

pub struct EncounterCrud {
    store: TrackerStore,
    effects: Arc<EffectRunner>,
    clock: Arc<dyn ClockPort>,
}

impl EncounterCrud {
    pub fn new(store: TrackerStore, effects: Arc<EffectRunner>, clock: Arc<dyn ClockPort>) -> Self {
        Self {
            store,
            effects,
            clock,
        }
    }

    pub async fn list(&self, campaign_id: CampaignId) -> Result<Vec<EncounterData>, CombatError> {
        self.store.read(|s| list_encounters(s, campaign_id)).await
    }

    pub async fn get(&self, encounter_id: EncounterId) -> Result<EncounterData, CombatError> {
        self.store.read(|s| get_encounter(s, encounter_id)).await
    }

    pub async fn create(
        &self,
        campaign_id: CampaignId,
        name: &str,
    ) -> Result<EncounterData, CombatError> {
        let now = self.clock.now();
        let mutation = self
            .store
            .mutate(|s| create_encounter(s, campaign_id, name, now))
            .await?;
        Ok(self.effects.run(mutation).await)
    }

    pub async fn delete(&self, encounter_id: EncounterId) -> Result<(), CombatError> {
        let mutation = self
            .store
            .mutate(|s| delete_encounter(s, encounter_id))
            .await?;
        self.effects.run(mutation).await;
        Ok(())
    }
}
