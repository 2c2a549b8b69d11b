//! Important NPC management.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use combatdesk_domain::{CampaignId, Inpc, InpcId, MonsterId};
use combatdesk_shared::{CreateInpcRequest, InpcData};

use crate::infrastructure::ports::{ClockPort, CompendiumPort};
use crate::stores::{TrackerState, TrackerStore};
use crate::use_cases::combat::roster::purge_rows;
use crate::use_cases::combat::{CombatError, EffectRunner, Effects, Mutation};

const DEFAULT_INPC_HP: i32 = 10;
const DEFAULT_INPC_AC: i32 = 10;

pub fn list_inpcs(
    state: &TrackerState,
    campaign_id: CampaignId,
) -> Result<Vec<InpcData>, CombatError> {
    if state.campaign(campaign_id).is_none() {
        return Err(CombatError::not_found("Campaign", campaign_id));
    }
    let mut inpcs: Vec<&Inpc> = state.inpcs_in(campaign_id).collect();
    inpcs.sort_by_key(|i| i.name.to_lowercase());
    Ok(inpcs.into_iter().map(InpcData::from).collect())
}

/// Create an iNPC, seeding unspecified fields from a compendium template.
pub fn create_inpc(
    state: &mut TrackerState,
    campaign_id: CampaignId,
    request: &CreateInpcRequest,
    compendium: &dyn CompendiumPort,
    now: DateTime<Utc>,
) -> Result<Mutation<InpcData>, CombatError> {
    if state.campaign(campaign_id).is_none() {
        return Err(CombatError::not_found("Campaign", campaign_id));
    }
    let template = match request.monster_id.map(MonsterId::from_uuid) {
        Some(monster_id) => Some(
            compendium
                .monster(monster_id)
                .ok_or_else(|| CombatError::not_found("Monster", monster_id))?,
        ),
        None => None,
    };

    let name = request
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .or(template.as_ref().map(|t| t.name.as_str()))
        .ok_or_else(|| CombatError::invalid("iNPC needs a name or a monster template"))?;
    let hp_max = request
        .hp_max
        .or(template.as_ref().map(|t| t.hp))
        .unwrap_or(DEFAULT_INPC_HP);
    let ac = request
        .ac
        .or(template.as_ref().map(|t| t.ac))
        .unwrap_or(DEFAULT_INPC_AC);

    let mut inpc = Inpc::new(campaign_id, name, hp_max, ac, now);
    if let Some(template) = &template {
        inpc = inpc.with_monster(template.id);
    }
    if let Some(friendly) = request.friendly {
        inpc.friendly = friendly;
    }
    let data = InpcData::from(&inpc);
    tracing::info!(campaign_id = %campaign_id, inpc_id = %inpc.id, "iNPC created");
    state.inpcs.push(inpc);

    let mut effects = Effects::none();
    effects.inpcs_changed(campaign_id);
    Ok(Mutation::new(data, effects))
}

/// Delete an iNPC and every combatant instance of it.
pub fn delete_inpc(
    state: &mut TrackerState,
    inpc_id: InpcId,
    now: DateTime<Utc>,
) -> Result<Mutation<()>, CombatError> {
    let index = state
        .inpcs
        .iter()
        .position(|i| i.id == inpc_id)
        .ok_or_else(|| CombatError::not_found("Inpc", inpc_id))?;
    let inpc = state.inpcs.remove(index);

    let mut effects = Effects::none();
    effects.inpcs_changed(inpc.campaign_id);
    let touched = purge_rows(
        state,
        |c| c.base.inpc_id() == Some(inpc_id),
        now,
        &mut effects,
    )?;
    tracing::info!(inpc_id = %inpc_id, encounters = touched.len(), "iNPC deleted");
    Ok(Mutation::new((), effects))
}

pub struct InpcCrud {
    store: TrackerStore,
    effects: Arc<EffectRunner>,
    compendium: Arc<dyn CompendiumPort>,
    clock: Arc<dyn ClockPort>,
}

impl InpcCrud {
    pub fn new(
        store: TrackerStore,
        effects: Arc<EffectRunner>,
        compendium: Arc<dyn CompendiumPort>,
        clock: Arc<dyn ClockPort>,
    ) -> Self {
        Self {
            store,
            effects,
            compendium,
            clock,
        }
    }

    pub async fn list(&self, campaign_id: CampaignId) -> Result<Vec<InpcData>, CombatError> {
        self.store.read(|s| list_inpcs(s, campaign_id)).await
    }

    pub async fn create(
        &self,
        campaign_id: CampaignId,
        request: CreateInpcRequest,
    ) -> Result<InpcData, CombatError> {
        let now = self.clock.now();
        let compendium = self.compendium.as_ref();
        let mutation = self
            .store
            .mutate(|s| create_inpc(s, campaign_id, &request, compendium, now))
            .await?;
        Ok(self.effects.run(mutation).await)
    }

    pub async fn delete(&self, inpc_id: InpcId) -> Result<(), CombatError> {
        let now = self.clock.now();
        let mutation = self
            .store
            .mutate(|s| delete_inpc(s, inpc_id, now))
            .await?;
        self.effects.run(mutation).await;
        Ok(())
    }
}
