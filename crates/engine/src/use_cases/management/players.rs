//! Player master record management.
//!
//! Patches go to the Player record and are mirrored into every combatant row
//! that caches it, the same rule combatant patches follow.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use combatdesk_domain::{CampaignId, Player, PlayerId};
use combatdesk_shared::{CreatePlayerRequest, PatchPlayerRequest, PlayerData};

use crate::infrastructure::ports::ClockPort;
use crate::stores::{TrackerState, TrackerStore};
use crate::use_cases::combat::projector::sync_player_rows;
use crate::use_cases::combat::roster::purge_rows;
use crate::use_cases::combat::{CombatError, EffectRunner, Effects, Mutation};

pub const DEFAULT_PLAYER_HP: i32 = 10;
pub const DEFAULT_PLAYER_AC: i32 = 10;

pub fn list_players(
    state: &TrackerState,
    campaign_id: CampaignId,
) -> Result<Vec<PlayerData>, CombatError> {
    if state.campaign(campaign_id).is_none() {
        return Err(CombatError::not_found("Campaign", campaign_id));
    }
    let mut players: Vec<&Player> = state.players_in(campaign_id).collect();
    players.sort_by_key(|p| p.character_name.to_lowercase());
    Ok(players.into_iter().map(PlayerData::from).collect())
}

pub fn create_player(
    state: &mut TrackerState,
    campaign_id: CampaignId,
    request: &CreatePlayerRequest,
    now: DateTime<Utc>,
) -> Result<Mutation<PlayerData>, CombatError> {
    if state.campaign(campaign_id).is_none() {
        return Err(CombatError::not_found("Campaign", campaign_id));
    }
    let character_name = request.character_name.trim();
    if character_name.is_empty() {
        return Err(CombatError::invalid("Character name cannot be empty"));
    }

    let player = Player::new(
        campaign_id,
        character_name,
        request.player_name.trim(),
        request.hp_max.unwrap_or(DEFAULT_PLAYER_HP),
        request.ac.unwrap_or(DEFAULT_PLAYER_AC),
        now,
    );
    let data = PlayerData::from(&player);
    tracing::info!(campaign_id = %campaign_id, player_id = %player.id, "Player created");

    let mut effects = Effects::none();
    effects.players_changed(campaign_id, Some(player.id));
    state.players.push(player);
    Ok(Mutation::new(data, effects))
}

pub fn patch_player(
    state: &mut TrackerState,
    player_id: PlayerId,
    request: &PatchPlayerRequest,
    now: DateTime<Utc>,
) -> Result<Mutation<PlayerData>, CombatError> {
    let player = state
        .player_mut(player_id)
        .ok_or_else(|| CombatError::not_found("Player", player_id))?;

    let before = player.clone();
    if let Some(name) = request
        .character_name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
    {
        player.character_name = name.to_string();
    }
    if let Some(name) = &request.player_name {
        player.player_name = name.trim().to_string();
    }
    player.apply_stats(&request.stats(), now);

    let changed = *player != before;
    if changed {
        player.updated_at = now;
    }
    let campaign_id = player.campaign_id;
    let data = PlayerData::from(&*player);

    let mut effects = Effects::none();
    if changed {
        effects.players_changed(campaign_id, Some(player_id));
        sync_player_rows(state, player_id, &mut effects);
        tracing::info!(player_id = %player_id, "Player updated");
    }
    Ok(Mutation::new(data, effects))
}

/// Delete a player and every combatant row pointing at it.
pub fn delete_player(
    state: &mut TrackerState,
    player_id: PlayerId,
    now: DateTime<Utc>,
) -> Result<Mutation<()>, CombatError> {
    let index = state
        .players
        .iter()
        .position(|p| p.id == player_id)
        .ok_or_else(|| CombatError::not_found("Player", player_id))?;
    let player = state.players.remove(index);

    let mut effects = Effects::none();
    effects.players_changed(player.campaign_id, Some(player_id));
    let touched = purge_rows(
        state,
        |c| c.base.player_id() == Some(player_id),
        now,
        &mut effects,
    )?;
    tracing::info!(player_id = %player_id, encounters = touched.len(), "Player deleted");
    Ok(Mutation::new((), effects))
}

pub struct PlayerCrud {
    store: TrackerStore,
    effects: Arc<EffectRunner>,
    clock: Arc<dyn ClockPort>,
}

impl PlayerCrud {
    pub fn new(store: TrackerStore, effects: Arc<EffectRunner>, clock: Arc<dyn ClockPort>) -> Self {
        Self {
            store,
            effects,
            clock,
        }
    }

    pub async fn list(&self, campaign_id: CampaignId) -> Result<Vec<PlayerData>, CombatError> {
        self.store.read(|s| list_players(s, campaign_id)).await
    }

    pub async fn create(
        &self,
        campaign_id: CampaignId,
        request: CreatePlayerRequest,
    ) -> Result<PlayerData, CombatError> {
        let now = self.clock.now();
        let mutation = self
            .store
            .mutate(|s| create_player(s, campaign_id, &request, now))
            .await?;
        Ok(self.effects.run(mutation).await)
    }

    pub async fn update(
        &self,
        player_id: PlayerId,
        request: PatchPlayerRequest,
    ) -> Result<PlayerData, CombatError> {
        let now = self.clock.now();
        let mutation = self
            .store
            .mutate(|s| patch_player(s, player_id, &request, now))
            .await?;
        Ok(self.effects.run(mutation).await)
    }

    pub async fn delete(&self, player_id: PlayerId) -> Result<(), CombatError> {
        let now = self.clock.now();
        let mutation = self
            .store
            .mutate(|s| delete_player(s, player_id, now))
            .await?;
        self.effects.run(mutation).await;
        Ok(())
    }
}
