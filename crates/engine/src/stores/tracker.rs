//! In-memory tracker store.
//!
//! One `TrackerState` holds every campaign, player, iNPC, encounter and live
//! combat session. It is owned by a `TrackerStore` handle that is created on
//! startup from the persisted JSON file and injected into every use case.
//!
//! Mutations go through [`TrackerStore::mutate`], which runs a synchronous
//! closure under the write lock. Nothing awaits while the lock is held.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use combatdesk_domain::turn_order::{order_by_initiative, TurnParticipant};
use combatdesk_domain::{
    Campaign, CampaignId, Combatant, CombatantId, Encounter, EncounterId, Inpc, InpcId, Player,
    PlayerId, TurnState,
};

use crate::infrastructure::persistence::{read_state, PersistenceError};

/// Live combat record for one encounter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CombatSession {
    pub encounter_id: EncounterId,
    pub round: u32,
    /// Position of the active combatant in turn order.
    #[serde(default)]
    pub active_index: Option<usize>,
    #[serde(default)]
    pub active_combatant_id: Option<CombatantId>,
    #[serde(default)]
    pub combatants: Vec<Combatant>,
    /// Set the first time turn state is written; `None` means the session has
    /// never recorded a turn of its own.
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl CombatSession {
    pub fn new(encounter_id: EncounterId) -> Self {
        Self {
            encounter_id,
            round: 1,
            active_index: None,
            active_combatant_id: None,
            combatants: Vec::new(),
            updated_at: None,
        }
    }

    pub fn turn_state(&self) -> TurnState {
        TurnState::new(self.round, self.active_combatant_id)
    }

    /// Record a new turn state and recompute the active index.
    pub fn set_turn_state(&mut self, turn: TurnState, now: DateTime<Utc>) {
        self.round = turn.round.max(1);
        self.active_combatant_id = turn.active_id;
        self.active_index = turn.active_id.and_then(|id| {
            order_by_initiative(&self.combatants)
                .iter()
                .position(|c| c.combatant_id() == id)
        });
        self.updated_at = Some(now);
    }

    pub fn combatant(&self, id: CombatantId) -> Option<&Combatant> {
        self.combatants.iter().find(|c| c.id == id)
    }

    pub fn combatant_mut(&mut self, id: CombatantId) -> Option<&mut Combatant> {
        self.combatants.iter_mut().find(|c| c.id == id)
    }

    pub fn contains_player(&self, player_id: PlayerId) -> bool {
        self.combatants
            .iter()
            .any(|c| c.base.player_id() == Some(player_id))
    }
}

/// Everything the tracker knows, persisted as one JSON document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TrackerState {
    pub campaigns: Vec<Campaign>,
    pub players: Vec<Player>,
    pub inpcs: Vec<Inpc>,
    pub encounters: Vec<Encounter>,
    pub sessions: Vec<CombatSession>,
}

impl TrackerState {
    pub fn campaign(&self, id: CampaignId) -> Option<&Campaign> {
        self.campaigns.iter().find(|c| c.id == id)
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn player_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == id)
    }

    pub fn inpc(&self, id: InpcId) -> Option<&Inpc> {
        self.inpcs.iter().find(|i| i.id == id)
    }

    pub fn encounter(&self, id: EncounterId) -> Option<&Encounter> {
        self.encounters.iter().find(|e| e.id == id)
    }

    pub fn encounter_mut(&mut self, id: EncounterId) -> Option<&mut Encounter> {
        self.encounters.iter_mut().find(|e| e.id == id)
    }

    pub fn session(&self, encounter_id: EncounterId) -> Option<&CombatSession> {
        self.sessions.iter().find(|s| s.encounter_id == encounter_id)
    }

    pub fn session_mut(&mut self, encounter_id: EncounterId) -> Option<&mut CombatSession> {
        self.sessions
            .iter_mut()
            .find(|s| s.encounter_id == encounter_id)
    }

    /// Get or lazily create the session for an encounter.
    pub fn session_entry(&mut self, encounter_id: EncounterId) -> &mut CombatSession {
        let index = match self
            .sessions
            .iter()
            .position(|s| s.encounter_id == encounter_id)
        {
            Some(index) => index,
            None => {
                tracing::debug!(encounter_id = %encounter_id, "Creating combat session");
                self.sessions.push(CombatSession::new(encounter_id));
                self.sessions.len() - 1
            }
        };
        &mut self.sessions[index]
    }

    pub fn players_in(&self, campaign_id: CampaignId) -> impl Iterator<Item = &Player> {
        self.players
            .iter()
            .filter(move |p| p.campaign_id == campaign_id)
    }

    pub fn inpcs_in(&self, campaign_id: CampaignId) -> impl Iterator<Item = &Inpc> {
        self.inpcs
            .iter()
            .filter(move |i| i.campaign_id == campaign_id)
    }

    pub fn encounters_in(&self, campaign_id: CampaignId) -> impl Iterator<Item = &Encounter> {
        self.encounters
            .iter()
            .filter(move |e| e.campaign_id == campaign_id)
    }
}

/// Shared handle to the tracker state.
#[derive(Clone, Default)]
pub struct TrackerStore {
    inner: Arc<RwLock<TrackerState>>,
}

impl TrackerStore {
    pub fn new(state: TrackerState) -> Self {
        Self {
            inner: Arc::new(RwLock::new(state)),
        }
    }

    /// Load the persisted store, starting empty if the file does not exist.
    pub async fn load(path: &Path) -> Result<Self, PersistenceError> {
        let state = read_state(path).await?;
        tracing::info!(
            path = %path.display(),
            campaigns = state.campaigns.len(),
            encounters = state.encounters.len(),
            "Loaded tracker store"
        );
        Ok(Self::new(state))
    }

    /// Run a read-only closure against the current state.
    pub async fn read<T>(&self, f: impl FnOnce(&TrackerState) -> T) -> T {
        let guard = self.inner.read().await;
        f(&guard)
    }

    /// Run a mutation under the write lock. The closure is synchronous so the
    /// lock is never held across an await point.
    pub async fn mutate<T, E>(
        &self,
        f: impl FnOnce(&mut TrackerState) -> Result<T, E>,
    ) -> Result<T, E> {
        let mut guard = self.inner.write().await;
        f(&mut guard)
    }

    pub async fn snapshot(&self) -> TrackerState {
        self.inner.read().await.clone()
    }
}
