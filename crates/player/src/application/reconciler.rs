//! Broadcast reconciliation.
//!
//! A broadcast only says which resource family changed. The reconciler maps
//! it to the smallest set of re-fetches that covers the open encounter and
//! replaces the cached copies with whatever the engine returns. A (re)connect
//! re-fetches everything, since broadcasts missed while offline are gone.

use std::sync::Arc;

use uuid::Uuid;

use combatdesk_shared::{BroadcastPayload, ServerMessage, Topic};

use crate::infrastructure::websocket::ConnectionEvent;
use crate::ports::{ClientError, TrackerApiPort};
use crate::state::{EncounterState, SharedEncounterState};

/// Resources to pull for one event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefetchPlan {
    pub encounter: bool,
    pub roster: bool,
    pub combat: bool,
    pub players: bool,
}

impl RefetchPlan {
    pub fn nothing() -> Self {
        Self::default()
    }

    pub fn everything() -> Self {
        Self {
            encounter: true,
            roster: true,
            combat: true,
            players: true,
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::nothing()
    }
}

/// Decide what a broadcast invalidates for the encounter held in `state`.
pub fn plan_for(topic: Topic, payload: &BroadcastPayload, state: &EncounterState) -> RefetchPlan {
    let ours = payload.encounter_id == Some(state.encounter_id);
    let our_campaign = match (state.campaign_id(), payload.campaign_id) {
        (Some(mine), Some(theirs)) => mine == theirs,
        // Not fetched yet: anything campaign-scoped might be ours.
        (None, _) => true,
        (Some(_), None) => false,
    };

    match topic {
        Topic::CombatantsChanged if ours => RefetchPlan {
            roster: true,
            ..RefetchPlan::nothing()
        },
        Topic::CombatChanged if ours => RefetchPlan {
            combat: true,
            ..RefetchPlan::nothing()
        },
        Topic::EncountersChanged if ours || (our_campaign && payload.encounter_id.is_none()) => {
            RefetchPlan {
                encounter: true,
                combat: true,
                ..RefetchPlan::nothing()
            }
        }
        Topic::PlayersChanged if our_campaign => {
            // The merged roster carries live player stats.
            let in_roster = match payload.player_id {
                Some(player_id) => state
                    .roster
                    .iter()
                    .any(|c| c.base_type == "player" && c.base_id == player_id),
                None => true,
            };
            RefetchPlan {
                players: true,
                roster: in_roster,
                ..RefetchPlan::nothing()
            }
        }
        Topic::CampaignsChanged => RefetchPlan {
            encounter: true,
            ..RefetchPlan::nothing()
        },
        _ => RefetchPlan::nothing(),
    }
}

pub struct Reconciler {
    api: Arc<dyn TrackerApiPort>,
    state: SharedEncounterState,
}

impl Reconciler {
    pub fn new(api: Arc<dyn TrackerApiPort>, state: SharedEncounterState) -> Self {
        Self { api, state }
    }

    /// Handle one event from the WebSocket client and return what was pulled.
    pub async fn handle_event(&self, event: ConnectionEvent) -> RefetchPlan {
        let plan = match event {
            ConnectionEvent::Connected => {
                tracing::info!("Connected, re-fetching everything");
                RefetchPlan::everything()
            }
            ConnectionEvent::Message(ServerMessage::Broadcast { topic, payload }) => {
                let state = self.state.read().await;
                plan_for(topic, &payload, &state)
            }
            ConnectionEvent::Message(ServerMessage::Error { code, message }) => {
                tracing::warn!(%code, %message, "Engine reported an error");
                RefetchPlan::nothing()
            }
            ConnectionEvent::Message(_) | ConnectionEvent::StateChanged(_) => {
                RefetchPlan::nothing()
            }
        };

        if !plan.is_empty() {
            self.apply(plan).await;
        }
        plan
    }

    pub async fn refetch_all(&self) {
        self.apply(RefetchPlan::everything()).await;
    }

    /// Run a plan. Failed fetches keep the cached copy; a 404 for the
    /// encounter clears it.
    pub async fn apply(&self, plan: RefetchPlan) {
        let encounter_id = self.state.read().await.encounter_id;

        if plan.encounter {
            match self.api.get_encounter(encounter_id).await {
                Ok(encounter) => self.state.write().await.replace_encounter(Some(encounter)),
                Err(e) if e.is_not_found() => {
                    self.encounter_gone(encounter_id).await;
                    return;
                }
                Err(e) => log_fetch_failure("encounter", encounter_id, &e),
            }
        }

        if plan.roster {
            match self.api.list_combatants(encounter_id).await {
                Ok(roster) => self.state.write().await.replace_roster(roster),
                Err(e) if e.is_not_found() => {
                    self.encounter_gone(encounter_id).await;
                    return;
                }
                Err(e) => log_fetch_failure("combatants", encounter_id, &e),
            }
        }

        if plan.combat {
            match self.api.get_combat(encounter_id).await {
                Ok(combat) => self.state.write().await.replace_combat(combat),
                Err(e) => log_fetch_failure("combat state", encounter_id, &e),
            }
        }

        if plan.players {
            let campaign_id = self.state.read().await.campaign_id();
            if let Some(campaign_id) = campaign_id {
                match self.api.list_players(campaign_id).await {
                    Ok(players) => self.state.write().await.replace_players(players),
                    Err(e) => log_fetch_failure("players", encounter_id, &e),
                }
            }
        }
    }

    async fn encounter_gone(&self, encounter_id: Uuid) {
        tracing::info!(encounter_id = %encounter_id, "Encounter no longer exists");
        self.state.write().await.replace_encounter(None);
    }
}

fn log_fetch_failure(resource: &str, encounter_id: Uuid, error: &ClientError) {
    tracing::warn!(
        encounter_id = %encounter_id,
        resource,
        error = %error,
        "Re-fetch failed, keeping cached copy"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use combatdesk_shared::{CombatStateData, EncounterData};
    use mockall::predicate::eq;

    use crate::ports::MockTrackerApiPort;
    use crate::state::encounter_state::tests::view;

    fn encounter(id: Uuid, campaign_id: Uuid) -> EncounterData {
        EncounterData {
            id,
            campaign_id,
            name: "Bridge".into(),
            status: "Open".into(),
            combat: CombatStateData::default(),
            created_at: Utc::now(),
        }
    }

    fn fetched_state() -> (EncounterState, Uuid, Uuid) {
        let (encounter_id, campaign_id) = (Uuid::new_v4(), Uuid::new_v4());
        let mut state = EncounterState::new(encounter_id);
        state.replace_encounter(Some(encounter(encounter_id, campaign_id)));
        (state, encounter_id, campaign_id)
    }

    #[test]
    fn other_encounters_are_ignored() {
        let (state, _, _) = fetched_state();
        let payload = BroadcastPayload::encounter(Uuid::new_v4());
        assert!(plan_for(Topic::CombatantsChanged, &payload, &state).is_empty());
        assert!(plan_for(Topic::CombatChanged, &payload, &state).is_empty());
    }

    #[test]
    fn topics_map_to_targeted_fetches() {
        let (mut state, encounter_id, campaign_id) = fetched_state();
        let mine = BroadcastPayload::encounter(encounter_id);

        let plan = plan_for(Topic::CombatantsChanged, &mine, &state);
        assert_eq!(
            plan,
            RefetchPlan {
                roster: true,
                ..RefetchPlan::nothing()
            }
        );

        let plan = plan_for(Topic::CombatChanged, &mine, &state);
        assert!(plan.combat && !plan.roster);

        let scoped = BroadcastPayload::campaign(campaign_id).with_encounter(encounter_id);
        let plan = plan_for(Topic::EncountersChanged, &scoped, &state);
        assert!(plan.encounter && plan.combat);

        let sibling = BroadcastPayload::campaign(campaign_id).with_encounter(Uuid::new_v4());
        assert!(plan_for(Topic::EncountersChanged, &sibling, &state).is_empty());

        // A player who is not in this fight only touches the player list.
        let ilsa = view("Ilsa", Some(12.0), 20, "player");
        let ilsa_id = ilsa.base_id;
        state.replace_roster(vec![ilsa]);
        let outsider = BroadcastPayload::campaign(campaign_id).with_player(Uuid::new_v4());
        let plan = plan_for(Topic::PlayersChanged, &outsider, &state);
        assert!(plan.players && !plan.roster);

        let fighter = BroadcastPayload::campaign(campaign_id).with_player(ilsa_id);
        let plan = plan_for(Topic::PlayersChanged, &fighter, &state);
        assert!(plan.players && plan.roster);

        let other_campaign = BroadcastPayload::campaign(Uuid::new_v4());
        assert!(plan_for(Topic::PlayersChanged, &other_campaign, &state).is_empty());
        assert!(plan_for(Topic::InpcsChanged, &BroadcastPayload::campaign(campaign_id), &state).is_empty());
    }

    #[tokio::test]
    async fn connect_refetches_everything() {
        let (encounter_id, campaign_id) = (Uuid::new_v4(), Uuid::new_v4());
        let mut api = MockTrackerApiPort::new();
        api.expect_get_encounter()
            .with(eq(encounter_id))
            .times(1)
            .returning(move |id| Ok(encounter(id, campaign_id)));
        api.expect_list_combatants()
            .times(1)
            .returning(|_| Ok(vec![view("Orc", Some(15.0), 9, "monster")]));
        api.expect_get_combat().times(1).returning(|_| {
            Ok(CombatStateData {
                round: 3,
                ..CombatStateData::default()
            })
        });
        api.expect_list_players()
            .with(eq(campaign_id))
            .times(1)
            .returning(|_| Ok(Vec::new()));

        let state = EncounterState::shared(encounter_id);
        let reconciler = Reconciler::new(Arc::new(api), state.clone());
        let plan = reconciler.handle_event(ConnectionEvent::Connected).await;
        assert_eq!(plan, RefetchPlan::everything());

        let state = state.read().await;
        assert_eq!(state.campaign_id(), Some(campaign_id));
        assert_eq!(state.roster.len(), 1);
        assert_eq!(state.combat.round, 3);
    }

    #[tokio::test]
    async fn deleted_encounter_clears_cache() {
        let (encounter_id, campaign_id) = (Uuid::new_v4(), Uuid::new_v4());
        let mut api = MockTrackerApiPort::new();
        api.expect_get_encounter()
            .returning(|_| Err(ClientError::NotFound));
        api.expect_list_combatants().never();

        let state = EncounterState::shared(encounter_id);
        {
            let mut s = state.write().await;
            s.replace_encounter(Some(encounter(encounter_id, campaign_id)));
            s.replace_roster(vec![view("Orc", Some(15.0), 9, "monster")]);
        }
        let reconciler = Reconciler::new(Arc::new(api), state.clone());
        reconciler.refetch_all().await;

        let state = state.read().await;
        assert!(state.encounter.is_none());
        assert!(state.roster.is_empty());
    }

    #[tokio::test]
    async fn failed_fetch_keeps_cached_roster() {
        let (state_value, encounter_id, _) = fetched_state();
        let mut api = MockTrackerApiPort::new();
        api.expect_list_combatants()
            .returning(|_| Err(ClientError::Request("connection refused".into())));

        let state = Arc::new(tokio::sync::RwLock::new(state_value));
        state
            .write()
            .await
            .replace_roster(vec![view("Orc", Some(15.0), 9, "monster")]);
        let reconciler = Reconciler::new(Arc::new(api), state.clone());
        let plan = reconciler
            .handle_event(ConnectionEvent::Message(ServerMessage::Broadcast {
                topic: Topic::CombatantsChanged,
                payload: BroadcastPayload::encounter(encounter_id),
            }))
            .await;
        assert!(plan.roster);
        assert_eq!(state.read().await.roster.len(), 1);
    }
}
