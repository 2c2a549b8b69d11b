//! Campaign-wide full rest.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use combatdesk_domain::{CampaignId, EncounterId, Player, PlayerId};
use combatdesk_shared::FullRestResult;

use super::effects::{EffectRunner, Effects, Mutation};
use super::error::CombatError;
use crate::infrastructure::ports::ClockPort;
use crate::stores::{TrackerState, TrackerStore};

/// Rest every player in the campaign and mirror the result onto the player
/// rows of every encounter that is not complete.
///
/// Only encounters whose rows actually changed are broadcast.
pub fn full_rest(
    state: &mut TrackerState,
    campaign_id: CampaignId,
    now: DateTime<Utc>,
) -> Result<Mutation<FullRestResult>, CombatError> {
    if state.campaign(campaign_id).is_none() {
        return Err(CombatError::not_found("Campaign", campaign_id));
    }

    let mut effects = Effects::none();
    let mut rested: HashMap<PlayerId, Player> = HashMap::new();
    let mut any_player_changed = false;
    for player in state
        .players
        .iter_mut()
        .filter(|p| p.campaign_id == campaign_id)
    {
        any_player_changed |= player.full_rest(now);
        rested.insert(player.id, player.clone());
    }
    if any_player_changed {
        effects.players_changed(campaign_id, None);
    }

    let open: Vec<EncounterId> = state
        .encounters_in(campaign_id)
        .filter(|e| !e.is_complete())
        .map(|e| e.id)
        .collect();

    let mut encounters_changed = Vec::new();
    for session in state
        .sessions
        .iter_mut()
        .filter(|s| open.contains(&s.encounter_id))
    {
        let mut changed = false;
        for row in session.combatants.iter_mut() {
            if let Some(player) = row.base.player_id().and_then(|id| rested.get(&id)) {
                changed |= row.mirror_player(player);
            }
        }
        if changed {
            effects.combatants_changed(session.encounter_id);
            encounters_changed.push(session.encounter_id.to_uuid());
        }
    }

    tracing::info!(
        campaign_id = %campaign_id,
        players = rested.len(),
        encounters = encounters_changed.len(),
        "Full rest"
    );
    Ok(Mutation::new(
        FullRestResult {
            players_rested: rested.len(),
            encounters_changed,
        },
        effects,
    ))
}

pub struct RestOps {
    store: TrackerStore,
    effects: Arc<EffectRunner>,
    clock: Arc<dyn ClockPort>,
}

impl RestOps {
    pub fn new(store: TrackerStore, effects: Arc<EffectRunner>, clock: Arc<dyn ClockPort>) -> Self {
        Self {
            store,
            effects,
            clock,
        }
    }

    pub async fn full_rest(&self, campaign_id: CampaignId) -> Result<FullRestResult, CombatError> {
        let now = self.clock.now();
        let mutation = self
            .store
            .mutate(|s| full_rest(s, campaign_id, now))
            .await?;
        Ok(self.effects.run(mutation).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use combatdesk_domain::{
        Campaign, Combatant, ConditionInstance, Encounter, EncounterStatus, MonsterId,
        MonsterTemplate, Overrides,
    };
    use combatdesk_shared::Topic;

    #[test]
    fn rests_players_and_mirrors_only_open_encounters() {
        let now = Utc::now();
        let mut state = TrackerState::default();
        let campaign = Campaign::new("Phandelver", now);
        let campaign_id = campaign.id;
        state.campaigns.push(campaign);

        let mut player = Player::new(campaign_id, "Ilsa", "Sam", 30, 15, now);
        player.hp_current = 3;
        player.overrides = Overrides {
            temp_hp: 5,
            ac_bonus: 2,
            hp_max_override: Some(4),
        };
        player.conditions.push(ConditionInstance::new("poisoned"));

        let open = Encounter::new(campaign_id, "Open", now);
        let mut done = Encounter::new(campaign_id, "Done", now);
        done.status = EncounterStatus::Complete;
        let untouched = Encounter::new(campaign_id, "Monsters only", now);

        let template = MonsterTemplate {
            id: MonsterId::new(),
            name: "Wolf".into(),
            ac: 13,
            hp: 11,
            attacks: serde_json::Value::Null,
        };
        let mut wolf = Combatant::for_monster(untouched.id, &template, "Wolf 1", now);
        wolf.hp_current = 2;

        for encounter in [&open, &done] {
            state
                .session_entry(encounter.id)
                .combatants
                .push(Combatant::for_player(encounter.id, &player, now));
        }
        state.session_entry(untouched.id).combatants.push(wolf);
        let (open_id, done_id, untouched_id) = (open.id, done.id, untouched.id);
        state.encounters.extend([open, done, untouched]);
        state.players.push(player);

        let result = full_rest(&mut state, campaign_id, now).unwrap();
        assert_eq!(result.value.players_rested, 1);
        assert_eq!(result.value.encounters_changed, vec![open_id.to_uuid()]);

        let player = &state.players[0];
        assert_eq!(player.hp_current, 30);
        assert!(player.overrides.is_cleared());
        assert!(player.conditions.is_empty());

        let open_row = &state.session(open_id).unwrap().combatants[0];
        assert_eq!(open_row.hp_current, 30);
        assert!(open_row.conditions.is_empty());
        assert_eq!(state.session(done_id).unwrap().combatants[0].hp_current, 3);
        assert_eq!(state.session(untouched_id).unwrap().combatants[0].hp_current, 2);

        let topics: Vec<Topic> = result.effects.events.iter().map(|e| e.topic).collect();
        assert_eq!(topics, [Topic::PlayersChanged, Topic::CombatantsChanged]);
    }

    #[test]
    fn unknown_campaign_is_not_found() {
        let mut state = TrackerState::default();
        assert!(full_rest(&mut state, CampaignId::new(), Utc::now())
            .unwrap_err()
            .is_not_found());
    }
}
