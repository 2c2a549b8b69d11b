//! Turn stepping, explicit combat state writes and encounter lifecycle.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use combatdesk_domain::turn_order;
use combatdesk_domain::{CombatantId, EncounterId, EncounterStatus, TurnState};
use combatdesk_shared::CombatStateData;

use super::effects::{EffectRunner, Effects, Mutation};
use super::error::CombatError;
use super::session::{commit_turn, current_turn, open_session, read_combat_state};
use crate::infrastructure::ports::ClockPort;
use crate::stores::{TrackerState, TrackerStore};

/// Write `{round, activeCombatantId}` directly. Each field is optional; an
/// active id that is not in the roster is repaired like any dangling pointer.
pub fn set_combat_state(
    state: &mut TrackerState,
    encounter_id: EncounterId,
    round: Option<i64>,
    active_id: Option<Option<CombatantId>>,
    now: DateTime<Utc>,
) -> Result<Mutation<CombatStateData>, CombatError> {
    open_session(state, encounter_id)?;
    let current = current_turn(state, encounter_id);

    let round = round
        .map(|r| r.clamp(1, i64::from(u32::MAX)) as u32)
        .unwrap_or(current.round);
    let active_id = active_id.unwrap_or(current.active_id);
    let roster = state
        .session(encounter_id)
        .map(|s| s.combatants.as_slice())
        .unwrap_or(&[]);
    let turn = turn_order::ensure_active(roster, TurnState::new(round, active_id));

    let mut effects = Effects::none();
    commit_turn(state, encounter_id, turn, now, &mut effects)?;
    tracing::info!(encounter_id = %encounter_id, round = turn.round, active = ?turn.active_id, "Combat state set");
    Ok(Mutation::new(read_combat_state(state, encounter_id)?, effects))
}

#[derive(Debug, Clone, Copy)]
enum Step {
    Next,
    Prev,
}

fn step_turn(
    state: &mut TrackerState,
    encounter_id: EncounterId,
    step: Step,
    now: DateTime<Utc>,
) -> Result<Mutation<CombatStateData>, CombatError> {
    let current = read_combat_state(state, encounter_id)?.turn_state();
    let roster = state
        .session(encounter_id)
        .map(|s| s.combatants.as_slice())
        .unwrap_or(&[]);
    let turn = match step {
        Step::Next => turn_order::next_turn(roster, current),
        Step::Prev => turn_order::prev_turn(roster, current),
    };
    if turn == current {
        tracing::debug!(encounter_id = %encounter_id, ?step, "Turn step is a no-op");
        return Ok(Mutation::unchanged(read_combat_state(state, encounter_id)?));
    }

    let mut effects = Effects::none();
    commit_turn(state, encounter_id, turn, now, &mut effects)?;
    tracing::info!(encounter_id = %encounter_id, ?step, round = turn.round, "Turn advanced");
    Ok(Mutation::new(read_combat_state(state, encounter_id)?, effects))
}

pub fn next_turn(
    state: &mut TrackerState,
    encounter_id: EncounterId,
    now: DateTime<Utc>,
) -> Result<Mutation<CombatStateData>, CombatError> {
    step_turn(state, encounter_id, Step::Next, now)
}

pub fn prev_turn(
    state: &mut TrackerState,
    encounter_id: EncounterId,
    now: DateTime<Utc>,
) -> Result<Mutation<CombatStateData>, CombatError> {
    step_turn(state, encounter_id, Step::Prev, now)
}

/// Start the same encounter over: initiative cleared everywhere, monsters and
/// iNPCs healed, player stats untouched.
pub fn reset_fight(
    state: &mut TrackerState,
    encounter_id: EncounterId,
    now: DateTime<Utc>,
) -> Result<Mutation<CombatStateData>, CombatError> {
    let session = open_session(state, encounter_id)?;
    for combatant in session.combatants.iter_mut() {
        combatant.reset_for_new_fight();
    }

    let mut effects = Effects::none();
    effects.combatants_changed(encounter_id);
    if let Some(encounter) = state.encounter_mut(encounter_id) {
        encounter.status = EncounterStatus::Open;
        effects.encounters_changed(encounter.campaign_id, Some(encounter_id));
    }
    commit_turn(state, encounter_id, TurnState::default(), now, &mut effects)?;
    tracing::info!(encounter_id = %encounter_id, "Fight reset");
    Ok(Mutation::new(read_combat_state(state, encounter_id)?, effects))
}

/// Mark the encounter complete and clear the active pointer.
pub fn end_combat(
    state: &mut TrackerState,
    encounter_id: EncounterId,
    now: DateTime<Utc>,
) -> Result<Mutation<CombatStateData>, CombatError> {
    open_session(state, encounter_id)?;
    let round = current_turn(state, encounter_id).round;

    let mut effects = Effects::none();
    if let Some(encounter) = state.encounter_mut(encounter_id) {
        encounter.status = EncounterStatus::Complete;
        effects.encounters_changed(encounter.campaign_id, Some(encounter_id));
    }
    commit_turn(state, encounter_id, TurnState::new(round, None), now, &mut effects)?;
    tracing::info!(encounter_id = %encounter_id, round, "Combat ended");
    Ok(Mutation::new(read_combat_state(state, encounter_id)?, effects))
}

/// Turn use cases bound to the store and side-effect runner.
pub struct TurnOps {
    store: TrackerStore,
    effects: Arc<EffectRunner>,
    clock: Arc<dyn ClockPort>,
}

impl TurnOps {
    pub fn new(store: TrackerStore, effects: Arc<EffectRunner>, clock: Arc<dyn ClockPort>) -> Self {
        Self {
            store,
            effects,
            clock,
        }
    }

    pub async fn get(&self, encounter_id: EncounterId) -> Result<CombatStateData, CombatError> {
        self.store
            .read(|s| read_combat_state(s, encounter_id))
            .await
    }

    pub async fn set(
        &self,
        encounter_id: EncounterId,
        round: Option<i64>,
        active_id: Option<Option<CombatantId>>,
    ) -> Result<CombatStateData, CombatError> {
        let now = self.clock.now();
        let mutation = self
            .store
            .mutate(|s| set_combat_state(s, encounter_id, round, active_id, now))
            .await?;
        Ok(self.effects.run(mutation).await)
    }

    pub async fn next(&self, encounter_id: EncounterId) -> Result<CombatStateData, CombatError> {
        let now = self.clock.now();
        let mutation = self
            .store
            .mutate(|s| next_turn(s, encounter_id, now))
            .await?;
        Ok(self.effects.run(mutation).await)
    }

    pub async fn prev(&self, encounter_id: EncounterId) -> Result<CombatStateData, CombatError> {
        let now = self.clock.now();
        let mutation = self
            .store
            .mutate(|s| prev_turn(s, encounter_id, now))
            .await?;
        Ok(self.effects.run(mutation).await)
    }

    pub async fn reset(&self, encounter_id: EncounterId) -> Result<CombatStateData, CombatError> {
        let now = self.clock.now();
        let mutation = self
            .store
            .mutate(|s| reset_fight(s, encounter_id, now))
            .await?;
        Ok(self.effects.run(mutation).await)
    }

    pub async fn end(&self, encounter_id: EncounterId) -> Result<CombatStateData, CombatError> {
        let now = self.clock.now();
        let mutation = self
            .store
            .mutate(|s| end_combat(s, encounter_id, now))
            .await?;
        Ok(self.effects.run(mutation).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use combatdesk_domain::{
        CampaignId, Combatant, Encounter, MonsterId, MonsterTemplate, Player,
    };
    use combatdesk_shared::Topic;

    struct Fight {
        state: TrackerState,
        encounter_id: EncounterId,
        pc: CombatantId,
        orc: CombatantId,
        rat: CombatantId,
    }

    /// PC at 20, orc at 15, rat at 5. Combat already started on the PC.
    fn fight() -> Fight {
        let now = Utc::now();
        let campaign_id = CampaignId::new();
        let mut state = TrackerState::default();
        let encounter = Encounter::new(campaign_id, "Cellar", now);
        let encounter_id = encounter.id;
        state.encounters.push(encounter);

        let player = Player::new(campaign_id, "Ilsa", "Sam", 30, 15, now);
        let template = MonsterTemplate {
            id: MonsterId::new(),
            name: "Orc".into(),
            ac: 13,
            hp: 15,
            attacks: serde_json::Value::Null,
        };
        let mut pc = Combatant::for_player(encounter_id, &player, now);
        pc.initiative = Some(20.0);
        let mut orc = Combatant::for_monster(encounter_id, &template, "Orc 1", now);
        orc.initiative = Some(15.0);
        let mut rat = Combatant::for_monster(encounter_id, &template, "Rat", now);
        rat.initiative = Some(5.0);
        let ids = (pc.id, orc.id, rat.id);

        state.players.push(player);
        state
            .session_entry(encounter_id)
            .combatants
            .extend([pc, orc, rat]);
        let mut effects = Effects::none();
        commit_turn(
            &mut state,
            encounter_id,
            TurnState::new(1, Some(ids.0)),
            now,
            &mut effects,
        )
        .unwrap();

        Fight {
            state,
            encounter_id,
            pc: ids.0,
            orc: ids.1,
            rat: ids.2,
        }
    }

    fn active(state: &CombatStateData) -> Option<CombatantId> {
        state.active_combatant_id.map(CombatantId::from_uuid)
    }

    #[test]
    fn next_skips_dead_monster_and_wraps() {
        let mut f = fight();
        f.state
            .session_mut(f.encounter_id)
            .unwrap()
            .combatant_mut(f.orc)
            .unwrap()
            .hp_current = 0;

        let state = next_turn(&mut f.state, f.encounter_id, Utc::now()).unwrap();
        assert_eq!(active(&state.value), Some(f.rat));
        assert_eq!(state.value.round, 1);
        assert_eq!(state.effects.events[0].topic, Topic::CombatChanged);

        let state = next_turn(&mut f.state, f.encounter_id, Utc::now()).unwrap();
        assert_eq!(active(&state.value), Some(f.pc));
        assert_eq!(state.value.round, 2);
        assert_eq!(f.state.encounter(f.encounter_id).unwrap().combat.round, 2);
    }

    #[test]
    fn prev_from_first_drops_round_but_not_below_one() {
        let mut f = fight();
        let state = prev_turn(&mut f.state, f.encounter_id, Utc::now()).unwrap();
        assert_eq!(active(&state.value), Some(f.rat));
        assert_eq!(state.value.round, 1);
    }

    #[test]
    fn step_without_full_initiative_is_unchanged() {
        let mut f = fight();
        f.state
            .session_mut(f.encounter_id)
            .unwrap()
            .combatant_mut(f.rat)
            .unwrap()
            .initiative = None;
        let result = next_turn(&mut f.state, f.encounter_id, Utc::now()).unwrap();
        assert!(result.effects.is_empty());
        assert_eq!(active(&result.value), Some(f.pc));
    }

    #[test]
    fn set_state_fields_are_independent() {
        let mut f = fight();
        let state =
            set_combat_state(&mut f.state, f.encounter_id, Some(0), None, Utc::now()).unwrap();
        assert_eq!(state.value.round, 1);
        assert_eq!(active(&state.value), Some(f.pc));

        let state = set_combat_state(
            &mut f.state,
            f.encounter_id,
            None,
            Some(Some(f.orc)),
            Utc::now(),
        )
        .unwrap();
        assert_eq!(active(&state.value), Some(f.orc));

        let state = set_combat_state(
            &mut f.state,
            f.encounter_id,
            Some(7),
            Some(Some(CombatantId::new())),
            Utc::now(),
        )
        .unwrap();
        assert_eq!(state.value.round, 7);
        assert_eq!(active(&state.value), Some(f.pc));
    }

    #[test]
    fn reset_keeps_player_stats() {
        let mut f = fight();
        {
            let session = f.state.session_mut(f.encounter_id).unwrap();
            session.combatant_mut(f.orc).unwrap().hp_current = 2;
            session.combatant_mut(f.pc).unwrap().hp_current = 4;
        }
        let result = reset_fight(&mut f.state, f.encounter_id, Utc::now()).unwrap();
        assert_eq!(result.value.round, 1);
        assert_eq!(result.value.active_combatant_id, None);

        let session = f.state.session(f.encounter_id).unwrap();
        assert_eq!(session.combatant(f.orc).unwrap().hp_current, 15);
        assert_eq!(session.combatant(f.pc).unwrap().hp_current, 4);
        assert!(session.combatants.iter().all(|c| c.initiative.is_none()));
        assert_eq!(
            f.state.encounter(f.encounter_id).unwrap().status,
            EncounterStatus::Open
        );
    }

    #[test]
    fn end_combat_completes_and_clears_active() {
        let mut f = fight();
        let result = end_combat(&mut f.state, f.encounter_id, Utc::now()).unwrap();
        assert_eq!(result.value.active_combatant_id, None);
        assert_eq!(
            f.state.encounter(f.encounter_id).unwrap().status,
            EncounterStatus::Complete
        );
        let topics: Vec<Topic> = result.effects.events.iter().map(|e| e.topic).collect();
        assert_eq!(topics, [Topic::EncountersChanged, Topic::CombatChanged]);
    }

    #[test]
    fn unknown_encounter_is_not_found() {
        let mut f = fight();
        assert!(next_turn(&mut f.state, EncounterId::new(), Utc::now())
            .unwrap_err()
            .is_not_found());
    }
}
