//! Merge projector
//!
//! Player-backed combatants cache their stats, but the Player record owns
//! them. Reads overlay the live Player record onto the row; writes of
//! player-owned fields land on the Player record and are then mirrored into
//! every row that points at it. All player write-back goes through
//! [`write_stats`].

use chrono::{DateTime, Utc};

use combatdesk_domain::{CombatantId, EncounterId, HpDelta, PlayerId, StatsPatch};
use combatdesk_domain::Combatant;
use combatdesk_shared::CombatantView;

use super::effects::Effects;
use super::error::CombatError;
use crate::stores::TrackerState;

/// Merged view of one combatant row.
///
/// Rows whose Player record has disappeared fall back to their cached copy.
pub fn project(state: &TrackerState, combatant: &Combatant) -> CombatantView {
    let player = combatant.base.player_id().and_then(|id| state.player(id));
    match player {
        Some(player) => {
            let mut merged = combatant.clone();
            merged.mirror_player(player);
            let mut view = CombatantView::from(&merged);
            view.player_name = Some(player.player_name.clone());
            view
        }
        None => CombatantView::from(combatant),
    }
}

/// Merged roster in insertion order. An untouched encounter has no session
/// and an empty roster.
pub fn project_roster(state: &TrackerState, encounter_id: EncounterId) -> Vec<CombatantView> {
    state
        .session(encounter_id)
        .map(|session| {
            session
                .combatants
                .iter()
                .map(|c| project(state, c))
                .collect()
        })
        .unwrap_or_default()
}

pub fn project_one(
    state: &TrackerState,
    encounter_id: EncounterId,
    combatant_id: CombatantId,
) -> Result<CombatantView, CombatError> {
    state
        .session(encounter_id)
        .and_then(|s| s.combatant(combatant_id))
        .map(|c| project(state, c))
        .ok_or_else(|| CombatError::not_found("Combatant", combatant_id))
}

/// A write of combat stats.
#[derive(Debug, Clone, Copy)]
pub enum StatWrite<'a> {
    Patch(&'a StatsPatch),
    Delta(HpDelta),
}

/// Apply a stats write to a combatant, routing player-owned fields to the
/// Player record.
pub fn write_stats(
    state: &mut TrackerState,
    encounter_id: EncounterId,
    combatant_id: CombatantId,
    write: StatWrite<'_>,
    now: DateTime<Utc>,
    effects: &mut Effects,
) -> Result<(), CombatError> {
    let base = state
        .session(encounter_id)
        .and_then(|s| s.combatant(combatant_id))
        .map(|c| c.base)
        .ok_or_else(|| CombatError::not_found("Combatant", combatant_id))?;

    if let Some(player_id) = base.player_id() {
        if let Some(player) = state.player_mut(player_id) {
            let changed = match write {
                StatWrite::Patch(patch) => player.apply_stats(patch, now),
                StatWrite::Delta(delta) => {
                    let before = (player.hp_current, player.overrides.temp_hp);
                    player.apply_hp_delta(delta, now);
                    before != (player.hp_current, player.overrides.temp_hp)
                }
            };
            if changed {
                let campaign_id = player.campaign_id;
                tracing::info!(player_id = %player_id, encounter_id = %encounter_id, "Player stats written back");
                effects.players_changed(campaign_id, Some(player_id));
                sync_player_rows(state, player_id, effects);
            }
            return Ok(());
        }
        tracing::warn!(
            player_id = %player_id,
            combatant_id = %combatant_id,
            "Player record missing, writing to the combatant row"
        );
    }

    let row = state
        .session_mut(encounter_id)
        .and_then(|s| s.combatant_mut(combatant_id))
        .ok_or_else(|| CombatError::not_found("Combatant", combatant_id))?;
    let before = row.clone();
    match write {
        StatWrite::Patch(patch) => row.apply_stats(patch),
        StatWrite::Delta(delta) => row.apply_hp_delta(delta),
    }
    if *row != before {
        effects.combatants_changed(encounter_id);
    }
    Ok(())
}

/// Refresh every row caching this player and flag their encounters.
pub fn sync_player_rows(state: &mut TrackerState, player_id: PlayerId, effects: &mut Effects) {
    let Some(player) = state.player(player_id).cloned() else {
        return;
    };
    for session in state.sessions.iter_mut() {
        let mut touched = false;
        for row in session
            .combatants
            .iter_mut()
            .filter(|c| c.base.player_id() == Some(player_id))
        {
            row.mirror_player(&player);
            touched = true;
        }
        if touched {
            effects.combatants_changed(session.encounter_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use combatdesk_domain::{CampaignId, ConditionInstance, Player};
    use combatdesk_shared::Topic;

    fn setup() -> (TrackerState, EncounterId, CombatantId, PlayerId) {
        let now = Utc::now();
        let mut state = TrackerState::default();
        let player = Player::new(CampaignId::new(), "Ilsa", "Sam", 30, 15, now);
        let player_id = player.id;
        let encounter_id = EncounterId::new();
        let row = Combatant::for_player(encounter_id, &player, now);
        let combatant_id = row.id;
        state.players.push(player);
        state.session_entry(encounter_id).combatants.push(row);
        (state, encounter_id, combatant_id, player_id)
    }

    #[test]
    fn read_overlays_live_player_record() {
        let (mut state, encounter_id, combatant_id, player_id) = setup();
        // Stale row: the player took damage elsewhere.
        state.player_mut(player_id).unwrap().hp_current = 4;

        let view = project_one(&state, encounter_id, combatant_id).unwrap();
        assert_eq!(view.hp_current, 4);
        assert_eq!(view.player_name.as_deref(), Some("Sam"));
        assert_eq!(state.session(encounter_id).unwrap().combatants[0].hp_current, 30);
    }

    #[test]
    fn missing_player_falls_back_to_row() {
        let (mut state, encounter_id, combatant_id, _) = setup();
        state.players.clear();
        let view = project_one(&state, encounter_id, combatant_id).unwrap();
        assert_eq!(view.hp_current, 30);
        assert_eq!(view.player_name, None);
    }

    #[test]
    fn patch_writes_back_to_player_and_every_row() {
        let (mut state, encounter_id, combatant_id, player_id) = setup();
        let other_encounter = EncounterId::new();
        let player = state.player(player_id).unwrap().clone();
        state
            .session_entry(other_encounter)
            .combatants
            .push(Combatant::for_player(other_encounter, &player, Utc::now()));

        let mut effects = Effects::none();
        let patch = StatsPatch {
            hp_current: Some(12),
            conditions: Some(vec![ConditionInstance::new(" Prone ")]),
            ..Default::default()
        };
        write_stats(
            &mut state,
            encounter_id,
            combatant_id,
            StatWrite::Patch(&patch),
            Utc::now(),
            &mut effects,
        )
        .unwrap();

        let player = state.player(player_id).unwrap();
        assert_eq!(player.hp_current, 12);
        assert_eq!(player.conditions, vec![ConditionInstance::new("prone")]);
        for session in &state.sessions {
            assert_eq!(session.combatants[0].hp_current, 12);
        }

        let topics: Vec<Topic> = effects.events.iter().map(|e| e.topic).collect();
        assert_eq!(
            topics,
            [Topic::PlayersChanged, Topic::CombatantsChanged, Topic::CombatantsChanged]
        );
    }

    #[test]
    fn hp_delta_on_player_uses_temp_hp() {
        let (mut state, encounter_id, combatant_id, player_id) = setup();
        state.player_mut(player_id).unwrap().overrides.temp_hp = 3;
        let mut effects = Effects::none();
        write_stats(
            &mut state,
            encounter_id,
            combatant_id,
            StatWrite::Delta(HpDelta::damage(5)),
            Utc::now(),
            &mut effects,
        )
        .unwrap();
        let player = state.player(player_id).unwrap();
        assert_eq!((player.overrides.temp_hp, player.hp_current), (0, 28));
        assert!(effects.persist);
    }

    #[test]
    fn unknown_combatant_is_not_found() {
        let (mut state, encounter_id, _, _) = setup();
        let mut effects = Effects::none();
        let err = write_stats(
            &mut state,
            encounter_id,
            CombatantId::new(),
            StatWrite::Delta(HpDelta::heal(1)),
            Utc::now(),
            &mut effects,
        )
        .unwrap_err();
        assert!(err.is_not_found());
        assert!(effects.is_empty());
    }
}
