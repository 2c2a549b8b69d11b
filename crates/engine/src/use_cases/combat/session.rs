//! Combat session turn state.
//!
//! The live session is authoritative once it has recorded a turn of its own
//! (`updated_at` is set). Until then a valid snapshot mirrored on the
//! encounter answers reads and seeds the session on its first write. Every
//! committed turn is mirrored back onto the encounter.

use chrono::{DateTime, Utc};

use combatdesk_domain::turn_order::{self, all_have_initiative};
use combatdesk_domain::{CombatSnapshot, Combatant, EncounterId, EncounterStatus, TurnState};
use combatdesk_shared::CombatStateData;

use super::effects::Effects;
use super::error::CombatError;
use crate::stores::{CombatSession, TrackerState};

/// Turn state before pointer repair, plus when it was written.
fn stored_turn(state: &TrackerState, encounter_id: EncounterId) -> (TurnState, Option<DateTime<Utc>>) {
    if let Some(session) = state.session(encounter_id).filter(|s| s.updated_at.is_some()) {
        return (session.turn_state(), session.updated_at);
    }
    match state.encounter(encounter_id).map(|e| e.combat) {
        Some(snapshot) if snapshot.is_valid() => (
            TurnState::new(snapshot.round, snapshot.active_combatant_id),
            snapshot.updated_at,
        ),
        _ => (TurnState::default(), None),
    }
}

fn roster(state: &TrackerState, encounter_id: EncounterId) -> &[Combatant] {
    state
        .session(encounter_id)
        .map(|s| s.combatants.as_slice())
        .unwrap_or(&[])
}

/// Current turn state with the active pointer repaired against the roster.
pub fn current_turn(state: &TrackerState, encounter_id: EncounterId) -> TurnState {
    let (turn, _) = stored_turn(state, encounter_id);
    turn_order::ensure_active(roster(state, encounter_id), turn)
}

/// Whether every combatant in the encounter has initiative.
pub fn is_started(state: &TrackerState, encounter_id: EncounterId) -> bool {
    all_have_initiative(roster(state, encounter_id))
}

/// Read the authoritative combat state. Never creates a session.
pub fn read_combat_state(
    state: &TrackerState,
    encounter_id: EncounterId,
) -> Result<CombatStateData, CombatError> {
    if state.encounter(encounter_id).is_none() {
        return Err(CombatError::not_found("Encounter", encounter_id));
    }
    let (turn, updated_at) = stored_turn(state, encounter_id);
    let turn = turn_order::ensure_active(roster(state, encounter_id), turn);
    Ok(CombatStateData {
        round: turn.round,
        active_combatant_id: turn.active_id.map(|id| id.to_uuid()),
        updated_at,
    })
}

/// Get or create the session for a write, seeding a new one from the
/// encounter snapshot when that snapshot is valid.
pub fn open_session(
    state: &mut TrackerState,
    encounter_id: EncounterId,
) -> Result<&mut CombatSession, CombatError> {
    let snapshot = state
        .encounter(encounter_id)
        .map(|e| e.combat)
        .ok_or_else(|| CombatError::not_found("Encounter", encounter_id))?;
    let existed = state.session(encounter_id).is_some();

    let session = state.session_entry(encounter_id);
    if !existed && snapshot.is_valid() {
        session.round = snapshot.round.max(1);
        session.active_combatant_id = snapshot.active_combatant_id;
        session.updated_at = snapshot.updated_at;
        tracing::debug!(encounter_id = %encounter_id, round = session.round, "Session seeded from encounter snapshot");
    }
    Ok(session)
}

/// Write a turn state to the session and mirror it onto the encounter.
pub fn commit_turn(
    state: &mut TrackerState,
    encounter_id: EncounterId,
    turn: TurnState,
    now: DateTime<Utc>,
    effects: &mut Effects,
) -> Result<(), CombatError> {
    open_session(state, encounter_id)?.set_turn_state(turn, now);
    if let Some(encounter) = state.encounter_mut(encounter_id) {
        encounter.combat = CombatSnapshot {
            round: turn.round.max(1),
            active_combatant_id: turn.active_id,
            updated_at: Some(now),
        };
    }
    effects.combat_changed(encounter_id);
    Ok(())
}

/// Bring turn state back in line after the roster or initiatives changed.
///
/// Starts combat when the started predicate has just flipped to true, and
/// otherwise repairs a dangling active pointer.
pub fn reconcile_roster(
    state: &mut TrackerState,
    encounter_id: EncounterId,
    was_started: bool,
    now: DateTime<Utc>,
    effects: &mut Effects,
) -> Result<(), CombatError> {
    let (status, campaign_id) = state
        .encounter(encounter_id)
        .map(|e| (e.status, e.campaign_id))
        .ok_or_else(|| CombatError::not_found("Encounter", encounter_id))?;
    let started = is_started(state, encounter_id);

    if started && !was_started && status != EncounterStatus::InProgress {
        let turn = turn_order::initialize(roster(state, encounter_id));
        if let Some(encounter) = state.encounter_mut(encounter_id) {
            encounter.status = EncounterStatus::InProgress;
        }
        effects.encounters_changed(campaign_id, Some(encounter_id));
        commit_turn(state, encounter_id, turn, now, effects)?;
        tracing::info!(encounter_id = %encounter_id, active = ?turn.active_id, "Combat started");
        return Ok(());
    }

    let (stored, _) = stored_turn(state, encounter_id);
    let repaired = turn_order::ensure_active(roster(state, encounter_id), stored);
    if repaired != stored {
        tracing::debug!(encounter_id = %encounter_id, "Repairing dangling active combatant");
        commit_turn(state, encounter_id, repaired, now, effects)?;
    }
    Ok(())
}
