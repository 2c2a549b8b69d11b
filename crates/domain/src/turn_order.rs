//! Turn order engine
//!
//! Pure functions over a roster and a `{round, active}` pair. The engine and
//! the client both run these: the engine to answer next/prev requests and
//! repair the active pointer, the client to drive navigation between
//! round-trips. Nothing here fails; degenerate rosters return the input state.
//!
//! Ordering is descending initiative. A missing or zero initiative sorts as
//! negative infinity. Ties break on the display name (case-insensitive first,
//! then case-sensitive) and finally on the combatant id so the order is total.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::{Combatant, CombatantId};

/// What the turn engine needs to know about a roster entry.
pub trait TurnParticipant {
    fn combatant_id(&self) -> CombatantId;
    fn initiative(&self) -> Option<f64>;
    /// Label, or base name when the label is blank.
    fn sort_name(&self) -> &str;
    fn is_player(&self) -> bool;
    fn hp_current(&self) -> i32;
}

impl TurnParticipant for Combatant {
    fn combatant_id(&self) -> CombatantId {
        self.id
    }

    fn initiative(&self) -> Option<f64> {
        self.initiative
    }

    fn sort_name(&self) -> &str {
        self.display_name()
    }

    fn is_player(&self) -> bool {
        Combatant::is_player(self)
    }

    fn hp_current(&self) -> i32 {
        self.hp_current
    }
}

/// Round counter and active combatant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnState {
    pub round: u32,
    pub active_id: Option<CombatantId>,
}

impl TurnState {
    pub fn new(round: u32, active_id: Option<CombatantId>) -> Self {
        Self {
            round: round.max(1),
            active_id,
        }
    }
}

impl Default for TurnState {
    fn default() -> Self {
        Self::new(1, None)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Forward,
    Backward,
}

/// True for a finite, non-zero initiative.
pub fn has_initiative(value: Option<f64>) -> bool {
    matches!(value, Some(v) if v.is_finite() && v != 0.0)
}

fn sort_key(value: Option<f64>) -> f64 {
    match value {
        Some(v) if has_initiative(Some(v)) => v,
        _ => f64::NEG_INFINITY,
    }
}

fn compare_names(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

/// Total order used for turn sequencing.
pub fn compare<T: TurnParticipant>(a: &T, b: &T) -> Ordering {
    sort_key(b.initiative())
        .total_cmp(&sort_key(a.initiative()))
        .then_with(|| compare_names(a.sort_name(), b.sort_name()))
        .then_with(|| a.combatant_id().cmp(&b.combatant_id()))
}

/// The roster in turn order.
pub fn order_by_initiative<T: TurnParticipant>(items: &[T]) -> Vec<&T> {
    let mut ordered: Vec<&T> = items.iter().collect();
    ordered.sort_by(|a, b| compare(*a, *b));
    ordered
}

/// Players always get a turn (they roll death saves at 0 HP); everyone else
/// only while above 0 HP.
pub fn is_selectable<T: TurnParticipant>(item: &T) -> bool {
    item.is_player() || item.hp_current() > 0
}

/// Combat has started once the roster is non-empty and everyone has rolled.
pub fn all_have_initiative<T: TurnParticipant>(items: &[T]) -> bool {
    !items.is_empty() && items.iter().all(|c| has_initiative(c.initiative()))
}

pub fn first_selectable<T: TurnParticipant>(items: &[T]) -> Option<CombatantId> {
    order_by_initiative(items)
        .into_iter()
        .find(|c| is_selectable(*c))
        .map(TurnParticipant::combatant_id)
}

/// State at the moment combat starts: round 1, first selectable combatant.
pub fn initialize<T: TurnParticipant>(items: &[T]) -> TurnState {
    TurnState::new(1, first_selectable(items))
}

/// Repair a dangling active pointer after the roster changed.
///
/// An active id that is still present is kept even if no longer selectable;
/// `None` stays `None`.
pub fn ensure_active<T: TurnParticipant>(items: &[T], state: TurnState) -> TurnState {
    let round = state.round.max(1);
    match state.active_id {
        Some(id) if items.iter().any(|c| c.combatant_id() == id) => TurnState::new(round, Some(id)),
        Some(_) => TurnState::new(round, first_selectable(items)),
        None => TurnState::new(round, None),
    }
}

/// Advance to the next selectable combatant, bumping the round on wrap.
pub fn next_turn<T: TurnParticipant>(items: &[T], state: TurnState) -> TurnState {
    step(items, state, Direction::Forward)
}

/// Step back to the previous selectable combatant, dropping the round on wrap
/// (never below 1).
pub fn prev_turn<T: TurnParticipant>(items: &[T], state: TurnState) -> TurnState {
    step(items, state, Direction::Backward)
}

fn step<T: TurnParticipant>(items: &[T], state: TurnState, direction: Direction) -> TurnState {
    let state = ensure_active(items, state);
    if !all_have_initiative(items) {
        return state;
    }

    let ordered = order_by_initiative(items);
    let len = ordered.len();
    let current = state
        .active_id
        .and_then(|id| ordered.iter().position(|c| c.combatant_id() == id));

    let Some(current) = current else {
        return match first_selectable(items) {
            Some(id) => TurnState::new(state.round, Some(id)),
            None => state,
        };
    };

    for offset in 1..=len {
        let (index, wrapped) = match direction {
            Direction::Forward => ((current + offset) % len, current + offset >= len),
            Direction::Backward => ((current + len - offset) % len, offset > current),
        };
        let candidate = ordered[index];
        if !is_selectable(candidate) {
            continue;
        }
        let round = match (direction, wrapped) {
            (Direction::Forward, true) => state.round.saturating_add(1),
            (Direction::Backward, true) => state.round.saturating_sub(1).max(1),
            _ => state.round,
        };
        return TurnState::new(round, Some(candidate.combatant_id()));
    }

    state
}
