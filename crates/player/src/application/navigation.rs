//! Turn navigation from the client.
//!
//! The next/previous turn is computed locally with the shared turn engine and
//! shown at once; the engine's answer to the persist call then replaces it.
//! On failure the client re-reads the combat state to roll back.

use std::sync::Arc;

use combatdesk_domain::turn_order::{next_turn, prev_turn};
use combatdesk_domain::TurnState;
use combatdesk_shared::SetCombatStateRequest;

use crate::ports::{ClientError, TrackerApiPort};
use crate::state::SharedEncounterState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Next,
    Prev,
}

pub struct Navigator {
    api: Arc<dyn TrackerApiPort>,
    state: SharedEncounterState,
}

impl Navigator {
    pub fn new(api: Arc<dyn TrackerApiPort>, state: SharedEncounterState) -> Self {
        Self { api, state }
    }

    /// Move the turn one step. Returns the turn the engine settled on, or
    /// `None` when there was nothing to do.
    pub async fn step(&self, step: Step) -> Result<Option<TurnState>, ClientError> {
        let (encounter_id, speculative) = {
            let mut state = self.state.write().await;
            let current = state.turn_state();
            let proposed = match step {
                Step::Next => next_turn(&state.roster, current),
                Step::Prev => prev_turn(&state.roster, current),
            };
            if proposed == current {
                return Ok(None);
            }
            state.apply_speculative(proposed);
            (state.encounter_id, proposed)
        };

        let request = SetCombatStateRequest {
            round: Some(i64::from(speculative.round)),
            active_combatant_id: Some(speculative.active_id.map(|id| id.to_uuid())),
        };

        match self.api.set_combat(encounter_id, request).await {
            Ok(combat) => {
                let settled = combat.turn_state();
                self.state.write().await.replace_combat(combat);
                Ok(Some(settled))
            }
            Err(e) => {
                tracing::warn!(encounter_id = %encounter_id, error = %e, "Turn change rejected, rolling back");
                match self.api.get_combat(encounter_id).await {
                    Ok(combat) => self.state.write().await.replace_combat(combat),
                    Err(refetch) => {
                        tracing::warn!(error = %refetch, "Rollback fetch failed, keeping local turn")
                    }
                }
                Err(e)
            }
        }
    }
}
