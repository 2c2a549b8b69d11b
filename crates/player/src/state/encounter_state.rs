//! Cached view of one encounter.

use std::sync::Arc;

use tokio::sync::RwLock;
use uuid::Uuid;

use combatdesk_domain::turn_order::{self, order_by_initiative};
use combatdesk_domain::TurnState;
use combatdesk_shared::{CombatStateData, CombatantView, EncounterData, PlayerData};

pub type SharedEncounterState = Arc<RwLock<EncounterState>>;

#[derive(Debug, Clone, Default)]
pub struct EncounterState {
    pub encounter_id: Uuid,
    /// `None` until the first fetch, or after the encounter was deleted.
    pub encounter: Option<EncounterData>,
    /// Merged roster in storage order.
    pub roster: Vec<CombatantView>,
    pub combat: CombatStateData,
    pub players: Vec<PlayerData>,
    /// UI-only selection; never sent to the engine.
    pub target_id: Option<Uuid>,
}

impl EncounterState {
    pub fn new(encounter_id: Uuid) -> Self {
        Self {
            encounter_id,
            ..Self::default()
        }
    }

    pub fn shared(encounter_id: Uuid) -> SharedEncounterState {
        Arc::new(RwLock::new(Self::new(encounter_id)))
    }

    pub fn campaign_id(&self) -> Option<Uuid> {
        self.encounter.as_ref().map(|e| e.campaign_id)
    }

    pub fn replace_encounter(&mut self, encounter: Option<EncounterData>) {
        if encounter.is_none() {
            self.roster.clear();
            self.combat = CombatStateData::default();
            self.target_id = None;
        }
        self.encounter = encounter;
    }

    /// Swap in a freshly fetched roster. A target that is gone is cleared.
    pub fn replace_roster(&mut self, roster: Vec<CombatantView>) {
        self.roster = roster;
        if let Some(target) = self.target_id {
            if !self.roster.iter().any(|c| c.id == target) {
                tracing::debug!(target_id = %target, "Target left the roster");
                self.target_id = None;
            }
        }
    }

    pub fn replace_combat(&mut self, combat: CombatStateData) {
        self.combat = combat;
    }

    pub fn replace_players(&mut self, players: Vec<PlayerData>) {
        self.players = players;
    }

    pub fn turn_state(&self) -> TurnState {
        self.combat.turn_state()
    }

    pub fn ordered(&self) -> Vec<&CombatantView> {
        order_by_initiative(&self.roster)
    }

    pub fn active(&self) -> Option<&CombatantView> {
        let active = self.combat.active_combatant_id?;
        self.roster.iter().find(|c| c.id == active)
    }

    pub fn target(&self) -> Option<&CombatantView> {
        let target = self.target_id?;
        self.roster.iter().find(|c| c.id == target)
    }

    /// Apply a locally computed turn ahead of the engine's answer.
    pub fn apply_speculative(&mut self, turn: TurnState) {
        self.combat.round = turn.round;
        self.combat.active_combatant_id = turn.active_id.map(|id| id.to_uuid());
    }

    /// Move the target through turn order. Unlike turn navigation this visits
    /// every combatant, including the dead.
    pub fn cycle_target(&mut self, forward: bool) -> Option<Uuid> {
        let ordered: Vec<Uuid> = self.ordered().iter().map(|c| c.id).collect();
        if ordered.is_empty() {
            self.target_id = None;
            return None;
        }
        let len = ordered.len();
        let next = match self
            .target_id
            .and_then(|t| ordered.iter().position(|id| *id == t))
        {
            Some(i) if forward => (i + 1) % len,
            Some(i) => (i + len - 1) % len,
            None if forward => 0,
            None => len - 1,
        };
        self.target_id = Some(ordered[next]);
        self.target_id
    }

    /// Whether every combatant has rolled, i.e. turn navigation is live.
    pub fn is_started(&self) -> bool {
        turn_order::all_have_initiative(&self.roster)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use combatdesk_domain::Overrides;

    pub(crate) fn view(name: &str, initiative: Option<f64>, hp: i32, base_type: &str) -> CombatantView {
        CombatantView {
            id: Uuid::new_v4(),
            encounter_id: Uuid::nil(),
            base_type: base_type.to_string(),
            base_id: Uuid::new_v4(),
            name: name.to_string(),
            label: String::new(),
            player_name: None,
            initiative,
            friendly: false,
            color: None,
            overrides: Overrides::default(),
            hp_current: hp,
            hp_max: hp.max(1),
            ac: 12,
            effective_ac: 12,
            effective_hp_max: hp.max(1),
            attack_overrides: None,
            conditions: Vec::new(),
            death_saves: None,
        }
    }

    #[test]
    fn target_cycles_through_the_dead_and_clears_on_removal() {
        let mut state = EncounterState::new(Uuid::new_v4());
        let orc = view("Orc", Some(15.0), 0, "monster");
        let ilsa = view("Ilsa", Some(12.0), 20, "player");
        let (orc_id, ilsa_id) = (orc.id, ilsa.id);
        state.replace_roster(vec![ilsa.clone(), orc]);

        assert_eq!(state.cycle_target(true), Some(orc_id));
        assert_eq!(state.cycle_target(true), Some(ilsa_id));
        assert_eq!(state.cycle_target(true), Some(orc_id));
        assert_eq!(state.cycle_target(false), Some(ilsa_id));

        state.replace_roster(vec![view("Goblin", Some(3.0), 7, "monster")]);
        assert_eq!(state.target_id, None);
        state.replace_roster(vec![ilsa]);
        assert!(state.target().is_none());
    }

    #[test]
    fn deleted_encounter_drops_cached_rows() {
        let mut state = EncounterState::new(Uuid::new_v4());
        state.replace_roster(vec![view("Orc", Some(15.0), 9, "monster")]);
        state.cycle_target(true);
        state.replace_encounter(None);
        assert!(state.roster.is_empty());
        assert!(state.target_id.is_none());
        assert_eq!(state.combat, CombatStateData::default());
    }
}
