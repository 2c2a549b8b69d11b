//! Read models returned by the engine
//!
//! `CombatantView` is what every roster read returns: the merged projection
//! of a combatant row and, for player-backed combatants, the live player
//! record. Clients feed it straight into the turn order engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use combatdesk_domain::{
    Campaign, Combatant, CombatantId, ConditionInstance, DeathSaves, Encounter, Inpc, Overrides,
    Player, TurnParticipant, TurnState,
};

// =============================================================================
// Combatants
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CombatantView {
    pub id: Uuid,
    pub encounter_id: Uuid,
    /// `player`, `monster` or `inpc`
    pub base_type: String,
    pub base_id: Uuid,
    pub name: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player_name: Option<String>,
    pub initiative: Option<f64>,
    pub friendly: bool,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub overrides: Overrides,
    pub hp_current: i32,
    pub hp_max: i32,
    pub ac: i32,
    pub effective_ac: i32,
    pub effective_hp_max: i32,
    #[serde(default)]
    pub attack_overrides: Option<serde_json::Value>,
    #[serde(default)]
    pub conditions: Vec<ConditionInstance>,
    #[serde(default)]
    pub death_saves: Option<DeathSaves>,
}

impl From<&Combatant> for CombatantView {
    fn from(c: &Combatant) -> Self {
        let base_id = match c.base {
            combatdesk_domain::CombatantBase::Player(id) => id.to_uuid(),
            combatdesk_domain::CombatantBase::Monster(id) => id.to_uuid(),
            combatdesk_domain::CombatantBase::Inpc(id) => id.to_uuid(),
        };
        Self {
            id: c.id.to_uuid(),
            encounter_id: c.encounter_id.to_uuid(),
            base_type: c.base.type_name().to_string(),
            base_id,
            name: c.name.clone(),
            label: c.label.clone(),
            player_name: None,
            initiative: c.initiative,
            friendly: c.friendly,
            color: c.color.clone(),
            overrides: c.overrides,
            hp_current: c.hp_current,
            hp_max: c.hp_max,
            ac: c.ac,
            effective_ac: c.effective_ac(),
            effective_hp_max: c.effective_hp_max(),
            attack_overrides: c.attack_overrides.clone(),
            conditions: c.conditions.clone(),
            death_saves: c.death_saves,
        }
    }
}

impl CombatantView {
    pub fn display_name(&self) -> &str {
        if self.label.trim().is_empty() {
            &self.name
        } else {
            &self.label
        }
    }
}

impl TurnParticipant for CombatantView {
    fn combatant_id(&self) -> CombatantId {
        CombatantId::from_uuid(self.id)
    }

    fn initiative(&self) -> Option<f64> {
        self.initiative
    }

    fn sort_name(&self) -> &str {
        self.display_name()
    }

    fn is_player(&self) -> bool {
        self.base_type == "player"
    }

    fn hp_current(&self) -> i32 {
        self.hp_current
    }
}

// =============================================================================
// Combat state
// =============================================================================

/// Authoritative `{round, activeCombatantId}` for one encounter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CombatStateData {
    pub round: u32,
    pub active_combatant_id: Option<Uuid>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Default for CombatStateData {
    fn default() -> Self {
        Self {
            round: 1,
            active_combatant_id: None,
            updated_at: None,
        }
    }
}

impl CombatStateData {
    pub fn turn_state(&self) -> TurnState {
        TurnState::new(
            self.round,
            self.active_combatant_id.map(CombatantId::from_uuid),
        )
    }
}

// =============================================================================
// Base records
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignData {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl From<&Campaign> for CampaignData {
    fn from(c: &Campaign) -> Self {
        Self {
            id: c.id.to_uuid(),
            name: c.name.clone(),
            created_at: c.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerData {
    pub id: Uuid,
    pub campaign_id: Uuid,
    pub character_name: String,
    pub player_name: String,
    pub hp_current: i32,
    pub hp_max: i32,
    pub ac: i32,
    pub effective_ac: i32,
    pub effective_hp_max: i32,
    pub overrides: Overrides,
    pub conditions: Vec<ConditionInstance>,
    pub death_saves: DeathSaves,
    pub updated_at: DateTime<Utc>,
}

impl From<&Player> for PlayerData {
    fn from(p: &Player) -> Self {
        Self {
            id: p.id.to_uuid(),
            campaign_id: p.campaign_id.to_uuid(),
            character_name: p.character_name.clone(),
            player_name: p.player_name.clone(),
            hp_current: p.hp_current,
            hp_max: p.hp_max,
            ac: p.ac,
            effective_ac: p.effective_ac(),
            effective_hp_max: p.effective_hp_max(),
            overrides: p.overrides,
            conditions: p.conditions.clone(),
            death_saves: p.death_saves,
            updated_at: p.updated_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InpcData {
    pub id: Uuid,
    pub campaign_id: Uuid,
    pub monster_id: Option<Uuid>,
    pub name: String,
    pub hp_max: i32,
    pub ac: i32,
    pub friendly: bool,
}

impl From<&Inpc> for InpcData {
    fn from(i: &Inpc) -> Self {
        Self {
            id: i.id.to_uuid(),
            campaign_id: i.campaign_id.to_uuid(),
            monster_id: i.monster_id.map(|m| m.to_uuid()),
            name: i.name.clone(),
            hp_max: i.hp_max,
            ac: i.ac,
            friendly: i.friendly,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncounterData {
    pub id: Uuid,
    pub campaign_id: Uuid,
    pub name: String,
    /// `Open`, `In Progress` or `Complete`
    pub status: String,
    /// Mirrored snapshot of the combat state.
    pub combat: CombatStateData,
    pub created_at: DateTime<Utc>,
}

impl From<&Encounter> for EncounterData {
    fn from(e: &Encounter) -> Self {
        Self {
            id: e.id.to_uuid(),
            campaign_id: e.campaign_id.to_uuid(),
            name: e.name.clone(),
            status: e.status.to_string(),
            combat: CombatStateData {
                round: e.combat.round.max(1),
                active_combatant_id: e.combat.active_combatant_id.map(|id| id.to_uuid()),
                updated_at: e.combat.updated_at,
            },
            created_at: e.created_at,
        }
    }
}

/// Outcome of a campaign-wide full rest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FullRestResult {
    pub players_rested: usize,
    pub encounters_changed: Vec<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use combatdesk_domain::turn_order::order_by_initiative;
    use combatdesk_domain::{EncounterId, MonsterId, MonsterTemplate};

    fn view(label: &str, initiative: Option<f64>, hp: i32) -> CombatantView {
        let template = MonsterTemplate {
            id: MonsterId::new(),
            name: "Goblin".into(),
            ac: 13,
            hp: 7,
            attacks: serde_json::Value::Null,
        };
        let mut c = Combatant::for_monster(EncounterId::new(), &template, label, Utc::now());
        c.initiative = initiative;
        c.hp_current = hp;
        CombatantView::from(&c)
    }

    #[test]
    fn view_flattens_base_and_effective_stats() {
        let v = view("Goblin 1", Some(12.0), 7);
        let json = serde_json::to_value(&v).unwrap();
        assert_eq!(json["baseType"], "monster");
        assert_eq!(json["effectiveAc"], 13);
        assert_eq!(json["effectiveHpMax"], 7);
        assert!(json.get("playerName").is_none());
    }

    #[test]
    fn views_sort_like_rows() {
        let views = vec![view("b", Some(3.0), 7), view("a", None, 7), view("c", Some(9.0), 7)];
        let labels: Vec<&str> = order_by_initiative(&views)
            .into_iter()
            .map(|v| v.label.as_str())
            .collect();
        assert_eq!(labels, ["c", "b", "a"]);
    }
}
