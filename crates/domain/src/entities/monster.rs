//! Compendium monster template.
//!
//! Read-only to the tracker: only used to seed stat fields when a monster
//! or iNPC combatant is created.

use serde::{Deserialize, Serialize};

use combatdesk_domain::MonsterId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonsterTemplate {
    pub id: MonsterId,
    pub name: String,
    #[serde(default = "default_ac")]
    pub ac: i32,
    #[serde(default = "default_hp")]
    pub hp: i32,
    /// Attack entries as imported (bonus, damage dice, notes).
    #[serde(default)]
    pub attacks: serde_json::Value,
}

fn default_ac() -> i32 {
    10
}

fn default_hp() -> i32 {
    1
}
