//! Combatant entity - an encounter-scoped participant
//!
//! A combatant is never shared across encounters. It is derived from one of
//! three base records, modelled as a tagged variant rather than a hierarchy:
//!
//! - `Player`: the row is a thin pointer plus display fields (label,
//!   initiative, color). HP, AC, overrides, conditions and death saves are
//!   cached copies of the Player record and are overwritten on every read.
//! - `Monster`: a disposable instance seeded from the compendium; owns its stats.
//! - `Inpc`: an instance of a campaign-persistent NPC; owns its stats.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use combatdesk_domain::value_objects::{
    effective_ac, effective_hp_max, normalize_conditions, ConditionInstance, DeathSaves, HpDelta,
    HpPool, Overrides,
};
use combatdesk_domain::{
    CombatantId, EncounterId, Inpc, InpcId, MonsterId, MonsterTemplate, Player, PlayerId,
    StatsPatch,
};

/// The base record a combatant was created from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "baseType", content = "baseId", rename_all = "lowercase")]
pub enum CombatantBase {
    Player(PlayerId),
    Monster(MonsterId),
    Inpc(InpcId),
}

impl CombatantBase {
    pub fn is_player(&self) -> bool {
        matches!(self, Self::Player(_))
    }

    pub fn player_id(&self) -> Option<PlayerId> {
        match self {
            Self::Player(id) => Some(*id),
            _ => None,
        }
    }

    pub fn inpc_id(&self) -> Option<InpcId> {
        match self {
            Self::Inpc(id) => Some(*id),
            _ => None,
        }
    }

    /// Wire name of the tag (`player`, `monster`, `inpc`).
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Player(_) => "player",
            Self::Monster(_) => "monster",
            Self::Inpc(_) => "inpc",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Combatant {
    pub id: CombatantId,
    pub encounter_id: EncounterId,
    pub base: CombatantBase,
    /// Name of the base record at creation time; display fallback for `label`.
    pub name: String,
    pub label: String,
    pub initiative: Option<f64>,
    pub friendly: bool,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub overrides: Overrides,
    pub hp_current: i32,
    pub hp_max: i32,
    pub ac: i32,
    #[serde(default)]
    pub attack_overrides: Option<serde_json::Value>,
    #[serde(default)]
    pub conditions: Vec<ConditionInstance>,
    #[serde(default)]
    pub death_saves: Option<DeathSaves>,
    pub created_at: DateTime<Utc>,
}

impl Combatant {
    fn blank(
        encounter_id: EncounterId,
        base: CombatantBase,
        name: String,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: CombatantId::new(),
            encounter_id,
            base,
            label: name.clone(),
            name,
            initiative: None,
            friendly: false,
            color: None,
            overrides: Overrides::default(),
            hp_current: 1,
            hp_max: 1,
            ac: 10,
            attack_overrides: None,
            conditions: Vec::new(),
            death_saves: None,
            created_at: now,
        }
    }

    pub fn for_player(encounter_id: EncounterId, player: &Player, now: DateTime<Utc>) -> Self {
        let mut combatant = Self::blank(
            encounter_id,
            CombatantBase::Player(player.id),
            player.character_name.clone(),
            now,
        );
        combatant.friendly = true;
        combatant.mirror_player(player);
        combatant
    }

    pub fn for_monster(
        encounter_id: EncounterId,
        monster: &MonsterTemplate,
        label: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        let mut combatant = Self::blank(
            encounter_id,
            CombatantBase::Monster(monster.id),
            monster.name.clone(),
            now,
        );
        combatant.label = label.into();
        combatant.hp_max = monster.hp.max(1);
        combatant.hp_current = combatant.hp_max;
        combatant.ac = monster.ac;
        if !monster.attacks.is_null() {
            combatant.attack_overrides = Some(monster.attacks.clone());
        }
        combatant
    }

    pub fn for_inpc(
        encounter_id: EncounterId,
        inpc: &Inpc,
        template: Option<&MonsterTemplate>,
        now: DateTime<Utc>,
    ) -> Self {
        let mut combatant =
            Self::blank(encounter_id, CombatantBase::Inpc(inpc.id), inpc.name.clone(), now);
        combatant.friendly = inpc.friendly;
        combatant.hp_max = inpc.hp_max.max(1);
        combatant.hp_current = combatant.hp_max;
        combatant.ac = inpc.ac;
        if let Some(attacks) = template.map(|t| &t.attacks).filter(|a| !a.is_null()) {
            combatant.attack_overrides = Some(attacks.clone());
        }
        combatant
    }

    pub fn is_player(&self) -> bool {
        self.base.is_player()
    }

    pub fn effective_ac(&self) -> i32 {
        effective_ac(self.ac, &self.overrides)
    }

    pub fn effective_hp_max(&self) -> i32 {
        effective_hp_max(self.hp_max, &self.overrides)
    }

    /// Label, falling back to the base name when blank.
    pub fn display_name(&self) -> &str {
        if self.label.trim().is_empty() {
            &self.name
        } else {
            &self.label
        }
    }

    /// Overwrite the cached player stats from the master record.
    ///
    /// Returns true if any cached value changed.
    pub fn mirror_player(&mut self, player: &Player) -> bool {
        let before = self.clone();
        self.name = player.character_name.clone();
        self.hp_current = player.hp_current;
        self.hp_max = player.hp_max;
        self.ac = player.ac;
        self.overrides = player.overrides;
        self.conditions = player.conditions.clone();
        self.death_saves = Some(player.death_saves);
        *self != before
    }

    /// Apply stat fields directly to this row.
    pub fn apply_stats(&mut self, patch: &StatsPatch) {
        if let Some(hp_current) = patch.hp_current {
            self.hp_current = hp_current.max(0);
        }
        if let Some(hp_max) = patch.hp_max {
            self.hp_max = hp_max.max(1);
        }
        if let Some(ac) = patch.ac {
            self.ac = ac;
        }
        if let Some(overrides) = &patch.overrides {
            overrides.apply_to(&mut self.overrides);
        }
        if let Some(conditions) = &patch.conditions {
            self.conditions = normalize_conditions(conditions.clone());
        }
        if let Some(death_saves) = patch.death_saves {
            self.death_saves = Some(death_saves.clamped());
        }
    }

    /// Apply the non-stat display fields of a patch.
    pub fn apply_display(&mut self, patch: &CombatantPatch) {
        if let Some(label) = &patch.label {
            self.label = label.trim().to_string();
        }
        if let Some(initiative) = patch.initiative {
            self.initiative = initiative.filter(|value| value.is_finite());
        }
        if let Some(friendly) = patch.friendly {
            self.friendly = friendly;
        }
        if let Some(color) = &patch.color {
            self.color = color.clone();
        }
        if let Some(attack_overrides) = &patch.attack_overrides {
            self.attack_overrides = attack_overrides.clone();
        }
    }

    pub fn apply_hp_delta(&mut self, delta: HpDelta) {
        let pool = delta.apply(HpPool {
            hp_current: self.hp_current,
            hp_max: self.effective_hp_max(),
            temp_hp: self.overrides.temp_hp,
        });
        self.hp_current = pool.hp_current;
        self.overrides.temp_hp = pool.temp_hp;
    }

    /// Prepare for a fresh fight in the same encounter.
    ///
    /// Player stats are campaign-persistent, so only their initiative clears.
    pub fn reset_for_new_fight(&mut self) {
        self.initiative = None;
        if !self.is_player() {
            self.hp_current = self.effective_hp_max();
            self.conditions.clear();
            self.death_saves = None;
        }
    }
}

/// Fully partial combatant update.
///
/// Nested `Option<Option<_>>` fields distinguish "leave alone" (`None`) from
/// "clear" (`Some(None)`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CombatantPatch {
    pub label: Option<String>,
    pub initiative: Option<Option<f64>>,
    pub friendly: Option<bool>,
    pub color: Option<Option<String>>,
    pub attack_overrides: Option<Option<serde_json::Value>>,
    pub stats: StatsPatch,
}

impl CombatantPatch {
    pub fn touches_initiative(&self) -> bool {
        self.initiative.is_some()
    }
}
