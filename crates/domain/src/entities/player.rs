//! Player master record
//!
//! A player is long-lived and campaign-scoped. Its HP, AC, overrides,
//! conditions and death saves are the single source of truth for every
//! combatant that points at it; combatant rows only cache these values.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use combatdesk_domain::value_objects::{
    effective_ac, effective_hp_max, normalize_conditions, ConditionInstance, DeathSaves, HpDelta,
    HpPool, Overrides, OverridesPatch,
};
use combatdesk_domain::{CampaignId, PlayerId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: PlayerId,
    pub campaign_id: CampaignId,
    pub character_name: String,
    pub player_name: String,
    pub hp_current: i32,
    pub hp_max: i32,
    pub ac: i32,
    #[serde(default)]
    pub overrides: Overrides,
    #[serde(default)]
    pub conditions: Vec<ConditionInstance>,
    #[serde(default)]
    pub death_saves: DeathSaves,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Player {
    pub fn new(
        campaign_id: CampaignId,
        character_name: impl Into<String>,
        player_name: impl Into<String>,
        hp_max: i32,
        ac: i32,
        now: DateTime<Utc>,
    ) -> Self {
        let hp_max = hp_max.max(1);
        Self {
            id: PlayerId::new(),
            campaign_id,
            character_name: character_name.into(),
            player_name: player_name.into(),
            hp_current: hp_max,
            hp_max,
            ac,
            overrides: Overrides::default(),
            conditions: Vec::new(),
            death_saves: DeathSaves::default(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn effective_ac(&self) -> i32 {
        effective_ac(self.ac, &self.overrides)
    }

    pub fn effective_hp_max(&self) -> i32 {
        effective_hp_max(self.hp_max, &self.overrides)
    }

    /// Apply a stats patch. Returns true if anything changed.
    pub fn apply_stats(&mut self, patch: &StatsPatch, now: DateTime<Utc>) -> bool {
        let before = self.clone();
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
            self.death_saves = death_saves.clamped();
        }
        let changed = *self != before;
        if changed {
            self.updated_at = now;
        }
        changed
    }

    pub fn apply_hp_delta(&mut self, delta: HpDelta, now: DateTime<Utc>) {
        let pool = delta.apply(HpPool {
            hp_current: self.hp_current,
            hp_max: self.effective_hp_max(),
            temp_hp: self.overrides.temp_hp,
        });
        self.hp_current = pool.hp_current;
        self.overrides.temp_hp = pool.temp_hp;
        self.updated_at = now;
    }

    /// Long rest: full HP, overrides and conditions cleared, death saves reset.
    ///
    /// Returns true if the record changed.
    pub fn full_rest(&mut self, now: DateTime<Utc>) -> bool {
        let changed = self.hp_current != self.hp_max
            || !self.overrides.is_cleared()
            || !self.conditions.is_empty()
            || self.death_saves != DeathSaves::default();
        if changed {
            self.hp_current = self.hp_max;
            self.overrides = Overrides::default();
            self.conditions.clear();
            self.death_saves = DeathSaves::default();
            self.updated_at = now;
        }
        changed
    }
}

/// Partial update of the combat-relevant stats shared by players and combatants.
///
/// Every field is independently optional; only supplied fields are written.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatsPatch {
    pub hp_current: Option<i32>,
    pub hp_max: Option<i32>,
    pub ac: Option<i32>,
    pub overrides: Option<OverridesPatch>,
    pub conditions: Option<Vec<ConditionInstance>>,
    pub death_saves: Option<DeathSaves>,
}

impl StatsPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
