//! Stat overrides and death save counters.

use serde::{Deserialize, Serialize};

/// Per-combatant (or per-player) adjustments layered over base stats.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Overrides {
    /// Damage-absorbing buffer, consumed before real HP.
    pub temp_hp: i32,
    pub ac_bonus: i32,
    /// Added to `hp_max`; `None` means no adjustment.
    pub hp_max_override: Option<i32>,
}

impl Overrides {
    pub fn is_cleared(&self) -> bool {
        *self == Self::default()
    }
}

/// Partial update for [`Overrides`]; absent fields are left alone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OverridesPatch {
    pub temp_hp: Option<i32>,
    pub ac_bonus: Option<i32>,
    pub hp_max_override: Option<Option<i32>>,
}

impl OverridesPatch {
    pub fn apply_to(&self, overrides: &mut Overrides) {
        if let Some(temp_hp) = self.temp_hp {
            overrides.temp_hp = temp_hp.max(0);
        }
        if let Some(ac_bonus) = self.ac_bonus {
            overrides.ac_bonus = ac_bonus;
        }
        if let Some(hp_max_override) = self.hp_max_override {
            overrides.hp_max_override = hp_max_override;
        }
    }
}

/// Effective AC: base AC plus the AC bonus override, saturating at the i32
/// bounds.
pub fn effective_ac(ac: i32, overrides: &Overrides) -> i32 {
    ac.saturating_add(overrides.ac_bonus)
}

/// Effective max HP: base max plus override, never below 1.
pub fn effective_hp_max(hp_max: i32, overrides: &Overrides) -> i32 {
    hp_max
        .saturating_add(overrides.hp_max_override.unwrap_or(0))
        .max(1)
}

pub const MAX_DEATH_SAVES: u8 = 3;

/// Death save tally, each counter in `0..=3`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeathSaves {
    pub success: u8,
    pub fail: u8,
}

impl DeathSaves {
    pub fn new(success: u8, fail: u8) -> Self {
        Self {
            success: success.min(MAX_DEATH_SAVES),
            fail: fail.min(MAX_DEATH_SAVES),
        }
    }

    /// Re-clamp after deserialization from untrusted input.
    pub fn clamped(self) -> Self {
        Self::new(self.success, self.fail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn effective_values_follow_overrides() {
        let overrides = Overrides {
            temp_hp: 5,
            ac_bonus: 2,
            hp_max_override: Some(-30),
        };
        assert_eq!(effective_ac(15, &overrides), 17);
        assert_eq!(effective_hp_max(20, &overrides), 1);
        assert_eq!(effective_hp_max(20, &Overrides::default()), 20);
    }

    #[test]
    fn extreme_overrides_saturate() {
        let huge = Overrides {
            temp_hp: 0,
            ac_bonus: i32::MAX,
            hp_max_override: Some(i32::MAX),
        };
        assert_eq!(effective_ac(5, &huge), i32::MAX);
        assert_eq!(effective_hp_max(5, &huge), i32::MAX);

        let tiny = Overrides {
            temp_hp: 0,
            ac_bonus: i32::MIN,
            hp_max_override: Some(i32::MIN),
        };
        assert_eq!(effective_ac(-5, &tiny), i32::MIN);
        assert_eq!(effective_hp_max(-5, &tiny), 1);
    }

    #[test]
    fn patch_touches_only_supplied_fields() {
        let mut overrides = Overrides {
            temp_hp: 4,
            ac_bonus: 1,
            hp_max_override: Some(5),
        };
        OverridesPatch {
            temp_hp: Some(-3),
            hp_max_override: Some(None),
            ..Default::default()
        }
        .apply_to(&mut overrides);
        assert_eq!(overrides.temp_hp, 0);
        assert_eq!(overrides.ac_bonus, 1);
        assert_eq!(overrides.hp_max_override, None);
    }

    #[test]
    fn death_saves_clamp_to_three() {
        assert_eq!(DeathSaves::new(7, 2), DeathSaves { success: 3, fail: 2 });
    }
}
