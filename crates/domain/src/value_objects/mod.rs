//! Value objects shared by players and combatants.

mod condition;
mod hp_delta;
mod stats;

pub use condition::{normalize_conditions, requires_caster, ConditionInstance, CASTER_BOUND_KEYS};
pub use hp_delta::{HpDelta, HpDeltaParseError, HpMode, HpPool};
pub use stats::{
    effective_ac, effective_hp_max, DeathSaves, Overrides, OverridesPatch, MAX_DEATH_SAVES,
};
