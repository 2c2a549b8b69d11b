//! Condition instances attached to combatants and players.

use serde::{Deserialize, Serialize};

use crate::CombatantId;

/// Condition keys that only make sense with a caster attached.
pub const CASTER_BOUND_KEYS: [&str; 2] = ["hexed", "marked"];

/// Returns true if the condition key requires a caster association.
pub fn requires_caster(key: &str) -> bool {
    CASTER_BOUND_KEYS.contains(&key)
}

/// A condition applied to a combatant, optionally tied to the combatant that caused it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionInstance {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caster_id: Option<CombatantId>,
}

impl ConditionInstance {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            caster_id: None,
        }
    }

    pub fn with_caster(mut self, caster_id: CombatantId) -> Self {
        self.caster_id = Some(caster_id);
        self
    }
}

/// Normalize a condition list coming from a client.
///
/// Keys are trimmed and lowercased, empty keys are dropped, casters are
/// stripped from keys that do not take one, and duplicate `(key, caster)`
/// pairs collapse to the first occurrence.
pub fn normalize_conditions(conditions: Vec<ConditionInstance>) -> Vec<ConditionInstance> {
    let mut out: Vec<ConditionInstance> = Vec::with_capacity(conditions.len());
    for condition in conditions {
        let key = condition.key.trim().to_lowercase();
        if key.is_empty() {
            continue;
        }
        let caster_id = if requires_caster(&key) {
            condition.caster_id
        } else {
            None
        };
        let normalized = ConditionInstance { key, caster_id };
        if !out.contains(&normalized) {
            out.push(normalized);
        }
    }
    out
}
