//! REST request bodies
//!
//! The tracker UI is forgiving: numeric fields accept numbers or numeric
//! strings, and unparseable values are treated as absent rather than
//! rejected. Nested `Option<Option<_>>` fields distinguish "not supplied"
//! from an explicit `null` that clears the value.

use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use combatdesk_domain::{
    CombatantPatch, ConditionInstance, DeathSaves, HpMode, OverridesPatch, StatsPatch,
};

// =============================================================================
// Lenient field helpers
// =============================================================================

#[derive(Deserialize)]
#[serde(untagged)]
enum LenientValue {
    Int(i64),
    Float(f64),
    Text(String),
    Other(serde_json::Value),
}

impl LenientValue {
    fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(n) => Some(*n as f64),
            Self::Float(f) if f.is_finite() => Some(*f),
            Self::Text(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
            _ => None,
        }
    }

    fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            other => other.as_f64().map(|f| f.trunc() as i64),
        }
    }
}

fn clamp_i32(value: i64) -> i32 {
    value.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

fn lenient_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<LenientValue> = Option::deserialize(deserializer)?;
    Ok(value.and_then(|v| v.as_i64()))
}

fn lenient_i32<'de, D>(deserializer: D) -> Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_i64(deserializer)?.map(clamp_i32))
}

/// `null` or `""` clears; a number or numeric string sets; anything else is
/// treated as a clear as well.
fn lenient_initiative<'de, D>(deserializer: D) -> Result<Option<Option<f64>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<LenientValue> = Option::deserialize(deserializer)?;
    Ok(Some(value.and_then(|v| v.as_f64())))
}

fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<LenientValue> = Option::deserialize(deserializer)?;
    Ok(match value {
        Some(LenientValue::Int(n)) => n.to_string(),
        Some(LenientValue::Float(f)) => f.to_string(),
        Some(LenientValue::Text(s)) => s,
        Some(LenientValue::Other(v)) => v.to_string(),
        None => String::new(),
    })
}

fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn double_option_i32<'de, D>(deserializer: D) -> Result<Option<Option<i32>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<LenientValue> = Option::deserialize(deserializer)?;
    Ok(Some(value.and_then(|v| v.as_i64()).map(clamp_i32)))
}

// =============================================================================
// Base records
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCampaignRequest {
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePlayerRequest {
    pub character_name: String,
    #[serde(default)]
    pub player_name: String,
    #[serde(default, deserialize_with = "lenient_i32")]
    pub hp_max: Option<i32>,
    #[serde(default, deserialize_with = "lenient_i32")]
    pub ac: Option<i32>,
}

/// Partial update of the override block.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverridesPatchData {
    #[serde(default, deserialize_with = "lenient_i32")]
    pub temp_hp: Option<i32>,
    #[serde(default, deserialize_with = "lenient_i32")]
    pub ac_bonus: Option<i32>,
    #[serde(
        default,
        deserialize_with = "double_option_i32",
        skip_serializing_if = "Option::is_none"
    )]
    pub hp_max_override: Option<Option<i32>>,
}

impl From<&OverridesPatchData> for OverridesPatch {
    fn from(data: &OverridesPatchData) -> Self {
        Self {
            temp_hp: data.temp_hp,
            ac_bonus: data.ac_bonus,
            hp_max_override: data.hp_max_override,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchPlayerRequest {
    #[serde(default)]
    pub character_name: Option<String>,
    #[serde(default)]
    pub player_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_i32")]
    pub hp_current: Option<i32>,
    #[serde(default, deserialize_with = "lenient_i32")]
    pub hp_max: Option<i32>,
    #[serde(default, deserialize_with = "lenient_i32")]
    pub ac: Option<i32>,
    #[serde(default)]
    pub overrides: Option<OverridesPatchData>,
    #[serde(default)]
    pub conditions: Option<Vec<ConditionInstance>>,
    #[serde(default)]
    pub death_saves: Option<DeathSaves>,
}

impl PatchPlayerRequest {
    pub fn stats(&self) -> StatsPatch {
        StatsPatch {
            hp_current: self.hp_current,
            hp_max: self.hp_max,
            ac: self.ac,
            overrides: self.overrides.as_ref().map(OverridesPatch::from),
            conditions: self.conditions.clone(),
            death_saves: self.death_saves,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInpcRequest {
    #[serde(default)]
    pub name: Option<String>,
    /// Compendium template to seed name, HP and AC from.
    #[serde(default)]
    pub monster_id: Option<Uuid>,
    #[serde(default, deserialize_with = "lenient_i32")]
    pub hp_max: Option<i32>,
    #[serde(default, deserialize_with = "lenient_i32")]
    pub ac: Option<i32>,
    #[serde(default)]
    pub friendly: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEncounterRequest {
    pub name: String,
}

// =============================================================================
// Roster
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddPlayerRequest {
    pub player_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddMonstersRequest {
    pub monster_id: Uuid,
    /// Number of copies; clamped by the engine, defaults to one.
    #[serde(default, deserialize_with = "lenient_i64")]
    pub qty: Option<i64>,
    /// Label stem; defaults to the monster name.
    #[serde(default)]
    pub label: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddInpcRequest {
    pub inpc_id: Uuid,
}

/// Fully partial combatant update.
///
/// HP, AC, overrides, conditions and death saves on a player-backed combatant
/// are written through to the player record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchCombatantRequest {
    #[serde(default)]
    pub label: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_initiative",
        skip_serializing_if = "Option::is_none"
    )]
    pub initiative: Option<Option<f64>>,
    #[serde(default)]
    pub friendly: Option<bool>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub color: Option<Option<String>>,
    #[serde(default, deserialize_with = "lenient_i32")]
    pub hp_current: Option<i32>,
    #[serde(default, deserialize_with = "lenient_i32")]
    pub hp_max: Option<i32>,
    #[serde(default, deserialize_with = "lenient_i32")]
    pub ac: Option<i32>,
    #[serde(default)]
    pub overrides: Option<OverridesPatchData>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub attack_overrides: Option<Option<serde_json::Value>>,
    #[serde(default)]
    pub conditions: Option<Vec<ConditionInstance>>,
    #[serde(default)]
    pub death_saves: Option<DeathSaves>,
}

impl PatchCombatantRequest {
    pub fn to_patch(&self) -> CombatantPatch {
        CombatantPatch {
            label: self.label.clone(),
            initiative: self.initiative,
            friendly: self.friendly,
            color: self.color.clone(),
            attack_overrides: self.attack_overrides.clone(),
            stats: StatsPatch {
                hp_current: self.hp_current,
                hp_max: self.hp_max,
                ac: self.ac,
                overrides: self.overrides.as_ref().map(OverridesPatch::from),
                conditions: self.conditions.clone(),
                death_saves: self.death_saves,
            },
        }
    }
}

/// Free-text damage or healing, e.g. `{"input": "+7"}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HpDeltaRequest {
    #[serde(default, deserialize_with = "lenient_text")]
    pub input: String,
    /// Intent for a bare number; a leading sign in `input` wins.
    #[serde(default)]
    pub mode: HpMode,
}

// =============================================================================
// Combat state
// =============================================================================

/// Explicit `{round, activeCombatantId}` write; both independently optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetCombatStateRequest {
    #[serde(default, deserialize_with = "lenient_i64")]
    pub round: Option<i64>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub active_combatant_id: Option<Option<Uuid>>,
}
