//! Encounter entity
//!
//! Carries a denormalized copy of the combat turn state so it survives a
//! loss of the live combat session.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use combatdesk_domain::{CampaignId, CombatantId, EncounterId};

/// Lifecycle status of an encounter.
///
/// Stored as a display string. Unknown strings read back as `Open`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EncounterStatus {
    #[default]
    Open,
    InProgress,
    Complete,
}

impl EncounterStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "Open",
            Self::InProgress => "In Progress",
            Self::Complete => "Complete",
        }
    }
}

impl fmt::Display for EncounterStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for EncounterStatus {
    fn from(value: String) -> Self {
        match value
            .trim()
            .to_ascii_lowercase()
            .replace(['_', '-'], " ")
            .as_str()
        {
            "in progress" | "inprogress" => Self::InProgress,
            "complete" | "completed" => Self::Complete,
            _ => Self::Open,
        }
    }
}

impl From<EncounterStatus> for String {
    fn from(value: EncounterStatus) -> Self {
        value.as_str().to_string()
    }
}

/// Mirrored `{round, activeCombatantId}` snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CombatSnapshot {
    pub round: u32,
    pub active_combatant_id: Option<CombatantId>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Default for CombatSnapshot {
    fn default() -> Self {
        Self {
            round: 1,
            active_combatant_id: None,
            updated_at: None,
        }
    }
}

impl CombatSnapshot {
    /// A snapshot is only worth trusting once something has written it.
    pub fn is_valid(&self) -> bool {
        self.round >= 1 && self.updated_at.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Encounter {
    pub id: EncounterId,
    pub campaign_id: CampaignId,
    pub name: String,
    #[serde(default)]
    pub status: EncounterStatus,
    #[serde(default)]
    pub combat: CombatSnapshot,
    pub created_at: DateTime<Utc>,
}

impl Encounter {
    pub fn new(campaign_id: CampaignId, name: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: EncounterId::new(),
            campaign_id,
            name: name.into(),
            status: EncounterStatus::Open,
            combat: CombatSnapshot::default(),
            created_at: now,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.status == EncounterStatus::Complete
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_display_strings() {
        let json = serde_json::to_string(&EncounterStatus::InProgress).unwrap();
        assert_eq!(json, "\"In Progress\"");
        let back: EncounterStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(back, EncounterStatus::InProgress);
    }

    #[test]
    fn unknown_status_reads_as_open() {
        let status: EncounterStatus = serde_json::from_str("\"paused\"").unwrap();
        assert_eq!(status, EncounterStatus::Open);
        let status: EncounterStatus = serde_json::from_str("\"in_progress\"").unwrap();
        assert_eq!(status, EncounterStatus::InProgress);
    }
}
