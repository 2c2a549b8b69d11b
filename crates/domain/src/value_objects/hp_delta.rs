//! Damage and healing input
//!
//! The tracker has separate "damage" and "heal" buttons sharing one text box,
//! so a bare number takes the intent of the button that was pressed while an
//! explicit sign overrides it: `"+7"` always heals, `"-7"` always damages.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::DomainError;

/// Whether an HP change removes or restores hit points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum HpMode {
    #[default]
    Damage,
    Heal,
}

impl fmt::Display for HpMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Damage => write!(f, "damage"),
            Self::Heal => write!(f, "heal"),
        }
    }
}

impl FromStr for HpMode {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "damage" | "dmg" => Ok(Self::Damage),
            "heal" | "healing" => Ok(Self::Heal),
            other => Err(DomainError::parse(format!("Unknown hp mode: {}", other))),
        }
    }
}

/// Error when parsing an HP delta. Callers treat every variant as a no-op.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HpDeltaParseError {
    #[error("Empty hp input")]
    Empty,
    #[error("Invalid hp amount: {0}")]
    InvalidAmount(String),
    #[error("Hp amount is zero")]
    Zero,
}

/// A parsed, non-zero change to hit points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HpDelta {
    pub mode: HpMode,
    pub amount: u32,
}

/// The HP fields an [`HpDelta`] reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HpPool {
    pub hp_current: i32,
    /// Already includes any max-HP override.
    pub hp_max: i32,
    pub temp_hp: i32,
}

impl HpDelta {
    pub fn damage(amount: u32) -> Self {
        Self {
            mode: HpMode::Damage,
            amount,
        }
    }

    pub fn heal(amount: u32) -> Self {
        Self {
            mode: HpMode::Heal,
            amount,
        }
    }

    /// Parse free text like `"5"`, `"+7"` or `"-3"`.
    ///
    /// A leading sign wins over `default_mode`.
    pub fn parse(input: &str, default_mode: HpMode) -> Result<Self, HpDeltaParseError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(HpDeltaParseError::Empty);
        }

        let (mode, digits) = match input.as_bytes()[0] {
            b'+' => (HpMode::Heal, &input[1..]),
            b'-' => (HpMode::Damage, &input[1..]),
            _ => (default_mode, input),
        };

        let digits = digits.trim();
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(HpDeltaParseError::InvalidAmount(input.to_string()));
        }
        let amount: u32 = digits
            .parse()
            .map_err(|_| HpDeltaParseError::InvalidAmount(input.to_string()))?;
        if amount == 0 {
            return Err(HpDeltaParseError::Zero);
        }

        Ok(Self { mode, amount })
    }

    /// Apply to an HP pool.
    ///
    /// Damage drains temp HP first and floors current HP at 0. Healing caps at
    /// `hp_max` and never touches temp HP.
    pub fn apply(&self, pool: HpPool) -> HpPool {
        let amount = i32::try_from(self.amount).unwrap_or(i32::MAX);
        match self.mode {
            HpMode::Damage => {
                let temp = pool.temp_hp.max(0);
                let absorbed = temp.min(amount);
                let remainder = amount - absorbed;
                HpPool {
                    hp_current: pool.hp_current.saturating_sub(remainder).max(0),
                    temp_hp: temp - absorbed,
                    ..pool
                }
            }
            HpMode::Heal => {
                // Above-max HP (set by hand) is not pulled down by a heal.
                let healed = pool.hp_current.saturating_add(amount).min(pool.hp_max);
                HpPool {
                    hp_current: healed.max(pool.hp_current),
                    ..pool
                }
            }
        }
    }
}
