extern crate self as combatdesk_domain;

pub mod entities;
pub mod error;
pub mod ids;
pub mod turn_order;
pub mod value_objects;

// Re-export all entities (explicit list in entities/mod.rs)
pub use entities::{
    Campaign, Combatant, CombatantBase, CombatantPatch, CombatSnapshot, Encounter,
    EncounterStatus, Inpc, MonsterTemplate, Player, StatsPatch,
};

pub use error::DomainError;

// Re-export ID types
pub use ids::{CampaignId, CombatantId, EncounterId, InpcId, MonsterId, PlayerId};

pub use turn_order::{TurnParticipant, TurnState};

pub use value_objects::{
    ConditionInstance, DeathSaves, HpDelta, HpDeltaParseError, HpMode, HpPool, Overrides,
    OverridesPatch,
};
