//! Domain entities.

mod campaign;
mod combatant;
mod encounter;
mod inpc;
mod monster;
mod player;

pub use campaign::Campaign;
pub use combatant::{Combatant, CombatantBase, CombatantPatch};
pub use encounter::{CombatSnapshot, Encounter, EncounterStatus};
pub use inpc::Inpc;
pub use monster::MonsterTemplate;
pub use player::{Player, StatsPatch};
