//! In-memory state storage modules.
//!
//! - `TrackerStore` - campaigns, players, iNPCs, encounters and live combat sessions

pub mod tracker;

// Re-export store types
pub use tracker::{CombatSession, TrackerState, TrackerStore};
