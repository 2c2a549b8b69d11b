//! Use cases - User story orchestration.
//!
//! Each module contains use cases for a specific area of the tracker.
//! Use cases run pure mutations against the store and hand the resulting
//! effects to the broadcast bridge.

pub mod combat;
pub mod management;

pub use combat::CombatUseCases;
pub use management::ManagementUseCases;
