//! Local client state.
//!
//! Everything here is a cache of engine resources. It is replaced wholesale
//! by re-fetches and never merged field by field.

pub(crate) mod encounter_state;

pub use encounter_state::{EncounterState, SharedEncounterState};
