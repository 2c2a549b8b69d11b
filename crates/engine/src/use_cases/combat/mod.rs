//! Combat session use cases.
//!
//! Pure mutation functions over [`TrackerState`](crate::stores::TrackerState)
//! return a [`Mutation`]; the `*Ops` wrappers run them under the store lock
//! and hand the effects to the [`EffectRunner`].

pub mod effects;
pub mod error;
pub mod projector;
pub mod rest;
pub mod roster;
pub mod session;
pub mod turns;

use std::sync::Arc;

pub use effects::{BroadcastEvent, EffectRunner, Effects, Mutation};
pub use error::CombatError;
pub use rest::RestOps;
pub use roster::RosterOps;
pub use turns::TurnOps;

use crate::infrastructure::ports::{ClockPort, CompendiumPort};
use crate::stores::TrackerStore;

/// Container for combat use cases.
pub struct CombatUseCases {
    pub roster: RosterOps,
    pub turns: TurnOps,
    pub rest: RestOps,
}

impl CombatUseCases {
    pub fn new(
        store: TrackerStore,
        effects: Arc<EffectRunner>,
        compendium: Arc<dyn CompendiumPort>,
        clock: Arc<dyn ClockPort>,
    ) -> Self {
        Self {
            roster: RosterOps::new(store.clone(), effects.clone(), compendium, clock.clone()),
            turns: TurnOps::new(store.clone(), effects.clone(), clock.clone()),
            rest: RestOps::new(store, effects, clock),
        }
    }
}
