//! Application state and composition.

use std::sync::Arc;

use crate::infrastructure::ports::{BroadcastPort, ClockPort, CompendiumPort, PersistencePort};
use crate::stores::TrackerStore;
use crate::use_cases::combat::EffectRunner;
use crate::use_cases::{CombatUseCases, ManagementUseCases};

/// Main application state.
///
/// Holds the store handle and all use cases.
/// Passed to HTTP handlers via Axum state.
pub struct App {
    pub store: TrackerStore,
    pub use_cases: UseCases,
    pub compendium: Arc<dyn CompendiumPort>,
}

/// Container for all use cases.
pub struct UseCases {
    pub combat: CombatUseCases,
    pub management: ManagementUseCases,
}

impl App {
    /// Wire the use cases around one shared effect runner.
    pub fn new(
        store: TrackerStore,
        persistence: Arc<dyn PersistencePort>,
        broadcast: Arc<dyn BroadcastPort>,
        compendium: Arc<dyn CompendiumPort>,
        clock: Arc<dyn ClockPort>,
    ) -> Self {
        let effects = Arc::new(EffectRunner::new(persistence, broadcast));

        let use_cases = UseCases {
            combat: CombatUseCases::new(
                store.clone(),
                effects.clone(),
                compendium.clone(),
                clock.clone(),
            ),
            management: ManagementUseCases::new(
                store.clone(),
                effects,
                compendium.clone(),
                clock,
            ),
        };

        Self {
            store,
            use_cases,
            compendium,
        }
    }
}
