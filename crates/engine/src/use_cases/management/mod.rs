//! Management use cases for CRUD-style operations on base records.
//!
//! These keep HTTP handlers thin. Deletes cascade into combat sessions
//! through the roster helpers so turn state stays consistent.

mod campaigns;
mod encounters;
mod inpcs;
mod players;

use std::sync::Arc;

pub use campaigns::CampaignCrud;
pub use encounters::EncounterCrud;
pub use inpcs::InpcCrud;
pub use players::PlayerCrud;

use crate::infrastructure::ports::{ClockPort, CompendiumPort};
use crate::stores::TrackerStore;
use crate::use_cases::combat::EffectRunner;

/// Container for management use cases.
pub struct ManagementUseCases {
    pub campaigns: CampaignCrud,
    pub players: PlayerCrud,
    pub inpcs: InpcCrud,
    pub encounters: EncounterCrud,
}

impl ManagementUseCases {
    pub fn new(
        store: TrackerStore,
        effects: Arc<EffectRunner>,
        compendium: Arc<dyn CompendiumPort>,
        clock: Arc<dyn ClockPort>,
    ) -> Self {
        Self {
            campaigns: CampaignCrud::new(store.clone(), effects.clone(), clock.clone()),
            players: PlayerCrud::new(store.clone(), effects.clone(), clock.clone()),
            inpcs: InpcCrud::new(store.clone(), effects.clone(), compendium, clock.clone()),
            encounters: EncounterCrud::new(store, effects, clock),
        }
    }
}
