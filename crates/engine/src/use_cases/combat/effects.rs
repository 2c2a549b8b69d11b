//! Mutation side effects.
//!
//! Store mutations never touch I/O. They return a [`Mutation`] carrying the
//! value for the caller plus the [`Effects`] it produced, and the
//! [`EffectRunner`] executes those effects once the write lock is released:
//! first a debounced save, then one broadcast per event.

use std::sync::Arc;

use combatdesk_domain::{CampaignId, EncounterId, PlayerId};
use combatdesk_shared::{BroadcastPayload, Topic};

use crate::infrastructure::ports::{BroadcastPort, PersistencePort};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BroadcastEvent {
    pub topic: Topic,
    pub payload: BroadcastPayload,
}

/// Work to do after a successful mutation. Events are deduplicated in
/// emission order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Effects {
    pub persist: bool,
    pub events: Vec<BroadcastEvent>,
}

impl Effects {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        !self.persist && self.events.is_empty()
    }

    /// Record a change: schedules a save and queues the broadcast.
    pub fn emit(&mut self, topic: Topic, payload: BroadcastPayload) {
        self.persist = true;
        let event = BroadcastEvent { topic, payload };
        if !self.events.contains(&event) {
            self.events.push(event);
        }
    }

    pub fn combatants_changed(&mut self, encounter_id: EncounterId) {
        self.emit(
            Topic::CombatantsChanged,
            BroadcastPayload::encounter(encounter_id.to_uuid()),
        );
    }

    pub fn combat_changed(&mut self, encounter_id: EncounterId) {
        self.emit(
            Topic::CombatChanged,
            BroadcastPayload::encounter(encounter_id.to_uuid()),
        );
    }

    pub fn encounters_changed(&mut self, campaign_id: CampaignId, encounter_id: Option<EncounterId>) {
        let mut payload = BroadcastPayload::campaign(campaign_id.to_uuid());
        if let Some(encounter_id) = encounter_id {
            payload = payload.with_encounter(encounter_id.to_uuid());
        }
        self.emit(Topic::EncountersChanged, payload);
    }

    pub fn players_changed(&mut self, campaign_id: CampaignId, player_id: Option<PlayerId>) {
        let mut payload = BroadcastPayload::campaign(campaign_id.to_uuid());
        if let Some(player_id) = player_id {
            payload = payload.with_player(player_id.to_uuid());
        }
        self.emit(Topic::PlayersChanged, payload);
    }

    pub fn inpcs_changed(&mut self, campaign_id: CampaignId) {
        self.emit(
            Topic::InpcsChanged,
            BroadcastPayload::campaign(campaign_id.to_uuid()),
        );
    }

    pub fn campaigns_changed(&mut self) {
        self.emit(Topic::CampaignsChanged, BroadcastPayload::empty());
    }
}

/// A value produced by a store mutation plus the effects to run afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Mutation<T> {
    pub value: T,
    pub effects: Effects,
}

impl<T> Mutation<T> {
    pub fn new(value: T, effects: Effects) -> Self {
        Self { value, effects }
    }

    /// Nothing changed; nothing to save or broadcast.
    pub fn unchanged(value: T) -> Self {
        Self::new(value, Effects::none())
    }
}

/// Executes [`Effects`] against the persistence and broadcast collaborators.
pub struct EffectRunner {
    persistence: Arc<dyn PersistencePort>,
    broadcast: Arc<dyn BroadcastPort>,
}

impl EffectRunner {
    pub fn new(persistence: Arc<dyn PersistencePort>, broadcast: Arc<dyn BroadcastPort>) -> Self {
        Self {
            persistence,
            broadcast,
        }
    }

    /// Run the effects and hand back the mutation's value.
    pub async fn run<T>(&self, mutation: Mutation<T>) -> T {
        let Mutation { value, effects } = mutation;
        if effects.persist {
            self.persistence.schedule_save();
        }
        for event in effects.events {
            tracing::debug!(topic = %event.topic, "Broadcasting change");
            self.broadcast.broadcast(event.topic, event.payload).await;
        }
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::ports::{MockBroadcastPort, MockPersistencePort};
    use mockall::predicate::*;
    use mockall::Sequence;

    #[test]
    fn events_are_deduplicated() {
        let encounter_id = EncounterId::new();
        let mut effects = Effects::none();
        assert!(effects.is_empty());
        effects.combatants_changed(encounter_id);
        effects.combat_changed(encounter_id);
        effects.combatants_changed(encounter_id);
        assert!(effects.persist);
        assert_eq!(effects.events.len(), 2);
        assert_eq!(effects.events[0].topic, Topic::CombatantsChanged);
    }

    #[tokio::test]
    async fn runs_save_then_broadcasts() {
        let encounter_id = EncounterId::new();
        let mut seq = Sequence::new();
        let mut persistence = MockPersistencePort::new();
        let mut broadcast = MockBroadcastPort::new();

        persistence
            .expect_schedule_save()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| ());
        broadcast
            .expect_broadcast()
            .with(
                eq(Topic::CombatantsChanged),
                eq(BroadcastPayload::encounter(encounter_id.to_uuid())),
            )
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| ());

        let runner = EffectRunner::new(Arc::new(persistence), Arc::new(broadcast));
        let mut effects = Effects::none();
        effects.combatants_changed(encounter_id);

        let value = runner.run(Mutation::new(7, effects)).await;
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn unchanged_runs_nothing() {
        let mut persistence = MockPersistencePort::new();
        let mut broadcast = MockBroadcastPort::new();
        persistence.expect_schedule_save().never();
        broadcast.expect_broadcast().never();

        let runner = EffectRunner::new(Arc::new(persistence), Arc::new(broadcast));
        assert_eq!(runner.run(Mutation::unchanged("same")).await, "same");
    }
}
