//! Port traits for infrastructure boundaries.
//!
//! These are the only abstractions in the engine. Everything else is concrete
//! types. Ports exist for:
//! - Persistence scheduling (debounced JSON file today)
//! - Broadcast fan-out (WebSocket connections today)
//! - Compendium lookups (read-only monster templates)
//! - Clock (for testing)

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use combatdesk_domain::{MonsterId, MonsterTemplate};
use combatdesk_shared::{BroadcastPayload, Topic};

/// Schedules a write of the whole store. Fire-and-forget: implementations
/// coalesce calls and report failures through logs only.
#[cfg_attr(test, mockall::automock)]
pub trait PersistencePort: Send + Sync {
    fn schedule_save(&self);
}

/// Fan-out of thin change notifications to every live observer.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BroadcastPort: Send + Sync {
    async fn broadcast(&self, topic: Topic, payload: BroadcastPayload);
}

/// Read-only monster templates used to seed combatant stats.
#[cfg_attr(test, mockall::automock)]
pub trait CompendiumPort: Send + Sync {
    fn monster(&self, id: MonsterId) -> Option<MonsterTemplate>;
    fn list(&self) -> Vec<MonsterTemplate>;
}

// =============================================================================
// Testability Ports
// =============================================================================

#[cfg_attr(test, mockall::automock)]
pub trait ClockPort: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}
