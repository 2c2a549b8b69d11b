//! combatdesk Protocol - Shared types for the engine and its clients
//!
//! This crate contains the types both sides of the wire agree on:
//! - REST request bodies
//! - Read models returned by the engine (merged combatant view, combat state)
//! - WebSocket message types (`ClientMessage`, `ServerMessage`) and broadcast topics
//!
//! # Design Principles
//!
//! 1. **No business logic** - pure data types and conversions
//! 2. **No domain IDs** - use raw `uuid::Uuid` in DTOs
//! 3. **Push-notify, pull-reconcile** - broadcasts carry ids, never bodies

pub mod messages;
pub mod requests;
pub mod responses;

// =============================================================================
// WebSocket Message Types
// =============================================================================
pub use messages::{BroadcastPayload, ClientMessage, ServerMessage, Topic};

// =============================================================================
// Request Types
// =============================================================================
pub use requests::{
    AddInpcRequest, AddMonstersRequest, AddPlayerRequest, CreateCampaignRequest,
    CreateEncounterRequest, CreateInpcRequest, CreatePlayerRequest, HpDeltaRequest,
    OverridesPatchData, PatchCombatantRequest, PatchPlayerRequest, SetCombatStateRequest,
};

// =============================================================================
// Response Types
// =============================================================================
pub use responses::{
    CampaignData, CombatStateData, CombatantView, EncounterData, FullRestResult, InpcData,
    PlayerData,
};
