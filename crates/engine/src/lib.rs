//! combatdesk Engine library.
//!
//! This crate contains all server-side code for the combat tracker.
//!
//! ## Structure
//!
//! - `stores/` - The in-memory tracker store and its lock discipline
//! - `use_cases/` - Combat and record-management operations
//! - `infrastructure/` - Port traits and their adapters (JSON file, compendium, clock)
//! - `api/` - HTTP and WebSocket entry points
//! - `app` - Application composition

pub mod api;
pub mod app;
pub mod infrastructure;
pub mod stores;
pub mod use_cases;

pub use app::App;
