//! combatdesk Player - headless encounter follower.
//!
//! Holds a cached copy of one encounter, keeps it current by re-fetching on
//! engine broadcasts, and drives turn navigation with local prediction.

pub mod application;
pub mod infrastructure;
pub mod ports;
pub mod presentation;
pub mod state;
