//! Infrastructure implementations.
//!
//! Contains port traits and their implementations for external dependencies.

pub mod app_config;
pub mod clock;
pub mod compendium;
pub mod persistence;
pub mod ports;
