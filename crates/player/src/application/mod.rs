//! Client application logic.
//!
//! - `reconciler` - turns broadcasts into targeted re-fetches
//! - `navigation` - speculative turn stepping backed by a persist call

pub mod navigation;
pub mod reconciler;

pub use navigation::{Navigator, Step};
pub use reconciler::{plan_for, Reconciler, RefetchPlan};
