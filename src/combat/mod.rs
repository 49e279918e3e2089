//! Combat power estimation used for engage/disengage decisions

pub mod effectiveness;

pub use effectiveness::{CombatEstimator, ForceFilter};
