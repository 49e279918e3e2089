//! Request producers
//!
//! Each producer looks at the world once per tick and submits whatever it
//! wants built, trained or researched. Producers never check affordability;
//! the arbitrator decides what actually happens.

pub mod army;
pub mod supply;
pub mod upgrades;
pub mod workers;

use crate::core::types::UpgradeId;
use crate::requests::Request;
use crate::world::{Intel, UnitSnapshot, World};

pub use army::ArmyBuilder;
pub use supply::SupplyBuffer;
pub use upgrades::Upgrader;
pub use workers::WorkerBuilder;

pub trait Producer: Send {
    fn name(&self) -> &'static str;

    /// Requests for this tick; a fresh list every call
    fn produce(&mut self, world: &dyn World, own: &[UnitSnapshot], intel: &Intel) -> Vec<Request>;

    fn on_upgrade_complete(&mut self, _upgrade: UpgradeId) {}
}

/// Own finished bases, never less than one
pub(crate) fn base_count(own: &[UnitSnapshot]) -> u32 {
    (own.iter().filter(|u| u.is_base && u.is_ready).count() as u32).max(1)
}
