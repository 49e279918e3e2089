//! Keep supply headroom ahead of production

use crate::core::types::{UnitKind, Urgency};
use crate::producers::{base_count, Producer};
use crate::requests::Request;
use crate::world::{Intel, UnitSnapshot, World};

#[derive(Debug, Clone)]
pub struct SupplyBuffer {
    /// Structure (or unit) that raises the supply cap
    pub supply_kind: UnitKind,
    /// Headroom wanted per own base
    pub buffer_per_base: u32,
    /// Cap gained from one supply provider, counted for pending ones
    pub supply_per_provider: u32,
    /// No more providers once the cap reaches this
    pub max_supply: u32,
}

impl SupplyBuffer {
    pub fn new(supply_kind: UnitKind) -> Self {
        Self {
            supply_kind,
            buffer_per_base: 3,
            supply_per_provider: 8,
            max_supply: 200,
        }
    }

    pub fn urgency(&self, used: u32, cap: u32, pending: u32, bases: u32) -> Urgency {
        if cap >= self.max_supply {
            return Urgency::None;
        }
        let left = cap.saturating_sub(used);
        if left == 0 && pending == 0 {
            return Urgency::Extreme;
        }
        let projected = left + pending * self.supply_per_provider;
        if self.buffer_per_base * bases > projected {
            return Urgency::High;
        }
        Urgency::None
    }
}

impl Producer for SupplyBuffer {
    fn name(&self) -> &'static str {
        "supply"
    }

    fn produce(&mut self, world: &dyn World, own: &[UnitSnapshot], _intel: &Intel) -> Vec<Request> {
        let urgency = self.urgency(
            world.supply_used(),
            world.supply_cap(),
            world.pending(self.supply_kind),
            base_count(own),
        );
        if urgency.is_none() {
            return Vec::new();
        }
        vec![Request::build(self.supply_kind, urgency)]
    }
}
