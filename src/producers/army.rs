//! Army production paced by global optimism

use crate::core::types::{UnitKind, Urgency};
use crate::producers::Producer;
use crate::requests::Request;
use crate::world::{Intel, UnitSnapshot, World};

/// Optimism ceilings and the urgency used below each
const LADDER: [(f32, Urgency); 7] = [
    (0.2, Urgency::Extreme),
    (0.4, Urgency::VeryHigh),
    (0.6, Urgency::High),
    (0.8, Urgency::MediumHigh),
    (1.0, Urgency::Medium),
    (1.2, Urgency::MediumLow),
    (1.4, Urgency::Low),
];

/// Trains units in priority order; the worse the outlook, the louder the ask
#[derive(Debug, Clone)]
pub struct ArmyBuilder {
    priorities: Vec<UnitKind>,
}

impl ArmyBuilder {
    pub fn new(priorities: Vec<UnitKind>) -> Self {
        Self { priorities }
    }

    pub fn base_urgency(optimism: f32) -> Urgency {
        LADDER
            .iter()
            .find(|(ceiling, _)| optimism < *ceiling)
            .map_or(Urgency::VeryLow, |(_, urgency)| *urgency)
    }
}

impl Producer for ArmyBuilder {
    fn name(&self) -> &'static str {
        "army"
    }

    fn produce(
        &mut self,
        _world: &dyn World,
        _own: &[UnitSnapshot],
        intel: &Intel,
    ) -> Vec<Request> {
        let mut urgency = Self::base_urgency(intel.optimism());
        let mut requests = Vec::with_capacity(self.priorities.len());
        for kind in &self.priorities {
            requests.push(Request::train(*kind, urgency.max(Urgency::VeryLow)));
            urgency = urgency.lower();
        }
        requests
    }
}
