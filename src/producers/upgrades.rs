//! Research queues grouped by urgency

use std::collections::BTreeMap;

use tracing::debug;

use crate::core::types::{UpgradeId, Urgency};
use crate::producers::Producer;
use crate::requests::Request;
use crate::world::{Intel, UnitSnapshot, World};

/// Each group is a chain researched in order; only its head is requested
#[derive(Debug, Clone, Default)]
pub struct Upgrader {
    queues: BTreeMap<Urgency, Vec<Vec<UpgradeId>>>,
}

impl Upgrader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_chain(mut self, urgency: Urgency, chain: Vec<UpgradeId>) -> Self {
        if !chain.is_empty() {
            self.queues.entry(urgency).or_default().push(chain);
        }
        self
    }

    /// Heads of every chain, highest urgency first
    pub fn next_upgrades(&self) -> Vec<(UpgradeId, Urgency)> {
        self.queues
            .iter()
            .rev()
            .flat_map(|(urgency, chains)| {
                chains.iter().filter_map(move |c| c.first().map(|u| (*u, *urgency)))
            })
            .collect()
    }
}

impl Producer for Upgrader {
    fn name(&self) -> &'static str {
        "upgrades"
    }

    fn produce(
        &mut self,
        world: &dyn World,
        _own: &[UnitSnapshot],
        _intel: &Intel,
    ) -> Vec<Request> {
        self.next_upgrades()
            .into_iter()
            .filter(|(upgrade, _)| !world.upgrade_pending(*upgrade))
            .map(|(upgrade, urgency)| Request::research(upgrade, urgency))
            .collect()
    }

    fn on_upgrade_complete(&mut self, upgrade: UpgradeId) {
        for chains in self.queues.values_mut() {
            for chain in chains.iter_mut() {
                chain.retain(|u| *u != upgrade);
            }
            chains.retain(|c| !c.is_empty());
        }
        let left: usize = self.queues.values().map(Vec::len).sum();
        debug!("Upgrade {:?} done, {} chains left", upgrade, left);
    }
}
