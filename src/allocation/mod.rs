//! Unit ownership - claimants and the registry that keeps them disjoint

pub mod registry;

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::core::types::{UnitId, Urgency};

pub use registry::AllocationRegistry;

/// Handle for a registered claimant
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ClaimantId(pub u32);

/// Anything holding exclusive ownership of units
pub trait Claimant {
    /// Priority at which the claims are held
    fn urgency(&self) -> Urgency;

    fn allocated(&self) -> &BTreeSet<UnitId>;

    /// Give up these units; idempotent, touches nothing but the set
    fn deallocate(&mut self, ids: &[UnitId]);
}

/// A labelled set of owned units
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClaimSet {
    pub label: String,
    pub urgency: Urgency,
    units: BTreeSet<UnitId>,
}

impl ClaimSet {
    pub fn new(label: impl Into<String>, urgency: Urgency) -> Self {
        Self {
            label: label.into(),
            urgency,
            units: BTreeSet::new(),
        }
    }

    /// Returns true if the unit was not already held
    pub fn insert(&mut self, id: UnitId) -> bool {
        self.units.insert(id)
    }

    pub fn contains(&self, id: UnitId) -> bool {
        self.units.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn clear(&mut self) -> BTreeSet<UnitId> {
        std::mem::take(&mut self.units)
    }

    /// Keep only units satisfying `keep`; returns how many were dropped
    pub fn retain(&mut self, mut keep: impl FnMut(&UnitId) -> bool) -> usize {
        let before = self.units.len();
        self.units.retain(|id| keep(id));
        before - self.units.len()
    }
}

impl Claimant for ClaimSet {
    fn urgency(&self) -> Urgency {
        self.urgency
    }

    fn allocated(&self) -> &BTreeSet<UnitId> {
        &self.units
    }

    fn deallocate(&mut self, ids: &[UnitId]) {
        for id in ids {
            self.units.remove(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deallocate_is_idempotent() {
        let mut claim = ClaimSet::new("army", Urgency::Medium);
        claim.insert(UnitId(1));
        claim.insert(UnitId(2));

        claim.deallocate(&[UnitId(1)]);
        let once = claim.clone();
        claim.deallocate(&[UnitId(1)]);
        assert_eq!(claim, once);
        assert_eq!(claim.allocated().len(), 1);
    }

    #[test]
    fn test_retain_counts_dropped() {
        let mut claim = ClaimSet::new("army", Urgency::Low);
        for id in 1..=4 {
            claim.insert(UnitId(id));
        }
        assert_eq!(claim.retain(|id| id.0 % 2 == 0), 2);
        assert!(claim.contains(UnitId(2)));
        assert!(!claim.contains(UnitId(1)));
    }
}
