//! AllocationRegistry - the single arbiter of unit ownership
//!
//! Every claim goes through [`AllocationRegistry::take`], which strips the
//! units from all other claimants before handing them over. That is the only
//! place a unit changes hands, so no unit can ever sit in two claim sets.

use std::collections::{BTreeMap, BTreeSet};

use ahash::{AHashMap, AHashSet};
use tracing::debug;

use crate::allocation::{ClaimSet, Claimant, ClaimantId};
use crate::core::types::{UnitId, Urgency};
use crate::world::{UnitFilter, UnitSnapshot};

#[derive(Debug, Clone, Default)]
pub struct AllocationRegistry {
    claimants: BTreeMap<ClaimantId, ClaimSet>,
    next_id: u32,
}

impl AllocationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, label: impl Into<String>, urgency: Urgency) -> ClaimantId {
        let id = ClaimantId(self.next_id);
        self.next_id += 1;
        let claim = ClaimSet::new(label, urgency);
        debug!("Registered claimant {:?} '{}' at {:?}", id, claim.label, urgency);
        self.claimants.insert(id, claim);
        id
    }

    /// Remove a claimant, freeing everything it held
    pub fn unregister(&mut self, id: ClaimantId) -> Option<ClaimSet> {
        self.claimants.remove(&id)
    }

    pub fn claimant(&self, id: ClaimantId) -> Option<&ClaimSet> {
        self.claimants.get(&id)
    }

    pub fn claimants(&self) -> impl Iterator<Item = (ClaimantId, &ClaimSet)> {
        self.claimants.iter().map(|(id, claim)| (*id, claim))
    }

    pub fn urgency(&self, id: ClaimantId) -> Option<Urgency> {
        self.claimants.get(&id).map(|c| c.urgency)
    }

    /// Every unit some claimant holds
    pub fn held_ids(&self) -> AHashSet<UnitId> {
        self.claimants
            .values()
            .flat_map(|c| c.allocated().iter().copied())
            .collect()
    }

    /// Units matching `filter` not held by any claimant at `min_urgency` or above
    ///
    /// Units held at lower urgency are included; a caller at `min_urgency`
    /// may take them. Never fails; no match is just an empty list.
    pub fn unallocated<'a>(
        &self,
        units: &'a [UnitSnapshot],
        filter: &UnitFilter,
        min_urgency: Urgency,
    ) -> Vec<&'a UnitSnapshot> {
        let protected: AHashSet<UnitId> = self
            .claimants
            .values()
            .filter(|c| c.urgency >= min_urgency)
            .flat_map(|c| c.allocated().iter().copied())
            .collect();

        units
            .iter()
            .filter(|u| filter.matches(u) && !protected.contains(&u.id))
            .collect()
    }

    pub fn unallocated_ids(
        &self,
        units: &[UnitSnapshot],
        filter: &UnitFilter,
        min_urgency: Urgency,
    ) -> BTreeSet<UnitId> {
        self.unallocated(units, filter, min_urgency)
            .into_iter()
            .map(|u| u.id)
            .collect()
    }

    /// Hand `ids` to `claimant`, first removing them from every other claimant
    ///
    /// Returns how many units were newly added. An unknown claimant takes nothing.
    pub fn take(&mut self, ids: &[UnitId], claimant: ClaimantId) -> usize {
        if !self.claimants.contains_key(&claimant) {
            return 0;
        }

        for (id, other) in self.claimants.iter_mut() {
            if *id != claimant {
                other.deallocate(ids);
            }
        }

        let Some(claim) = self.claimants.get_mut(&claimant) else {
            return 0;
        };
        let added = ids.iter().filter(|id| claim.insert(**id)).count();
        if added > 0 {
            debug!("{:?} '{}' took {} units", claimant, claim.label, added);
        }
        added
    }

    pub fn release(&mut self, claimant: ClaimantId, ids: &[UnitId]) {
        if let Some(claim) = self.claimants.get_mut(&claimant) {
            claim.deallocate(ids);
        }
    }

    /// Free everything `claimant` holds, returning the released ids
    pub fn release_all(&mut self, claimant: ClaimantId) -> BTreeSet<UnitId> {
        self.claimants
            .get_mut(&claimant)
            .map(|c| c.clear())
            .unwrap_or_default()
    }

    pub fn allocated(&self, claimant: ClaimantId) -> Option<&BTreeSet<UnitId>> {
        self.claimants.get(&claimant).map(|c| c.allocated())
    }

    pub fn held_count(&self, claimant: ClaimantId) -> usize {
        self.claimants.get(&claimant).map_or(0, |c| c.len())
    }

    pub fn is_held_by(&self, unit: UnitId, claimant: ClaimantId) -> bool {
        self.claimants
            .get(&claimant)
            .is_some_and(|c| c.contains(unit))
    }

    pub fn owner(&self, unit: UnitId) -> Option<ClaimantId> {
        self.claimants
            .iter()
            .find(|(_, claim)| claim.contains(unit))
            .map(|(id, _)| *id)
    }

    /// Snapshots of the units `claimant` holds, in id order
    pub fn held_units<'a>(
        &self,
        claimant: ClaimantId,
        units: &'a [UnitSnapshot],
    ) -> Vec<&'a UnitSnapshot> {
        let Some(claim) = self.claimants.get(&claimant) else {
            return Vec::new();
        };
        let mut held: Vec<&UnitSnapshot> = units.iter().filter(|u| claim.contains(u.id)).collect();
        held.sort_by_key(|u| u.id);
        held
    }

    /// Drop ids of units that no longer exist; returns how many went
    pub fn prune(&mut self, existing: &AHashSet<UnitId>) -> usize {
        let pruned: usize = self
            .claimants
            .values_mut()
            .map(|c| c.retain(|id| existing.contains(id)))
            .sum();
        if pruned > 0 {
            debug!("Pruned {} stale unit ids", pruned);
        }
        pruned
    }

    /// No unit appears in two claim sets
    pub fn is_disjoint(&self) -> bool {
        let mut seen: AHashMap<UnitId, ClaimantId> = AHashMap::new();
        for (id, claim) in &self.claimants {
            for unit in claim.allocated() {
                if seen.insert(*unit, *id).is_some() {
                    return false;
                }
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{UnitKind, Vec2};

    fn army(n: u64) -> Vec<UnitSnapshot> {
        (1..=n)
            .map(|i| UnitSnapshot::new(UnitId(i), UnitKind(1), Vec2::new(i as f32, 0.0)))
            .collect()
    }

    #[test]
    fn test_unallocated_respects_urgency() {
        let units = army(4);
        let mut registry = AllocationRegistry::new();
        let low = registry.register("harass", Urgency::Low);
        let high = registry.register("defense", Urgency::High);
        registry.take(&[UnitId(1)], low);
        registry.take(&[UnitId(2)], high);

        let for_medium = registry.unallocated_ids(&units, &UnitFilter::Combat, Urgency::Medium);
        assert_eq!(for_medium, [UnitId(1), UnitId(3), UnitId(4)].into_iter().collect());

        let for_low = registry.unallocated_ids(&units, &UnitFilter::Combat, Urgency::Low);
        assert_eq!(for_low, [UnitId(3), UnitId(4)].into_iter().collect());
    }

    #[test]
    fn test_take_preempts_other_claimants() {
        let mut registry = AllocationRegistry::new();
        let low = registry.register("harass", Urgency::Low);
        let high = registry.register("defense", Urgency::High);
        registry.take(&[UnitId(1), UnitId(2)], low);

        assert_eq!(registry.take(&[UnitId(2), UnitId(3)], high), 2);
        assert_eq!(registry.owner(UnitId(2)), Some(high));
        assert_eq!(registry.held_count(low), 1);
        assert!(registry.is_disjoint());
    }

    #[test]
    fn test_take_for_unknown_claimant_is_noop() {
        let mut registry = AllocationRegistry::new();
        let known = registry.register("army", Urgency::Low);
        registry.take(&[UnitId(1)], known);
        assert_eq!(registry.take(&[UnitId(1)], ClaimantId(99)), 0);
        assert_eq!(registry.owner(UnitId(1)), Some(known));
    }

    #[test]
    fn test_prune_drops_stale_ids() {
        let mut registry = AllocationRegistry::new();
        let claimant = registry.register("army", Urgency::Low);
        registry.take(&[UnitId(1), UnitId(2)], claimant);

        let existing: AHashSet<UnitId> = [UnitId(2)].into_iter().collect();
        assert_eq!(registry.prune(&existing), 1);
        assert_eq!(
            registry.allocated(claimant),
            Some(&[UnitId(2)].into_iter().collect())
        );
    }

    #[test]
    fn test_filter_matching_nothing_is_empty() {
        let units = army(3);
        let registry = AllocationRegistry::new();
        assert!(registry
            .unallocated(&units, &UnitFilter::Workers, Urgency::None)
            .is_empty());
    }

    #[test]
    fn test_release_all_frees_units() {
        let units = army(2);
        let mut registry = AllocationRegistry::new();
        let claimant = registry.register("army", Urgency::VeryHigh);
        registry.take(&[UnitId(1), UnitId(2)], claimant);
        let released = registry.release_all(claimant);
        assert_eq!(released.len(), 2);
        assert_eq!(
            registry
                .unallocated(&units, &UnitFilter::Combat, Urgency::VeryHigh)
                .len(),
            2
        );
    }

    #[test]
    fn test_held_ids_spans_all_claimants() {
        let mut registry = AllocationRegistry::new();
        let attack = registry.register("attack", Urgency::Medium);
        let defense = registry.register("defense", Urgency::VeryHigh);
        registry.take(&[UnitId(1), UnitId(2)], attack);
        registry.take(&[UnitId(2), UnitId(5)], defense);

        let held = registry.held_ids();
        assert_eq!(held, [UnitId(1), UnitId(2), UnitId(5)].into_iter().collect());
        registry.release_all(defense);
        assert!(!registry.held_ids().contains(&UnitId(5)));
    }
}
