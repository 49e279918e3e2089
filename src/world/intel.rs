//! Shared knowledge about the match, rebuilt from world queries every tick
//!
//! Holds what outlives a single snapshot: the table of hostiles seen so far
//! (the sighting table), the rally point, and global optimism. Components
//! read and write it through these methods only.

use std::collections::BTreeMap;

use ahash::AHashSet;

use crate::combat::{CombatEstimator, ForceFilter};
use crate::core::types::{UnitId, Vec2};
use crate::world::{UnitSnapshot, World};

#[derive(Debug, Clone)]
pub struct Intel {
    /// Ordered by id so every walk over known hostiles is reproducible
    sightings: BTreeMap<UnitId, UnitSnapshot>,
    optimism: f32,
    rally_point: Vec2,
    enemy_start: Vec2,
}

impl Default for Intel {
    fn default() -> Self {
        Self::new()
    }
}

impl Intel {
    pub fn new() -> Self {
        Self {
            sightings: BTreeMap::new(),
            optimism: 1.0,
            rally_point: Vec2::default(),
            enemy_start: Vec2::default(),
        }
    }

    /// Fold this tick's perception into the sighting table and recompute optimism
    pub fn refresh(
        &mut self,
        world: &dyn World,
        own_units: &[UnitSnapshot],
        estimator: &CombatEstimator,
    ) {
        self.rally_point = world.rally_point();
        self.enemy_start = world.enemy_start();

        let visible = world.visible_enemies();
        let seen: AHashSet<UnitId> = visible.iter().map(|u| u.id).collect();

        // A remembered hostile whose spot is in vision but which isn't there has moved on
        self.sightings
            .retain(|id, unit| seen.contains(id) || !world.is_visible(unit.position));
        for unit in self.sightings.values_mut() {
            unit.visible = false;
        }
        for mut unit in visible {
            unit.visible = true;
            self.sightings.insert(unit.id, unit);
        }

        self.optimism = estimator.effectiveness_filtered(
            own_units.iter().filter(|u| u.is_ready),
            self.sightings.values(),
            &ForceFilter::army(),
        );
    }

    /// Record a single hostile sighting
    pub fn observe(&mut self, unit: UnitSnapshot) {
        self.sightings.insert(unit.id, unit);
    }

    /// Drop a hostile known to be destroyed
    pub fn forget(&mut self, id: UnitId) -> Option<UnitSnapshot> {
        self.sightings.remove(&id)
    }

    /// Drop hostiles presumed stale; returns how many were removed
    pub fn purge<'a, I>(&mut self, ids: I) -> usize
    where
        I: IntoIterator<Item = &'a UnitId>,
    {
        ids.into_iter()
            .filter(|id| self.sightings.remove(id).is_some())
            .count()
    }

    /// Every remembered hostile, in id order
    pub fn known_enemies(&self) -> impl Iterator<Item = &UnitSnapshot> {
        self.sightings.values()
    }

    pub fn known_enemy(&self, id: UnitId) -> Option<&UnitSnapshot> {
        self.sightings.get(&id)
    }

    pub fn known_enemy_count(&self) -> usize {
        self.sightings.len()
    }

    /// Effectiveness of the whole own army against every known hostile army unit
    pub fn optimism(&self) -> f32 {
        self.optimism
    }

    pub fn set_optimism(&mut self, optimism: f32) {
        self.optimism = optimism;
    }

    pub fn rally_point(&self) -> Vec2 {
        self.rally_point
    }

    pub fn set_rally_point(&mut self, rally_point: Vec2) {
        self.rally_point = rally_point;
    }

    pub fn enemy_start(&self) -> Vec2 {
        self.enemy_start
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::UnitKind;
    use crate::world::SandboxWorld;

    #[test]
    fn test_refresh_remembers_hostiles_out_of_vision() {
        let mut world = SandboxWorld::new();
        world.add_own(UnitSnapshot::new(UnitId(1), UnitKind(1), Vec2::new(0.0, 0.0)));
        world.add_enemy(UnitSnapshot::new(UnitId(100), UnitKind(1), Vec2::new(5.0, 0.0)));

        let estimator = CombatEstimator::default();
        let mut intel = Intel::new();
        let own = world.own_units();
        intel.refresh(&world, &own, &estimator);
        assert!(intel.known_enemy(UnitId(100)).is_some_and(|u| u.visible));

        // Hostile walks out of sight: still remembered, flagged as a snapshot
        world.move_enemy(UnitId(100), Vec2::new(500.0, 0.0));
        intel.refresh(&world, &own, &estimator);
        let remembered = intel.known_enemy(UnitId(100)).expect("still known");
        assert!(!remembered.visible);
        assert_eq!(remembered.position, Vec2::new(5.0, 0.0));
    }

    #[test]
    fn test_refresh_drops_hostile_missing_from_visible_spot() {
        let mut world = SandboxWorld::new();
        world.add_own(UnitSnapshot::new(UnitId(1), UnitKind(1), Vec2::new(0.0, 0.0)));

        let estimator = CombatEstimator::default();
        let mut intel = Intel::new();
        // Last seen right next to our unit, but not there any more
        let mut ghost = UnitSnapshot::new(UnitId(100), UnitKind(1), Vec2::new(3.0, 0.0));
        ghost.visible = false;
        intel.observe(ghost);

        let own = world.own_units();
        intel.refresh(&world, &own, &estimator);
        assert!(intel.known_enemy(UnitId(100)).is_none());
    }

    #[test]
    fn test_optimism_ignores_workers() {
        let mut world = SandboxWorld::new();
        world.add_own(UnitSnapshot::worker(UnitId(1), UnitKind(2), Vec2::default()));
        let estimator = CombatEstimator::default();
        let mut intel = Intel::new();
        let own = world.own_units();
        intel.refresh(&world, &own, &estimator);
        assert_eq!(intel.optimism(), 1.0);
    }

    #[test]
    fn test_purge_counts_removed() {
        let mut intel = Intel::new();
        intel.observe(UnitSnapshot::new(UnitId(5), UnitKind(1), Vec2::default()));
        let removed = intel.purge(&[UnitId(5), UnitId(6)]);
        assert_eq!(removed, 1);
        assert_eq!(intel.known_enemy_count(), 0);
    }

    #[test]
    fn test_known_enemies_walk_in_id_order() {
        let mut intel = Intel::new();
        for id in [30, 5, 17, 2] {
            intel.observe(UnitSnapshot::new(UnitId(id), UnitKind(1), Vec2::default()));
        }
        let ids: Vec<UnitId> = intel.known_enemies().map(|u| u.id).collect();
        assert_eq!(ids, vec![UnitId(2), UnitId(5), UnitId(17), UnitId(30)]);
    }
}
