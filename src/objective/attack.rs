//! Attack policy - push on a fixed hostile location

use crate::core::config::AttackConfig;
use crate::core::types::Vec2;
use crate::objective::{Completion, Objective, ObjectiveContext, ObjectivePolicy, ObjectiveStatus};
use crate::world::{UnitFilter, UnitSnapshot};

#[derive(Debug, Clone, PartialEq)]
pub struct AttackPolicy {
    target: Vec2,
    config: AttackConfig,
}

impl AttackPolicy {
    pub fn new(target: Vec2, config: AttackConfig) -> Self {
        Self { target, config }
    }

    pub fn target_location(&self) -> Vec2 {
        self.target
    }
}

impl ObjectivePolicy for AttackPolicy {
    fn label(&self) -> &'static str {
        "attack"
    }

    fn target(&self, _ctx: &ObjectiveContext, _enemies: &[UnitSnapshot]) -> Vec2 {
        self.target
    }

    fn find_enemies(&self, ctx: &ObjectiveContext) -> Vec<UnitSnapshot> {
        ctx.intel.known_enemies().cloned().collect()
    }

    /// Half the hostile army, capped; structures don't count
    fn minimum_units(&self, enemies: &[UnitSnapshot]) -> usize {
        let army = enemies.iter().filter(|e| !e.is_structure).count();
        let wanted = (army as f32 * self.config.minimum_per_enemy) as usize;
        wanted.min(self.config.minimum_cap)
    }

    /// Everything we have
    fn optimum_units(&self, ctx: &ObjectiveContext, _enemies: &[UnitSnapshot]) -> usize {
        ctx.own.iter().filter(|u| UnitFilter::Combat.matches(u)).count()
    }

    fn completion(&self, objective: &Objective, ctx: &ObjectiveContext) -> Option<Completion> {
        // While still allocating, an empty set just means we're waiting
        if objective.status() == ObjectiveStatus::Allocating {
            return None;
        }

        let held = ctx.held(objective.claimant());
        if objective.status() == ObjectiveStatus::Retreating {
            // Units released at the rally point count as home
            let rally = ctx.intel.rally_point();
            let radius = self.config.retreat_complete_radius;
            if held.iter().all(|u| u.position.is_closer_than(radius, &rally)) {
                return Some(Completion::Retreated);
            }
            return None;
        }

        if held.is_empty() {
            return Some(Completion::Disbanded);
        }

        // Cleared: we are standing on the target and know of nothing there
        let radius = self.config.target_clear_radius;
        let at_target = held
            .iter()
            .any(|u| u.position.is_closer_than(radius, &self.target));
        let hostile_left = ctx
            .intel
            .known_enemies()
            .any(|e| e.position.is_closer_than(radius, &self.target));
        if at_target && !hostile_left {
            return Some(Completion::TargetCleared);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{UnitId, UnitKind};

    #[test]
    fn test_minimum_is_half_the_army_capped() {
        let policy = AttackPolicy::new(Vec2::default(), AttackConfig::default());
        let mut enemies: Vec<UnitSnapshot> = (0..7)
            .map(|i| UnitSnapshot::new(UnitId(i), UnitKind(1), Vec2::default()))
            .collect();
        enemies.push(UnitSnapshot::structure(UnitId(100), UnitKind(9), Vec2::default()));
        assert_eq!(policy.minimum_units(&enemies), 3);

        let horde: Vec<UnitSnapshot> = (0..100)
            .map(|i| UnitSnapshot::new(UnitId(i), UnitKind(1), Vec2::default()))
            .collect();
        assert_eq!(policy.minimum_units(&horde), 20);
        assert_eq!(policy.minimum_units(&[]), 0);
    }
}
