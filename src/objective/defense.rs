//! Defense policy - meet hostiles near our structures or rally point

use tracing::debug;

use crate::allocation::ClaimantId;
use crate::core::config::DefenseConfig;
use crate::core::types::{UnitId, Urgency, Vec2};
use crate::objective::{Completion, Objective, ObjectiveContext, ObjectivePolicy};
use crate::world::{geometry, UnitFilter, UnitSnapshot};

#[derive(Debug, Clone, PartialEq)]
pub struct DefensePolicy {
    config: DefenseConfig,
}

impl DefensePolicy {
    pub fn new(config: DefenseConfig) -> Self {
        Self { config }
    }

    /// Hostile close to enough of our structures, or to the rally point
    pub fn is_threat(&self, enemy: &UnitSnapshot, own: &[UnitSnapshot], rally: Vec2) -> bool {
        if enemy.is_structure {
            return false;
        }
        let structures_in_reach = own
            .iter()
            .filter(|u| u.is_structure)
            .filter(|u| u.position.is_closer_than(self.config.threat_radius, &enemy.position))
            .count();
        structures_in_reach > self.config.threat_structure_count
            || enemy
                .position
                .is_closer_than(self.config.rally_threat_radius, &rally)
    }
}

impl ObjectivePolicy for DefensePolicy {
    fn label(&self) -> &'static str {
        "defense"
    }

    /// Centroid of the threat, falling back to home
    fn target(&self, ctx: &ObjectiveContext, enemies: &[UnitSnapshot]) -> Vec2 {
        geometry::center_of(enemies)
            .or_else(|| ctx.home())
            .unwrap_or_else(|| ctx.intel.rally_point())
    }

    fn find_enemies(&self, ctx: &ObjectiveContext) -> Vec<UnitSnapshot> {
        let rally = ctx.intel.rally_point();
        ctx.intel
            .known_enemies()
            .filter(|e| self.is_threat(e, ctx.own, rally))
            .cloned()
            .collect()
    }

    fn minimum_units(&self, _enemies: &[UnitSnapshot]) -> usize {
        0
    }

    fn optimum_units(&self, _ctx: &ObjectiveContext, enemies: &[UnitSnapshot]) -> usize {
        enemies.len() * self.config.optimum_multiplier
    }

    fn stages(&self) -> bool {
        false
    }

    /// Draft nearby workers when outmatched; let everything go once the threat is gone
    fn after_allocate(
        &self,
        claimant: ClaimantId,
        urgency: Urgency,
        enemies: &[UnitSnapshot],
        ctx: &mut ObjectiveContext,
    ) {
        if enemies.is_empty() {
            let released = ctx.registry.release_all(claimant);
            if !released.is_empty() {
                debug!("Defense released {} units, no threats left", released.len());
            }
            return;
        }

        let held = ctx.held(claimant);
        let ratio = ctx.estimator.effectiveness(held.iter().copied(), enemies);
        if ratio >= 1.0 || enemies.len() <= self.config.worker_draft_min_enemies {
            return;
        }
        let Some(threat) = geometry::center_of(enemies) else {
            return;
        };
        let workers: Vec<UnitId> = ctx
            .registry
            .unallocated(ctx.own, &UnitFilter::Workers, urgency)
            .into_iter()
            .filter(|w| w.position.is_closer_than(self.config.worker_draft_radius, &threat))
            .map(|w| w.id)
            .collect();
        if !workers.is_empty() {
            let drafted = ctx.registry.take(&workers, claimant);
            debug!("Defense drafted {} workers (effectiveness {:.2})", drafted, ratio);
        }
    }

    fn completion(&self, objective: &Objective, ctx: &ObjectiveContext) -> Option<Completion> {
        if objective.enemies().is_empty() {
            return Some(Completion::NoThreats);
        }
        // Threats remembered but unseen for the whole window are stale
        let silence = ctx.config.objective.silence_window_ticks;
        if ctx.tick.saturating_sub(objective.last_seen()) > silence {
            return Some(Completion::Silence);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::UnitKind;

    fn base_layout() -> Vec<UnitSnapshot> {
        vec![
            UnitSnapshot::structure(UnitId(1), UnitKind(1), Vec2::new(0.0, 0.0)),
            UnitSnapshot::structure(UnitId(2), UnitKind(2), Vec2::new(6.0, 0.0)),
        ]
    }

    #[test]
    fn test_threat_near_two_structures() {
        let policy = DefensePolicy::new(DefenseConfig::default());
        let own = base_layout();
        let rally = Vec2::new(50.0, 50.0);

        let raider = UnitSnapshot::new(UnitId(10), UnitKind(5), Vec2::new(3.0, 10.0));
        assert!(policy.is_threat(&raider, &own, rally));

        // Near only one structure
        let passer = UnitSnapshot::new(UnitId(11), UnitKind(5), Vec2::new(-18.0, 0.0));
        assert!(!policy.is_threat(&passer, &own, rally));
    }

    #[test]
    fn test_threat_near_rally() {
        let policy = DefensePolicy::new(DefenseConfig::default());
        let rally = Vec2::new(50.0, 50.0);
        let lurker = UnitSnapshot::new(UnitId(10), UnitKind(5), Vec2::new(55.0, 50.0));
        assert!(policy.is_threat(&lurker, &[], rally));
    }
}
