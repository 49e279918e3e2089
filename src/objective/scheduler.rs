//! ObjectiveScheduler - creates, ticks and retires objectives
//!
//! At most one attack and one defense objective exist at a time. A live
//! objective is ticked every pass; its trigger is only evaluated while its
//! slot is empty, so a finished objective can be replaced on the same tick.

use serde::Serialize;
use tracing::{debug, info};

use crate::allocation::AllocationRegistry;
use crate::core::types::{Tick, UnitId, Vec2};
use crate::objective::{
    AttackPolicy, Completion, DefensePolicy, Objective, ObjectiveContext, ObjectiveKind,
    ObjectiveStatus,
};
use crate::world::{geometry, UnitFilter, UnitSnapshot};

/// One objective as seen at the end of a tick
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectiveSummary {
    pub label: &'static str,
    pub status: ObjectiveStatus,
    pub held: usize,
    pub enemies: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletedObjective {
    pub label: &'static str,
    pub reason: Completion,
    /// Units handed back to the unclaimed pool
    pub released: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SchedulerReport {
    pub created: Vec<&'static str>,
    pub completed: Vec<CompletedObjective>,
    pub live: Vec<ObjectiveSummary>,
}

#[derive(Debug, Clone, Default)]
pub struct ObjectiveScheduler {
    defense: Option<Objective>,
    attack: Option<Objective>,
}

impl ObjectiveScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attack(&self) -> Option<&Objective> {
        self.attack.as_ref()
    }

    pub fn defense(&self) -> Option<&Objective> {
        self.defense.as_ref()
    }

    pub fn objectives(&self) -> impl Iterator<Item = &Objective> {
        self.defense.iter().chain(self.attack.iter())
    }

    /// Send every live objective home on its next tick
    pub fn abort_all(&mut self) {
        for objective in self.defense.iter_mut().chain(self.attack.iter_mut()) {
            objective.abort();
        }
    }

    /// Objectives stuck in ALLOCATING for at least `min_ticks`
    pub fn stalled(&self, min_ticks: Tick, tick: Tick) -> Vec<&Objective> {
        self.objectives()
            .filter(|o| o.status() == ObjectiveStatus::Allocating)
            .filter(|o| tick.saturating_sub(o.status_since()) >= min_ticks)
            .collect()
    }

    pub fn on_unit_destroyed(&mut self, unit: UnitId, tick: Tick, registry: &AllocationRegistry) {
        for objective in self.defense.iter_mut().chain(self.attack.iter_mut()) {
            objective.on_unit_destroyed(unit, tick, registry);
        }
    }

    pub fn tick(&mut self, ctx: &mut ObjectiveContext, supply_used: u32) -> SchedulerReport {
        let mut report = SchedulerReport::default();

        // 1. Advance and retire the live objectives
        for slot in [&mut self.defense, &mut self.attack] {
            let Some(objective) = slot.as_mut() else {
                continue;
            };
            objective.tick(ctx);
            if let Some(reason) = objective.completion(ctx) {
                if let Some(finished) = slot.take() {
                    report.completed.push(Self::retire(finished, reason, ctx));
                }
            }
        }

        // 2. Fill empty slots whose trigger fires
        if self.defense.is_none() {
            if let Some(objective) = Self::trigger_defense(ctx) {
                report.created.push(objective.label());
                self.defense = Some(objective);
            }
        }
        if self.attack.is_none() {
            if let Some(objective) = Self::trigger_attack(ctx, supply_used) {
                report.created.push(objective.label());
                self.attack = Some(objective);
            }
        }

        report.live = self
            .objectives()
            .map(|o| ObjectiveSummary {
                label: o.label(),
                status: o.status(),
                held: ctx.registry.held_count(o.claimant()),
                enemies: o.enemies().len(),
            })
            .collect();
        report
    }

    fn retire(
        objective: Objective,
        reason: Completion,
        ctx: &mut ObjectiveContext,
    ) -> CompletedObjective {
        // Enemies unseen for the whole window while we were fighting them are stale
        if reason == Completion::Silence && objective.status() == ObjectiveStatus::Active {
            let purged = ctx.intel.purge(objective.enemies().iter().map(|e| &e.id));
            debug!("Purged {} stale sightings", purged);
        }
        let released = ctx
            .registry
            .unregister(objective.claimant())
            .map_or(0, |claim| claim.len());
        info!(
            "{} objective complete ({:?}), released {} units",
            objective.label(),
            reason,
            released
        );
        CompletedObjective {
            label: objective.label(),
            reason,
            released,
        }
    }

    /// Visible hostiles threatening our structures or rally point
    fn trigger_defense(ctx: &mut ObjectiveContext) -> Option<Objective> {
        let policy = DefensePolicy::new(ctx.config.defense.clone());
        let rally = ctx.intel.rally_point();
        let threats = ctx
            .visible_enemies
            .iter()
            .filter(|e| policy.is_threat(e, ctx.own, rally))
            .count();
        if threats == 0 {
            return None;
        }
        info!("{} threatening hostiles in vision", threats);
        Some(Objective::new(
            ObjectiveKind::Defense(policy),
            ctx.config.scheduler.defense_urgency,
            ctx.tick,
            ctx.registry,
        ))
    }

    /// Attack once maxed out or confident
    fn trigger_attack(ctx: &mut ObjectiveContext, supply_used: u32) -> Option<Objective> {
        let scheduler = &ctx.config.scheduler;
        let maxed = supply_used > scheduler.attack_supply_trigger;
        let confident = ctx.intel.optimism() > scheduler.attack_optimism_trigger;
        if !maxed && !confident {
            return None;
        }
        let target = Self::attack_target(ctx);
        info!(
            "Attacking {:?} (supply {}, optimism {:.2})",
            target,
            supply_used,
            ctx.intel.optimism()
        );
        Some(Objective::new(
            ObjectiveKind::Attack(AttackPolicy::new(target, ctx.config.attack.clone())),
            ctx.config.scheduler.attack_urgency,
            ctx.tick,
            ctx.registry,
        ))
    }

    /// The base furthest from the hostile army, else the structure nearest ours,
    /// else where the enemy started
    fn attack_target(ctx: &ObjectiveContext) -> Vec2 {
        let enemy_start = ctx.intel.enemy_start();
        let army_center =
            geometry::center_of(ctx.intel.known_enemies().filter(|e| !e.is_structure))
                .unwrap_or(enemy_start);
        let bases = ctx.intel.known_enemies().filter(|e| e.is_base);
        if let Some(base) = geometry::furthest_from(bases, army_center) {
            return base.position;
        }

        let own_army: Vec<&UnitSnapshot> = ctx
            .own
            .iter()
            .filter(|u| UnitFilter::Combat.matches(u))
            .collect();
        let own_center = geometry::center_of(own_army)
            .or_else(|| ctx.home())
            .unwrap_or_else(|| ctx.intel.rally_point());
        let structures = ctx.intel.known_enemies().filter(|e| e.is_structure);
        geometry::closest_to(structures, own_center)
            .map(|s| s.position)
            .unwrap_or(enemy_start)
    }
}
