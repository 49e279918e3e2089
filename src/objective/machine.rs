//! The objective state machine
//!
//! ALLOCATING -> STAGING -> ACTIVE -> RETREATING, with `abort()` jumping
//! straight to RETREATING for good and any other regrouped, winning force
//! going from RETREATING back to ACTIVE. Each tick runs the phases in that order, so
//! a transition made early in the tick is acted on in the same tick.

use tracing::{debug, info};

use crate::allocation::{AllocationRegistry, ClaimantId};
use crate::core::config::EngineConfig;
use crate::core::types::{Tick, UnitId, Urgency, Vec2};
use crate::objective::{Completion, ObjectiveContext, ObjectiveKind, ObjectiveStatus};
use crate::world::{geometry, Command, UnitFilter, UnitSnapshot};

/// Distance staged units keep in front of or behind the rendezvous
const STAGING_SPREAD: f32 = 3.0;
/// How far a unit on weapon cooldown steps toward the target
const COOLDOWN_STEP: f32 = 2.0;

#[derive(Debug, Clone)]
pub struct Objective {
    kind: ObjectiveKind,
    claimant: ClaimantId,
    status: ObjectiveStatus,
    status_since: Tick,
    urgency: Urgency,
    rendezvous: Option<Vec2>,
    enemies: Vec<UnitSnapshot>,
    last_seen: Tick,
    last_refresh: Tick,
    abort_requested: bool,
    /// Aborted objectives retreat for good
    withdrawn: bool,
}

impl Objective {
    /// Create an objective and register it as a claimant
    pub fn new(
        kind: ObjectiveKind,
        urgency: Urgency,
        tick: Tick,
        registry: &mut AllocationRegistry,
    ) -> Self {
        let claimant = registry.register(kind.policy().label(), urgency);
        info!("New {} objective at {:?}", kind.policy().label(), urgency);
        Self {
            kind,
            claimant,
            status: ObjectiveStatus::Allocating,
            status_since: tick,
            urgency,
            rendezvous: None,
            enemies: Vec::new(),
            last_seen: tick,
            last_refresh: tick,
            abort_requested: false,
            withdrawn: false,
        }
    }

    pub fn kind(&self) -> &ObjectiveKind {
        &self.kind
    }

    pub fn label(&self) -> &'static str {
        self.kind.policy().label()
    }

    pub fn claimant(&self) -> ClaimantId {
        self.claimant
    }

    pub fn status(&self) -> ObjectiveStatus {
        self.status
    }

    pub fn status_since(&self) -> Tick {
        self.status_since
    }

    pub fn urgency(&self) -> Urgency {
        self.urgency
    }

    pub fn rendezvous(&self) -> Option<Vec2> {
        self.rendezvous
    }

    /// Relevant hostiles as of the last tick
    pub fn enemies(&self) -> &[UnitSnapshot] {
        &self.enemies
    }

    pub fn last_seen(&self) -> Tick {
        self.last_seen
    }

    /// Fall back on the next tick, whatever the current state
    pub fn abort(&mut self) {
        self.abort_requested = true;
    }

    pub fn abort_pending(&self) -> bool {
        self.abort_requested
    }

    /// A held unit died; losses while staging mean the fight has started
    pub fn on_unit_destroyed(&mut self, unit: UnitId, tick: Tick, registry: &AllocationRegistry) {
        if self.status == ObjectiveStatus::Staging && registry.is_held_by(unit, self.claimant) {
            info!("{} objective lost a unit while staging, engaging", self.label());
            self.transition(ObjectiveStatus::Active, tick);
        }
    }

    pub fn tick(&mut self, ctx: &mut ObjectiveContext) {
        if self.abort_requested {
            self.abort_requested = false;
            self.withdrawn = true;
            info!("{} objective aborted", self.label());
            self.transition(ObjectiveStatus::Retreating, ctx.tick);
        }

        self.enemies = self.kind.policy().find_enemies(ctx);
        let confirmed = self
            .enemies
            .iter()
            .any(|e| ctx.visible_enemies.iter().any(|v| v.id == e.id));
        if confirmed {
            self.last_seen = ctx.tick;
        }

        if self.status != ObjectiveStatus::Retreating {
            self.allocate(ctx);
        }
        if self.status == ObjectiveStatus::Staging {
            self.stage(ctx);
        }
        if self.status == ObjectiveStatus::Active {
            self.micro(ctx);
        }
        if self.status == ObjectiveStatus::Retreating {
            self.retreat(ctx);
        }
    }

    /// Whether the objective is done, and why
    pub fn completion(&self, ctx: &ObjectiveContext) -> Option<Completion> {
        self.kind.policy().completion(self, ctx)
    }

    pub fn target(&self, ctx: &ObjectiveContext) -> Vec2 {
        self.kind.policy().target(ctx, &self.enemies)
    }

    fn transition(&mut self, status: ObjectiveStatus, tick: Tick) {
        if self.status != status {
            debug!("{} objective {:?} -> {:?}", self.label(), self.status, status);
            self.status = status;
            self.status_since = tick;
        }
    }

    fn allocate(&mut self, ctx: &mut ObjectiveContext) {
        let policy = self.kind.policy();
        let minimum = policy.minimum_units(&self.enemies);
        let optimum = policy.optimum_units(ctx, &self.enemies);
        let held = ctx.registry.held_count(self.claimant);

        let still_needed = minimum.saturating_sub(held);
        let still_wanted = optimum.saturating_sub(held);
        let usable = ctx
            .registry
            .unallocated(ctx.own, &UnitFilter::Combat, self.urgency);

        // Never take a partial force: either the minimum is reachable or nothing moves
        if still_wanted > 0 && usable.len() >= still_needed {
            let target = self.target(ctx);
            let adding: Vec<UnitId> = geometry::closest_n(usable, target, still_wanted)
                .into_iter()
                .map(|u| u.id)
                .collect();
            ctx.registry.take(&adding, self.claimant);
        }

        policy.after_allocate(self.claimant, self.urgency, &self.enemies, ctx);

        let held = ctx.registry.held_count(self.claimant);
        if self.status == ObjectiveStatus::Allocating && held >= minimum {
            debug!(
                "{} objective holds {} of minimum {}, staging",
                self.label(),
                held,
                minimum
            );
            self.transition(ObjectiveStatus::Staging, ctx.tick);
        }
    }

    fn stage(&mut self, ctx: &mut ObjectiveContext) {
        let settings: &EngineConfig = ctx.config;
        let config = &settings.objective;
        let held = ctx.held(self.claimant);
        let target = self.target(ctx);

        if !self.kind.policy().stages() {
            self.escalate(ctx, &held, target);
            return;
        }

        let ratio = ctx
            .estimator
            .effectiveness(held.iter().copied(), &self.enemies);
        if ratio > config.strong_advantage_ratio {
            info!("{} objective engaging, overwhelming advantage ({:.2})", self.label(), ratio);
            self.escalate(ctx, &held, target);
            return;
        }

        let under_fire = ctx.visible_enemies.iter().any(|e| {
            e.engaged_target
                .is_some_and(|t| held.iter().any(|u| u.id == t))
        });
        let staged_for = ctx.tick.saturating_sub(self.status_since);
        if under_fire && staged_for > config.staging_under_fire_ticks {
            info!("{} objective engaging, attacked while staging", self.label());
            self.escalate(ctx, &held, target);
            return;
        }

        if self.rendezvous.is_none() {
            for unit in &held {
                ctx.commands.issue(unit.id, Command::AttackMove(target));
            }
            self.rendezvous = Self::find_rendezvous(&held, ctx.visible_enemies, config.front_reach);
        }
        let Some(rendezvous) = self.rendezvous else {
            return;
        };

        let arrived = held
            .iter()
            .filter(|u| u.position.is_closer_than(config.rendezvous_radius, &rendezvous))
            .count();
        if arrived as f32 > held.len() as f32 * config.arrival_fraction {
            info!(
                "{} objective engaging, {} of {} at rendezvous",
                self.label(),
                arrived,
                held.len()
            );
            self.escalate(ctx, &held, target);
            return;
        }

        let crowding = ctx
            .visible_enemies
            .iter()
            .filter(|e| !e.is_structure)
            .filter(|e| e.position.is_closer_than(config.rendezvous_enemy_radius, &rendezvous))
            .count();
        if crowding > config.rendezvous_enemy_count {
            info!("{} objective engaging, {} hostiles at rendezvous", self.label(), crowding);
            self.escalate(ctx, &held, target);
            return;
        }

        // Ranged units hang back, the rest form the front
        for unit in &held {
            let spread = if unit.range >= config.kite_min_range {
                -STAGING_SPREAD
            } else {
                STAGING_SPREAD
            };
            ctx.commands
                .issue(unit.id, Command::Move(rendezvous.towards(&target, spread)));
        }
    }

    /// First contact: the unit just behind the engaged front
    fn find_rendezvous(
        held: &[&UnitSnapshot],
        visible_enemies: &[UnitSnapshot],
        reach: f32,
    ) -> Option<Vec2> {
        let (front, rest): (Vec<&UnitSnapshot>, Vec<&UnitSnapshot>) =
            held.iter().copied().partition(|u| {
                visible_enemies
                    .iter()
                    .any(|e| e.position.is_closer_than(reach, &u.position))
            });
        let front_center = geometry::center_of(front.iter().copied())?;
        geometry::closest_to(rest.iter().copied(), front_center)
            .or_else(|| front.first().copied())
            .map(|u| u.position)
    }

    fn escalate(&mut self, ctx: &mut ObjectiveContext, held: &[&UnitSnapshot], target: Vec2) {
        for unit in held {
            ctx.commands.issue(unit.id, Command::AttackMove(target));
        }
        self.last_refresh = ctx.tick;
        self.transition(ObjectiveStatus::Active, ctx.tick);
    }

    fn micro(&mut self, ctx: &mut ObjectiveContext) {
        let settings: &EngineConfig = ctx.config;
        let config = &settings.objective;
        let held = ctx.held(self.claimant);
        if held.is_empty() {
            return;
        }
        let target = self.target(ctx);

        if ctx.tick.saturating_sub(self.last_refresh) > config.attack_refresh_ticks {
            self.last_refresh = ctx.tick;
            let aim = geometry::closest_to(&self.enemies, target)
                .map(|e| e.position)
                .unwrap_or(target);
            for unit in held.iter().filter(|u| u.weapon_cooldown <= 0.0) {
                ctx.commands.issue(unit.id, Command::AttackMove(aim));
            }
        }

        // Keep the line moving while most of it is still firing
        let near_target =
            geometry::closer_than(held.iter().copied(), config.cluster_radius, target);
        let cooling: Vec<&UnitSnapshot> = near_target
            .iter()
            .copied()
            .filter(|u| u.weapon_cooldown > 0.0)
            .collect();
        if cooling.len() * 2 < near_target.len() {
            for unit in cooling {
                let step = unit.position.towards(&target, COOLDOWN_STEP);
                ctx.commands.issue(unit.id, Command::Move(step));
                ctx.commands.queue(unit.id, Command::AttackMove(target));
            }
        }

        let contact: Vec<&UnitSnapshot> = self
            .enemies
            .iter()
            .filter(|e| {
                held.iter()
                    .any(|u| e.position.is_closer_than(config.contact_radius, &u.position))
            })
            .collect();
        let Some(contact_center) = geometry::center_of(contact.iter().copied()) else {
            return;
        };
        let allies =
            geometry::closer_than(held.iter().copied(), config.cluster_radius, contact_center);
        let local = ctx
            .estimator
            .effectiveness(allies.iter().copied(), contact.iter().copied());

        if allies.len() * 3 >= held.len()
            && ctx.intel.optimism() < config.disengage_optimism_ceiling
            && local < config.disengage_ratio
        {
            info!(
                "{} objective retreating: {} hostiles vs {} of {} units (local {:.2})",
                self.label(),
                contact.len(),
                allies.len(),
                held.len(),
                local
            );
            self.transition(ObjectiveStatus::Retreating, ctx.tick);
        }
    }

    fn retreat(&mut self, ctx: &mut ObjectiveContext) {
        let settings: &EngineConfig = ctx.config;
        let config = &settings.objective;
        let rally = ctx.intel.rally_point();
        self.rendezvous = Some(rally);

        let held = ctx.held(self.claimant);
        let outside = held
            .iter()
            .filter(|u| !u.position.is_closer_than(config.rally_stop_radius, &rally));
        for unit in outside {
            // Ranged units with a loaded weapon shoot on the way out
            let command = if unit.range >= config.kite_min_range && unit.weapon_cooldown <= 0.0 {
                Command::AttackMove(rally)
            } else {
                Command::Move(rally)
            };
            ctx.commands.issue(unit.id, command);
        }

        let Some(centroid) = geometry::center_of(held.iter().copied()) else {
            return;
        };
        let grouped = geometry::closer_than(held.iter().copied(), config.regroup_radius, centroid);
        let local = if grouped.is_empty() {
            0.0
        } else {
            ctx.estimator
                .effectiveness(grouped.iter().copied(), &self.enemies)
        };

        let recovered = local > config.recovery_ratio && grouped.len() >= self.enemies.len();
        if recovered && !self.withdrawn {
            info!("{} objective re-engaging, local effectiveness {:.2}", self.label(), local);
            self.last_refresh = ctx.tick;
            self.transition(ObjectiveStatus::Active, ctx.tick);
        } else if held
            .iter()
            .all(|u| u.position.is_closer_than(config.rally_radius, &rally))
        {
            let released = ctx.registry.release_all(self.claimant);
            info!("{} objective back at rally, released {} units", self.label(), released.len());
        }
    }
}
