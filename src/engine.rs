//! Engine - one full decision pass per world tick
//!
//! Producers submit requests, the arbitrator spends the tick's resources on
//! them, the scheduler runs the objectives, and every command collected on
//! the way goes to the world in one batch.

use ahash::AHashSet;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::allocation::{AllocationRegistry, ClaimantId};
use crate::combat::CombatEstimator;
use crate::core::config::EngineConfig;
use crate::core::types::{Tick, UnitId, UpgradeId, Urgency};
use crate::objective::{ObjectiveContext, ObjectiveScheduler, SchedulerReport};
use crate::producers::Producer;
use crate::requests::{ArbitrationReport, Request, RequestArbitrator, ResourcePool, TechTree};
use crate::world::{CommandBuffer, Intel, World};

/// Diagnostics for one tick
#[derive(Debug, Clone, Serialize)]
pub struct TickReport {
    pub tick: Tick,
    pub resources: ResourcePool,
    pub optimism: f32,
    pub known_enemies: usize,
    pub arbitration: ArbitrationReport,
    pub objectives: SchedulerReport,
    /// Commands sent to the world, arbitration included
    pub commands_issued: usize,
    pub pruned: usize,
}

pub struct Engine {
    config: EngineConfig,
    tech: TechTree,
    estimator: CombatEstimator,
    arbitrator: RequestArbitrator,
    registry: AllocationRegistry,
    scheduler: ObjectiveScheduler,
    intel: Intel,
    producers: Vec<Box<dyn Producer>>,
    submitted: Vec<Request>,
}

impl Engine {
    pub fn new(config: EngineConfig, tech: TechTree) -> Self {
        // Never below the tree's own depth
        let tree_depth = tech.max_dependency_depth();
        let mut max_depth = config.arbitrator.max_dependency_depth;
        if max_depth < tree_depth {
            warn!(
                "Dependency bound {} is below the tech tree depth {}, raising it",
                max_depth, tree_depth
            );
            max_depth = tree_depth;
        }
        Self {
            estimator: CombatEstimator::new(&config.estimator),
            arbitrator: RequestArbitrator::new(max_depth),
            registry: AllocationRegistry::new(),
            scheduler: ObjectiveScheduler::new(),
            intel: Intel::new(),
            producers: Vec::new(),
            submitted: Vec::new(),
            config,
            tech,
        }
    }

    pub fn with_producer(mut self, producer: impl Producer + 'static) -> Self {
        self.add_producer(producer);
        self
    }

    pub fn add_producer(&mut self, producer: impl Producer + 'static) {
        debug!("Added producer '{}'", producer.name());
        self.producers.push(Box::new(producer));
    }

    /// Queue a one-off request for the next tick
    pub fn submit(&mut self, request: Request) {
        self.submitted.push(request);
    }

    /// Register an outside claimant (scouting, harassment) with the registry
    pub fn register_claimant(
        &mut self,
        label: impl Into<String>,
        urgency: Urgency,
    ) -> ClaimantId {
        self.registry.register(label, urgency)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn tech(&self) -> &TechTree {
        &self.tech
    }

    pub fn estimator(&self) -> &CombatEstimator {
        &self.estimator
    }

    pub fn intel(&self) -> &Intel {
        &self.intel
    }

    pub fn arbitrator(&self) -> &RequestArbitrator {
        &self.arbitrator
    }

    pub fn registry(&self) -> &AllocationRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut AllocationRegistry {
        &mut self.registry
    }

    pub fn scheduler(&self) -> &ObjectiveScheduler {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut ObjectiveScheduler {
        &mut self.scheduler
    }

    /// A unit died, ours or theirs
    pub fn on_unit_destroyed(&mut self, unit: UnitId, tick: Tick) {
        if self.intel.forget(unit).is_some() {
            debug!("Hostile {:?} destroyed", unit);
            return;
        }
        self.scheduler.on_unit_destroyed(unit, tick, &self.registry);
    }

    pub fn on_upgrade_complete(&mut self, upgrade: UpgradeId) {
        info!("Upgrade {:?} complete", upgrade);
        for producer in &mut self.producers {
            producer.on_upgrade_complete(upgrade);
        }
    }

    pub async fn tick<W: World>(&mut self, world: &mut W) -> TickReport {
        let tick = world.current_tick();

        // 1. Perception
        let own = world.own_units();
        let visible = world.visible_enemies();
        self.intel.refresh(&*world, &own, &self.estimator);

        // 2. Stale claims go before anything reads them
        let existing: AHashSet<UnitId> = own.iter().map(|u| u.id).collect();
        let pruned = self.registry.prune(&existing);

        // 3. Collect requests
        let mut requests = std::mem::take(&mut self.submitted);
        for producer in &mut self.producers {
            requests.extend(producer.produce(&*world, &own, &self.intel));
        }

        // 4. Spend this tick's resources
        let resources = world.resources();
        let claimed = self.registry.held_ids();
        let arbitration = self
            .arbitrator
            .arbitrate(requests, resources, &*world, &own, &claimed, &self.tech)
            .await;

        // 5. Objectives
        let mut commands = CommandBuffer::new();
        let objectives = {
            let mut ctx = ObjectiveContext {
                tick,
                own: &own,
                visible_enemies: &visible,
                intel: &mut self.intel,
                registry: &mut self.registry,
                estimator: &self.estimator,
                config: &self.config,
                commands: &mut commands,
            };
            self.scheduler.tick(&mut ctx, world.supply_used())
        };

        // 6. Hand everything to the world
        let mut issued = arbitration.commands.clone();
        issued.extend(commands.drain());
        let commands_issued = issued.len();
        world.execute(issued);

        debug!(
            "Tick {}: {} requests fulfilled, {} commands",
            tick,
            arbitration.fulfilled_count(),
            commands_issued
        );

        TickReport {
            tick,
            resources,
            optimism: self.intel.optimism(),
            known_enemies: self.intel.known_enemy_count(),
            arbitration,
            objectives,
            commands_issued,
            pruned,
        }
    }
}
