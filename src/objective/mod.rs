//! Tactical objectives - claim units, stage, fight, withdraw
//!
//! One state machine ([`Objective`]) shared by every variant. What differs
//! between attacking and defending (where the target is, which hostiles
//! matter, how many units to ask for, when the job is done) is supplied by
//! an [`ObjectivePolicy`] held in the closed [`ObjectiveKind`] enum.

pub mod attack;
pub mod defense;
pub mod machine;
pub mod scheduler;

use serde::{Deserialize, Serialize};

use crate::allocation::{AllocationRegistry, ClaimantId};
use crate::combat::CombatEstimator;
use crate::core::config::EngineConfig;
use crate::core::types::{Tick, Urgency, Vec2};
use crate::world::{geometry, CommandBuffer, Intel, UnitSnapshot};

pub use attack::AttackPolicy;
pub use defense::DefensePolicy;
pub use machine::Objective;
pub use scheduler::{ObjectiveScheduler, SchedulerReport};

/// State of an objective; advances in declaration order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ObjectiveStatus {
    /// Gathering units until the minimum is met
    Allocating,
    /// Moving into position
    Staging,
    /// Fighting
    Active,
    /// Falling back to the rally point
    Retreating,
}

/// Why an objective finished
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Completion {
    /// No hostile confirmed in vision for the silence window
    Silence,
    TargetCleared,
    /// Every held unit made it back to the rally point
    Retreated,
    /// Nothing left to command
    Disbanded,
    /// No threatening hostiles remain
    NoThreats,
}

/// Everything an objective may read or touch during one tick
///
/// Shared state is only reachable through these handles: units change hands
/// through the registry, orders go into the command buffer.
pub struct ObjectiveContext<'a> {
    pub tick: Tick,
    /// Own units and structures this tick, stale ids already pruned
    pub own: &'a [UnitSnapshot],
    /// Hostiles currently in vision
    pub visible_enemies: &'a [UnitSnapshot],
    pub intel: &'a mut Intel,
    pub registry: &'a mut AllocationRegistry,
    pub estimator: &'a CombatEstimator,
    pub config: &'a EngineConfig,
    pub commands: &'a mut CommandBuffer,
}

impl<'a> ObjectiveContext<'a> {
    /// Units held by `claimant`, in id order
    pub fn held(&self, claimant: ClaimantId) -> Vec<&'a UnitSnapshot> {
        self.registry.held_units(claimant, self.own)
    }

    pub fn own_structures(&self) -> impl Iterator<Item = &'a UnitSnapshot> {
        self.own.iter().filter(|u| u.is_structure)
    }

    /// Centroid of own bases, else of any own structure
    pub fn home(&self) -> Option<Vec2> {
        geometry::center_of(self.own.iter().filter(|u| u.is_base))
            .or_else(|| geometry::center_of(self.own_structures()))
    }
}

/// Variant-specific decisions plugged into the shared state machine
pub trait ObjectivePolicy {
    fn label(&self) -> &'static str;

    /// Where the objective is aimed this tick
    fn target(&self, ctx: &ObjectiveContext, enemies: &[UnitSnapshot]) -> Vec2;

    /// Hostiles this objective cares about, from the sighting table
    fn find_enemies(&self, ctx: &ObjectiveContext) -> Vec<UnitSnapshot>;

    /// Units that must be held before leaving ALLOCATING
    fn minimum_units(&self, enemies: &[UnitSnapshot]) -> usize;

    /// Units worth holding
    fn optimum_units(&self, ctx: &ObjectiveContext, enemies: &[UnitSnapshot]) -> usize;

    /// Whether held units gather at a rendezvous before engaging
    fn stages(&self) -> bool {
        true
    }

    /// Extra claiming or releasing after the shared allocation step
    fn after_allocate(
        &self,
        _claimant: ClaimantId,
        _urgency: Urgency,
        _enemies: &[UnitSnapshot],
        _ctx: &mut ObjectiveContext,
    ) {
    }

    /// Variant-specific completion
    fn completion(&self, objective: &Objective, ctx: &ObjectiveContext) -> Option<Completion>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum ObjectiveKind {
    Attack(AttackPolicy),
    Defense(DefensePolicy),
}

impl ObjectiveKind {
    pub fn policy(&self) -> &dyn ObjectivePolicy {
        match self {
            ObjectiveKind::Attack(policy) => policy,
            ObjectiveKind::Defense(policy) => policy,
        }
    }

    pub fn is_attack(&self) -> bool {
        matches!(self, ObjectiveKind::Attack(_))
    }

    pub fn is_defense(&self) -> bool {
        matches!(self, ObjectiveKind::Defense(_))
    }
}
