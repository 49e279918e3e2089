//! World collaborator interface
//!
//! The engine never touches the game directly. Perception comes in through
//! [`World`] as per-tick snapshots; decisions go out as [`IssuedCommand`]s
//! that the world carries out.

pub mod geometry;
pub mod intel;
pub mod sandbox;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::types::{AbilityId, Tick, UnitId, UnitKind, UpgradeId, Vec2};
use crate::requests::ResourcePool;

pub use intel::Intel;
pub use sandbox::SandboxWorld;

/// A unit or structure as seen this tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitSnapshot {
    pub id: UnitId,
    pub kind: UnitKind,
    pub position: Vec2,
    /// Hit points plus shields
    pub health: f32,
    /// Damage per second against ground targets
    pub damage: f32,
    pub range: f32,
    /// Seconds until the weapon can fire again (0 = ready)
    pub weapon_cooldown: f32,
    pub is_structure: bool,
    /// Main base structure (town hall)
    pub is_base: bool,
    pub is_worker: bool,
    /// Exceptionally durable unit class (scored with a multiplier)
    pub is_durable: bool,
    /// Finished construction/training
    pub is_ready: bool,
    pub is_idle: bool,
    pub is_gathering: bool,
    /// False for remembered hostiles whose last position is out of vision
    pub visible: bool,
    /// Unit this one is currently attacking
    pub engaged_target: Option<UnitId>,
}

impl UnitSnapshot {
    /// A ready, idle, visible combat unit with modest stats
    pub fn new(id: UnitId, kind: UnitKind, position: Vec2) -> Self {
        Self {
            id,
            kind,
            position,
            health: 100.0,
            damage: 10.0,
            range: 1.0,
            weapon_cooldown: 0.0,
            is_structure: false,
            is_base: false,
            is_worker: false,
            is_durable: false,
            is_ready: true,
            is_idle: true,
            is_gathering: false,
            visible: true,
            engaged_target: None,
        }
    }

    /// A ready structure with no weapon
    pub fn structure(id: UnitId, kind: UnitKind, position: Vec2) -> Self {
        Self {
            damage: 0.0,
            health: 1000.0,
            range: 0.0,
            is_structure: true,
            ..Self::new(id, kind, position)
        }
    }

    /// A gathering worker
    pub fn worker(id: UnitId, kind: UnitKind, position: Vec2) -> Self {
        Self {
            damage: 5.0,
            health: 40.0,
            is_worker: true,
            is_idle: false,
            is_gathering: true,
            ..Self::new(id, kind, position)
        }
    }

    pub fn is_combat(&self) -> bool {
        !self.is_structure && !self.is_worker
    }
}

/// Selection of own units a claimant is interested in
#[derive(Debug, Clone, PartialEq, Default)]
pub enum UnitFilter {
    /// Ready non-worker, non-structure units
    #[default]
    Combat,
    /// Ready workers
    Workers,
    /// Ready units of the listed kinds
    Kinds(Vec<UnitKind>),
}

impl UnitFilter {
    pub fn matches(&self, unit: &UnitSnapshot) -> bool {
        if !unit.is_ready || unit.is_structure {
            return false;
        }
        match self {
            UnitFilter::Combat => !unit.is_worker,
            UnitFilter::Workers => unit.is_worker,
            UnitFilter::Kinds(kinds) => kinds.contains(&unit.kind),
        }
    }
}

/// What a unit is told to do
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Command {
    Move(Vec2),
    /// Move, engaging anything met on the way
    AttackMove(Vec2),
    Attack(UnitId),
    Stop,
    Train(UnitKind),
    Build { kind: UnitKind, at: Vec2 },
    Research(UpgradeId),
    UseAbility(AbilityId),
}

/// A command addressed to one unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssuedCommand {
    pub unit: UnitId,
    pub command: Command,
    /// Appended after the unit's current orders instead of replacing them
    pub queued: bool,
}

impl IssuedCommand {
    pub fn new(unit: UnitId, command: Command) -> Self {
        Self {
            unit,
            command,
            queued: false,
        }
    }
}

/// Commands collected during a tick, flushed to the world at its end
#[derive(Debug, Clone, Default)]
pub struct CommandBuffer {
    commands: Vec<IssuedCommand>,
}

impl CommandBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&mut self, unit: UnitId, command: Command) {
        self.commands.push(IssuedCommand::new(unit, command));
    }

    pub fn queue(&mut self, unit: UnitId, command: Command) {
        self.commands.push(IssuedCommand {
            unit,
            command,
            queued: true,
        });
    }

    pub fn push(&mut self, command: IssuedCommand) {
        self.commands.push(command);
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &IssuedCommand> {
        self.commands.iter()
    }

    /// Commands addressed to one unit, in issue order
    pub fn for_unit(&self, unit: UnitId) -> Vec<&Command> {
        self.commands
            .iter()
            .filter(|c| c.unit == unit)
            .map(|c| &c.command)
            .collect()
    }

    pub fn drain(&mut self) -> Vec<IssuedCommand> {
        std::mem::take(&mut self.commands)
    }
}

/// Perception and command sink provided by the game host
///
/// Enumeration methods return snapshots valid for the current tick only.
/// The two async queries are the engine's only suspension points.
#[async_trait]
pub trait World: Send + Sync {
    fn current_tick(&self) -> Tick;

    /// Authoritative resource counters (supply as remaining headroom)
    fn resources(&self) -> ResourcePool;

    fn supply_used(&self) -> u32;

    fn supply_cap(&self) -> u32;

    /// All friendly units and structures
    fn own_units(&self) -> Vec<UnitSnapshot>;

    /// Hostile units and structures currently in vision
    fn visible_enemies(&self) -> Vec<UnitSnapshot>;

    fn is_visible(&self, position: Vec2) -> bool;

    /// Designated safe point for idle and retreating units
    fn rally_point(&self) -> Vec2;

    fn enemy_start(&self) -> Vec2;

    /// Units or structures of this kind ordered but not yet finished
    fn pending(&self, kind: UnitKind) -> u32;

    /// Upgrade already researched or in progress
    fn upgrade_pending(&self, upgrade: UpgradeId) -> bool;

    /// Whether `unit` can use `ability` right now
    async fn ability_available(&self, unit: UnitId, ability: AbilityId) -> bool;

    /// A valid location for a new structure near `near`
    async fn find_placement(&self, kind: UnitKind, near: Vec2) -> Option<Vec2>;

    /// Carry out commands issued during the tick
    fn execute(&mut self, commands: Vec<IssuedCommand>);
}
