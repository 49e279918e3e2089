//! Engine configuration with documented constants
//!
//! All magic numbers are collected here with explanations of their purpose
//! and how they interact with each other. Durations are in ticks; the game
//! loop runs at roughly 22.4 ticks per second.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::error::{EngineError, Result};
use crate::core::types::Urgency;

/// Combat effectiveness scoring
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatorConfig {
    /// Added to both sides of the ratio
    ///
    /// Keeps the ratio finite when a side is empty and damps noise when
    /// both forces are tiny. At 300, a single weak unit barely moves the ratio.
    pub smoothing_constant: f64,

    /// Score multiplier for exceptionally durable unit classes
    pub durable_multiplier: f64,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            smoothing_constant: 300.0,
            durable_multiplier: 2.0,
        }
    }
}

/// Shared objective state machine tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectiveConfig {
    // === STAGING ===
    /// Effectiveness ratio above which staging is skipped entirely
    pub strong_advantage_ratio: f32,
    /// Staging under fire for longer than this escalates to active
    pub staging_under_fire_ticks: u64,
    /// Fraction of held units that must reach the rendezvous
    pub arrival_fraction: f32,
    /// Distance from the rendezvous that counts as "arrived"
    pub rendezvous_radius: f32,
    /// Radius around the rendezvous checked for enemy presence
    pub rendezvous_enemy_radius: f32,
    /// Enemy count at the rendezvous that forces escalation
    pub rendezvous_enemy_count: usize,
    /// A held unit this close to an enemy is "in contact" while staging
    pub front_reach: f32,

    // === ACTIVE ===
    /// Held units re-issue attack orders at this period
    pub attack_refresh_ticks: u64,
    /// An enemy this close to any held unit is part of the local fight
    pub contact_radius: f32,
    /// Held units this close to the contact centroid form the local cluster
    pub cluster_radius: f32,
    /// Local effectiveness below this triggers a retreat
    ///
    /// Only applies while global optimism is below `disengage_optimism_ceiling`
    /// and the local cluster holds at least a third of the group; a strong
    /// army does not turn around over one bad skirmish.
    pub disengage_ratio: f32,
    pub disengage_optimism_ceiling: f32,

    // === RETREATING ===
    /// Local effectiveness above this lets a regrouped force re-engage
    pub recovery_ratio: f32,
    /// Units this close to the group centroid count as regrouped
    pub regroup_radius: f32,
    /// Units this close to the rally point have finished retreating
    pub rally_radius: f32,
    /// Units further than this from the rally point keep moving to it
    pub rally_stop_radius: f32,
    /// Retreating units with at least this attack range fire while moving
    pub kite_min_range: f32,

    // === COMPLETION ===
    /// No enemy seen for this long completes the objective
    pub silence_window_ticks: u64,
}

impl Default for ObjectiveConfig {
    fn default() -> Self {
        Self {
            strong_advantage_ratio: 2.5,
            staging_under_fire_ticks: 45,
            arrival_fraction: 0.75,
            rendezvous_radius: 10.0,
            rendezvous_enemy_radius: 8.0,
            rendezvous_enemy_count: 3,
            front_reach: 20.0,

            attack_refresh_ticks: 45,
            contact_radius: 8.0,
            cluster_radius: 30.0,
            disengage_ratio: 0.75,
            disengage_optimism_ceiling: 1.5,

            recovery_ratio: 3.0,
            regroup_radius: 10.0,
            rally_radius: 10.0,
            rally_stop_radius: 5.0,
            kite_min_range: 4.0,

            silence_window_ticks: 112,
        }
    }
}

/// Attack-specific policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttackConfig {
    /// Never demand more than this many units before committing
    pub minimum_cap: usize,
    /// Held units needed per hostile non-structure unit at the target
    pub minimum_per_enemy: f32,
    /// Target counts as cleared when no known hostile is this close to it
    pub target_clear_radius: f32,
    /// Retreat is over when every held unit is this close to the rally point
    pub retreat_complete_radius: f32,
}

impl Default for AttackConfig {
    fn default() -> Self {
        Self {
            minimum_cap: 20,
            minimum_per_enemy: 0.5,
            target_clear_radius: 10.0,
            retreat_complete_radius: 15.0,
        }
    }
}

/// Defense-specific policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefenseConfig {
    /// Hostiles this close to owned structures are threats
    pub threat_radius: f32,
    /// ...but only when more than this many structures are in reach
    pub threat_structure_count: usize,
    /// Hostiles this close to the rally point are always threats
    pub rally_threat_radius: f32,
    /// Units wanted per threatening enemy
    pub optimum_multiplier: usize,
    /// Workers this close to the threat centroid may be drafted
    pub worker_draft_radius: f32,
    /// Drafting only happens against more than this many enemies
    pub worker_draft_min_enemies: usize,
}

impl Default for DefenseConfig {
    fn default() -> Self {
        Self {
            threat_radius: 20.0,
            threat_structure_count: 1,
            rally_threat_radius: 15.0,
            optimum_multiplier: 2,
            worker_draft_radius: 20.0,
            worker_draft_min_enemies: 2,
        }
    }
}

/// Objective creation triggers
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Attack when supply used exceeds this...
    pub attack_supply_trigger: u32,
    /// ...or when global optimism exceeds this
    pub attack_optimism_trigger: f32,
    pub attack_urgency: Urgency,
    pub defense_urgency: Urgency,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            attack_supply_trigger: 196,
            attack_optimism_trigger: 1.5,
            attack_urgency: Urgency::Medium,
            defense_urgency: Urgency::VeryHigh,
        }
    }
}

/// Request arbitration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArbitratorConfig {
    /// Longest dependency substitution chain followed for one request
    ///
    /// The tech tree is acyclic by construction, so this only guards
    /// against a world collaborator that keeps answering "build X first".
    /// The engine raises it to the tree's own depth when set lower.
    pub max_dependency_depth: usize,
}

impl Default for ArbitratorConfig {
    fn default() -> Self {
        Self {
            max_dependency_depth: 8,
        }
    }
}

/// Complete engine configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub estimator: EstimatorConfig,
    pub objective: ObjectiveConfig,
    pub attack: AttackConfig,
    pub defense: DefenseConfig,
    pub scheduler: SchedulerConfig,
    pub arbitrator: ArbitratorConfig,
}

impl EngineConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from a TOML file; missing fields keep their defaults
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref())?;
        let config = Self::from_toml(&contents)?;
        Ok(config)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<()> {
        if self.estimator.smoothing_constant <= 0.0 {
            return Err(EngineError::InvalidConfig(
                "estimator.smoothing_constant must be positive".into(),
            ));
        }

        let objective = &self.objective;
        if objective.disengage_ratio >= objective.recovery_ratio {
            return Err(EngineError::InvalidConfig(format!(
                "disengage_ratio ({}) should be < recovery_ratio ({})",
                objective.disengage_ratio, objective.recovery_ratio
            )));
        }

        if !(0.0..=1.0).contains(&objective.arrival_fraction) {
            return Err(EngineError::InvalidConfig(format!(
                "arrival_fraction ({}) must be within 0..=1",
                objective.arrival_fraction
            )));
        }

        if self.arbitrator.max_dependency_depth == 0 {
            return Err(EngineError::InvalidConfig(
                "arbitrator.max_dependency_depth must be at least 1".into(),
            ));
        }

        Ok(())
    }
}
