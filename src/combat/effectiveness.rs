//! Combat effectiveness estimation
//!
//! Scores each force as the sum of damage × durability over its units and
//! compares the two as a smoothed ratio. Cheap enough to call many times per
//! tick: one linear pass over each side, no world queries.

use crate::core::config::EstimatorConfig;
use crate::world::UnitSnapshot;

/// Per-call exclusions applied to both forces before scoring
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ForceFilter {
    pub exclude_workers: bool,
    pub exclude_structures: bool,
    /// Units dealing less damage than this are ignored
    pub min_damage: f32,
}

impl ForceFilter {
    /// Count everything
    pub fn all() -> Self {
        Self::default()
    }

    /// Army-only comparison: no workers, no structures
    pub fn army() -> Self {
        Self {
            exclude_workers: true,
            exclude_structures: true,
            min_damage: 0.0,
        }
    }

    pub fn admits(&self, unit: &UnitSnapshot) -> bool {
        !(self.exclude_workers && unit.is_worker)
            && !(self.exclude_structures && unit.is_structure)
            && unit.damage >= self.min_damage
    }
}

#[derive(Debug, Clone)]
pub struct CombatEstimator {
    smoothing: f64,
    durable_multiplier: f64,
}

impl Default for CombatEstimator {
    fn default() -> Self {
        Self::new(&EstimatorConfig::default())
    }
}

impl CombatEstimator {
    pub fn new(config: &EstimatorConfig) -> Self {
        Self {
            smoothing: config.smoothing_constant,
            durable_multiplier: config.durable_multiplier,
        }
    }

    /// Raw power of one unit
    pub fn unit_score(&self, unit: &UnitSnapshot) -> f64 {
        let base = unit.damage.max(0.0) as f64 * unit.health.max(0.0) as f64;
        if unit.is_durable {
            base * self.durable_multiplier
        } else {
            base
        }
    }

    pub fn score<'a, I>(&self, units: I, filter: &ForceFilter) -> f64
    where
        I: IntoIterator<Item = &'a UnitSnapshot>,
    {
        units
            .into_iter()
            .filter(|u| filter.admits(u))
            .map(|u| self.unit_score(u))
            .sum()
    }

    /// Relative power of `ours` against `theirs`, counting every unit
    ///
    /// Above 1 favours `ours`. `effectiveness(a, b) == 1 / effectiveness(b, a)`.
    pub fn effectiveness<'a, A, B>(&self, ours: A, theirs: B) -> f32
    where
        A: IntoIterator<Item = &'a UnitSnapshot>,
        B: IntoIterator<Item = &'a UnitSnapshot>,
    {
        self.effectiveness_filtered(ours, theirs, &ForceFilter::all())
    }

    pub fn effectiveness_filtered<'a, A, B>(&self, ours: A, theirs: B, filter: &ForceFilter) -> f32
    where
        A: IntoIterator<Item = &'a UnitSnapshot>,
        B: IntoIterator<Item = &'a UnitSnapshot>,
    {
        let ours = self.score(ours, filter);
        let theirs = self.score(theirs, filter);
        ((ours + self.smoothing) / (theirs + self.smoothing)) as f32
    }
}
