//! Catalog of expenses: costs, producers and prerequisites
//!
//! Dependency substitution only ever walks from an expense to the structure
//! that produces it or the tech structure it requires. [`TechTreeBuilder::build`]
//! rejects any cycle along those edges, so every substitution chain the
//! arbitrator follows is finite.

use ahash::{AHashMap, AHashSet};
use serde::{Deserialize, Serialize};

use crate::core::error::{EngineError, Result};
use crate::core::types::{AbilityId, UnitKind, UpgradeId};
use crate::requests::pool::Cost;
use crate::requests::request::Expense;

/// A unit or structure type the engine may ask for
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitSpec {
    pub cost: Cost,
    pub is_structure: bool,
    /// Structure that trains this unit (units only)
    pub trained_at: Option<UnitKind>,
    /// Tech structure that must be ready first
    pub requires: Option<UnitKind>,
    /// Ability the producer must have available to train this unit
    pub train_ability: Option<AbilityId>,
    /// How many of this structure may exist (finished plus pending)
    pub max_count: u32,
    /// Supply capacity this provides once finished
    pub supply_provided: u32,
    /// Ticks from order to completion
    pub build_ticks: u64,
}

impl UnitSpec {
    pub fn unit(cost: Cost, trained_at: UnitKind) -> Self {
        Self {
            cost,
            is_structure: false,
            trained_at: Some(trained_at),
            requires: None,
            train_ability: None,
            max_count: u32::MAX,
            supply_provided: 0,
            build_ticks: 60,
        }
    }

    pub fn structure(cost: Cost) -> Self {
        Self {
            cost,
            is_structure: true,
            trained_at: None,
            requires: None,
            train_ability: None,
            max_count: 1,
            supply_provided: 0,
            build_ticks: 100,
        }
    }

    pub fn requires(mut self, tech: UnitKind) -> Self {
        self.requires = Some(tech);
        self
    }

    pub fn train_ability(mut self, ability: AbilityId) -> Self {
        self.train_ability = Some(ability);
        self
    }

    pub fn max_count(mut self, max_count: u32) -> Self {
        self.max_count = max_count;
        self
    }

    pub fn supply_provided(mut self, supply: u32) -> Self {
        self.supply_provided = supply;
        self
    }

    pub fn build_ticks(mut self, ticks: u64) -> Self {
        self.build_ticks = ticks;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpgradeSpec {
    pub cost: Cost,
    pub researched_at: UnitKind,
}

#[derive(Debug, Default)]
pub struct TechTreeBuilder {
    units: AHashMap<UnitKind, UnitSpec>,
    upgrades: AHashMap<UpgradeId, UpgradeSpec>,
}

impl TechTreeBuilder {
    pub fn unit(mut self, kind: UnitKind, spec: UnitSpec) -> Self {
        self.units.insert(kind, spec);
        self
    }

    pub fn upgrade(mut self, upgrade: UpgradeId, cost: Cost, researched_at: UnitKind) -> Self {
        self.upgrades.insert(
            upgrade,
            UpgradeSpec {
                cost,
                researched_at,
            },
        );
        self
    }

    /// Validate references and reject dependency cycles
    pub fn build(self) -> Result<TechTree> {
        let tree = TechTree {
            units: self.units,
            upgrades: self.upgrades,
        };

        for expense in tree.expenses() {
            for dependency in tree.dependencies(expense) {
                if tree.cost(dependency).is_none() {
                    return Err(EngineError::UnknownExpense(dependency));
                }
            }
        }

        let mut finished = AHashSet::new();
        for expense in tree.expenses() {
            let mut on_path = AHashSet::new();
            tree.check_acyclic(expense, &mut on_path, &mut finished)?;
        }

        Ok(tree)
    }
}

#[derive(Debug, Clone, Default)]
pub struct TechTree {
    units: AHashMap<UnitKind, UnitSpec>,
    upgrades: AHashMap<UpgradeId, UpgradeSpec>,
}

impl TechTree {
    pub fn builder() -> TechTreeBuilder {
        TechTreeBuilder::default()
    }

    pub fn unit(&self, kind: UnitKind) -> Option<&UnitSpec> {
        self.units.get(&kind)
    }

    pub fn upgrade(&self, upgrade: UpgradeId) -> Option<&UpgradeSpec> {
        self.upgrades.get(&upgrade)
    }

    pub fn cost(&self, expense: Expense) -> Option<Cost> {
        match expense {
            Expense::Unit(kind) => self.units.get(&kind).map(|s| s.cost),
            Expense::Upgrade(upgrade) => self.upgrades.get(&upgrade).map(|s| s.cost),
        }
    }

    /// Structures a request for `expense` may be substituted with
    pub fn dependencies(&self, expense: Expense) -> Vec<Expense> {
        match expense {
            Expense::Unit(kind) => match self.units.get(&kind) {
                Some(spec) => spec
                    .trained_at
                    .into_iter()
                    .chain(spec.requires)
                    .map(Expense::Unit)
                    .collect(),
                None => Vec::new(),
            },
            Expense::Upgrade(upgrade) => match self.upgrades.get(&upgrade) {
                Some(spec) => vec![Expense::Unit(spec.researched_at)],
                None => Vec::new(),
            },
        }
    }

    /// Longest substitution chain starting at `expense`
    pub fn dependency_depth(&self, expense: Expense) -> usize {
        self.dependencies(expense)
            .into_iter()
            .map(|d| 1 + self.dependency_depth(d))
            .max()
            .unwrap_or(0)
    }

    /// Longest substitution chain anywhere in the tree
    pub fn max_dependency_depth(&self) -> usize {
        self.expenses()
            .into_iter()
            .map(|e| self.dependency_depth(e))
            .max()
            .unwrap_or(0)
    }

    fn expenses(&self) -> Vec<Expense> {
        let mut expenses: Vec<Expense> = self.units.keys().map(|k| Expense::Unit(*k)).collect();
        expenses.extend(self.upgrades.keys().map(|u| Expense::Upgrade(*u)));
        expenses
    }

    fn check_acyclic(
        &self,
        expense: Expense,
        on_path: &mut AHashSet<Expense>,
        finished: &mut AHashSet<Expense>,
    ) -> Result<()> {
        if finished.contains(&expense) {
            return Ok(());
        }
        if !on_path.insert(expense) {
            return Err(EngineError::DependencyCycle(expense));
        }
        for dependency in self.dependencies(expense) {
            self.check_acyclic(dependency, on_path, finished)?;
        }
        on_path.remove(&expense);
        finished.insert(expense);
        Ok(())
    }
}
