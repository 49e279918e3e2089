//! Requests producers submit each tick, and what resolving one yields

use serde::{Deserialize, Serialize};

use crate::core::types::{UnitKind, UpgradeId, Urgency, Vec2};
use crate::world::IssuedCommand;

/// The resource-tagged thing a request wants to spend on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Expense {
    Unit(UnitKind),
    Upgrade(UpgradeId),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RequestKind {
    /// Train a unit at a production structure
    Train(UnitKind),
    /// Construct a structure; `at` forces the spot, `near` hints placement
    Build {
        kind: UnitKind,
        near: Option<Vec2>,
        at: Option<Vec2>,
    },
    Research(UpgradeId),
    /// Take a new base location
    Expand { kind: UnitKind, at: Vec2 },
}

/// An intent to consume resources, valid for one tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub urgency: Urgency,
    pub kind: RequestKind,
}

impl Request {
    pub fn train(kind: UnitKind, urgency: Urgency) -> Self {
        Self {
            urgency,
            kind: RequestKind::Train(kind),
        }
    }

    pub fn build(kind: UnitKind, urgency: Urgency) -> Self {
        Self {
            urgency,
            kind: RequestKind::Build {
                kind,
                near: None,
                at: None,
            },
        }
    }

    pub fn build_near(kind: UnitKind, near: Vec2, urgency: Urgency) -> Self {
        Self {
            urgency,
            kind: RequestKind::Build {
                kind,
                near: Some(near),
                at: None,
            },
        }
    }

    pub fn build_at(kind: UnitKind, at: Vec2, urgency: Urgency) -> Self {
        Self {
            urgency,
            kind: RequestKind::Build {
                kind,
                near: None,
                at: Some(at),
            },
        }
    }

    pub fn research(upgrade: UpgradeId, urgency: Urgency) -> Self {
        Self {
            urgency,
            kind: RequestKind::Research(upgrade),
        }
    }

    pub fn expand(kind: UnitKind, at: Vec2, urgency: Urgency) -> Self {
        Self {
            urgency,
            kind: RequestKind::Expand { kind, at },
        }
    }

    pub fn expense(&self) -> Expense {
        match &self.kind {
            RequestKind::Train(kind) => Expense::Unit(*kind),
            RequestKind::Build { kind, .. } => Expense::Unit(*kind),
            RequestKind::Research(upgrade) => Expense::Upgrade(*upgrade),
            RequestKind::Expand { kind, .. } => Expense::Unit(*kind),
        }
    }

    pub fn target(&self) -> Option<Vec2> {
        match &self.kind {
            RequestKind::Build { at, near, .. } => at.or(*near),
            RequestKind::Expand { at, .. } => Some(*at),
            _ => None,
        }
    }
}

/// Why a request could not be turned into a command this tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DropReason {
    UnknownExpense,
    /// No valid spot for the structure
    NoPlacement,
    NoBuilder,
    /// Every producer is occupied and no more may be built
    ProducersBusy,
    /// Required tech structure exists or is coming, but isn't ready
    AwaitingTech,
    AbilityUnavailable,
    AlreadyPending,
    /// Substitution chain exceeded its bound
    DependencyTooDeep,
}

impl DropReason {
    /// Conditions worth a warning rather than routine deferral
    pub fn is_unresolvable(self) -> bool {
        matches!(
            self,
            DropReason::UnknownExpense
                | DropReason::NoPlacement
                | DropReason::NoBuilder
                | DropReason::DependencyTooDeep
        )
    }
}

/// Result of resolving one request against the world
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Fulfilled(IssuedCommand),
    /// A prerequisite must come first; resolve this instead
    NeedsDependency(Request),
    Dropped(DropReason),
}
