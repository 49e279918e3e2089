//! Turning one request into a concrete command, or a prerequisite
//!
//! Resolution never spends anything; affordability is the arbitrator's job.
//! The two world queries that may suspend (ability availability and
//! structure placement) are only awaited here.

use ahash::AHashSet;
use ordered_float::OrderedFloat;

use crate::core::types::{UnitId, UnitKind, UpgradeId, Urgency, Vec2};
use crate::requests::request::{DropReason, Outcome, Request, RequestKind};
use crate::requests::tech::{TechTree, UnitSpec};
use crate::world::{Command, IssuedCommand, UnitSnapshot, World};

/// Units already given work earlier in the same tick
pub type Busy = AHashSet<UnitId>;

pub async fn resolve(
    request: &Request,
    world: &dyn World,
    own: &[UnitSnapshot],
    busy: &Busy,
    tech: &TechTree,
) -> Outcome {
    let resolver = Resolver {
        world,
        own,
        busy,
        tech,
        urgency: request.urgency,
    };
    match &request.kind {
        RequestKind::Train(kind) => resolver.train(*kind).await,
        RequestKind::Build { kind, near, at } => resolver.build(*kind, *near, *at, true).await,
        RequestKind::Research(upgrade) => resolver.research(*upgrade),
        RequestKind::Expand { kind, at } => resolver.build(*kind, None, Some(*at), false).await,
    }
}

struct Resolver<'a> {
    world: &'a dyn World,
    own: &'a [UnitSnapshot],
    busy: &'a Busy,
    tech: &'a TechTree,
    urgency: Urgency,
}

impl<'a> Resolver<'a> {
    async fn train(&self, kind: UnitKind) -> Outcome {
        let Some(spec) = self.tech.unit(kind) else {
            return Outcome::Dropped(DropReason::UnknownExpense);
        };
        if spec.is_structure {
            return self.build(kind, None, None, true).await;
        }
        if let Some(outcome) = self.missing_tech(spec) {
            return outcome;
        }
        let Some(producer_kind) = spec.trained_at else {
            return Outcome::Dropped(DropReason::UnknownExpense);
        };

        let mut ability_blocked = false;
        for producer in self.available(producer_kind) {
            if let Some(ability) = spec.train_ability {
                if !self.world.ability_available(producer.id, ability).await {
                    ability_blocked = true;
                    continue;
                }
            }
            return Outcome::Fulfilled(IssuedCommand::new(producer.id, Command::Train(kind)));
        }

        if ability_blocked {
            return Outcome::Dropped(DropReason::AbilityUnavailable);
        }
        self.more_producers(producer_kind)
    }

    async fn build(
        &self,
        kind: UnitKind,
        near: Option<Vec2>,
        at: Option<Vec2>,
        enforce_limit: bool,
    ) -> Outcome {
        let Some(spec) = self.tech.unit(kind) else {
            return Outcome::Dropped(DropReason::UnknownExpense);
        };
        if let Some(outcome) = self.missing_tech(spec) {
            return outcome;
        }
        if enforce_limit && self.total(kind) >= spec.max_count {
            return Outcome::Dropped(DropReason::AlreadyPending);
        }

        let spot = match at {
            Some(spot) => Some(spot),
            None => {
                let hint = near.unwrap_or_else(|| self.world.rally_point());
                self.world.find_placement(kind, hint).await
            }
        };
        let Some(spot) = spot else {
            return Outcome::Dropped(DropReason::NoPlacement);
        };

        match self.builder_for(spot) {
            Some(builder) => Outcome::Fulfilled(IssuedCommand::new(
                builder,
                Command::Build { kind, at: spot },
            )),
            None => Outcome::Dropped(DropReason::NoBuilder),
        }
    }

    fn research(&self, upgrade: UpgradeId) -> Outcome {
        let Some(spec) = self.tech.upgrade(upgrade) else {
            return Outcome::Dropped(DropReason::UnknownExpense);
        };
        if self.world.upgrade_pending(upgrade) {
            return Outcome::Dropped(DropReason::AlreadyPending);
        }
        match self.available(spec.researched_at).next() {
            Some(lab) => Outcome::Fulfilled(IssuedCommand::new(lab.id, Command::Research(upgrade))),
            None => self.more_producers(spec.researched_at),
        }
    }

    /// Prerequisite structure check: satisfied, coming, or to be built
    fn missing_tech(&self, spec: &UnitSpec) -> Option<Outcome> {
        let required = spec.requires?;
        if self.own.iter().any(|u| u.kind == required && u.is_ready) {
            return None;
        }
        if self.total(required) > 0 {
            return Some(Outcome::Dropped(DropReason::AwaitingTech));
        }
        Some(Outcome::NeedsDependency(Request::build(
            required,
            self.urgency,
        )))
    }

    /// No idle producer: ask for another one if the limit allows
    fn more_producers(&self, producer_kind: UnitKind) -> Outcome {
        let limit = self.tech.unit(producer_kind).map_or(0, |s| s.max_count);
        let total = self.total(producer_kind);
        if total < limit {
            return Outcome::NeedsDependency(Request::build(producer_kind, self.urgency));
        }
        let any_ready = self
            .own
            .iter()
            .any(|u| u.kind == producer_kind && u.is_ready);
        if any_ready {
            Outcome::Dropped(DropReason::ProducersBusy)
        } else {
            Outcome::Dropped(DropReason::AwaitingTech)
        }
    }

    fn available(&self, kind: UnitKind) -> impl Iterator<Item = &'a UnitSnapshot> + '_ {
        self.own
            .iter()
            .filter(move |u| u.kind == kind && u.is_ready && u.is_idle)
            .filter(move |u| !self.busy.contains(&u.id))
    }

    /// Existing (finished or not) plus ordered
    fn total(&self, kind: UnitKind) -> u32 {
        let existing = self.own.iter().filter(|u| u.kind == kind).count() as u32;
        existing + self.world.pending(kind)
    }

    /// Closest free worker, preferring ones that are idle or gathering
    fn builder_for(&self, spot: Vec2) -> Option<UnitId> {
        self.own
            .iter()
            .filter(|u| u.is_worker && u.is_ready && !self.busy.contains(&u.id))
            .min_by_key(|u| {
                (
                    !(u.is_idle || u.is_gathering),
                    OrderedFloat(u.position.distance(&spot)),
                    u.id,
                )
            })
            .map(|u| u.id)
    }
}
