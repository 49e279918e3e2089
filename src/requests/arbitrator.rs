//! Per-tick priority auction over the three resource pools
//!
//! Requests are processed strictly by descending urgency. Each pool keeps an
//! "unaffordable at this urgency" threshold: once something could not be paid
//! for from a pool, nothing of equal or lower urgency that also needs that
//! pool is considered again this tick.

use ahash::AHashSet;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::core::types::Urgency;
use crate::requests::pool::{Pool, ResourcePool};
use crate::requests::request::{DropReason, Expense, Outcome, Request};
use crate::requests::resolve::{resolve, Busy};
use crate::requests::tech::TechTree;
use crate::world::{IssuedCommand, UnitSnapshot, World};

/// What happened to one request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Verdict {
    Fulfilled,
    /// Same expense already handled this tick
    Duplicate,
    BelowThreshold(Pool),
    Unaffordable(Vec<Pool>),
    Dropped(DropReason),
    /// Urgency `None`
    Ignored,
}

#[derive(Debug, Clone, Serialize)]
pub struct RequestReport {
    pub urgency: Urgency,
    /// Expense as submitted
    pub requested: Expense,
    /// Expense after dependency substitution
    pub resolved: Expense,
    pub verdict: Verdict,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ArbitrationReport {
    pub reports: Vec<RequestReport>,
    pub commands: Vec<IssuedCommand>,
    /// Working pool amounts after all deductions
    pub remaining: ResourcePool,
}

impl ArbitrationReport {
    pub fn fulfilled(&self) -> impl Iterator<Item = &RequestReport> {
        self.reports
            .iter()
            .filter(|r| r.verdict == Verdict::Fulfilled)
    }

    pub fn fulfilled_count(&self) -> usize {
        self.fulfilled().count()
    }

    /// Report for the first request that asked for `expense`
    pub fn verdict_for(&self, expense: Expense) -> Option<&Verdict> {
        self.reports
            .iter()
            .find(|r| r.requested == expense)
            .map(|r| &r.verdict)
    }
}

/// Per-pool urgency thresholds for one tick
#[derive(Debug, Default)]
struct Thresholds([Option<Urgency>; 3]);

impl Thresholds {
    fn blocking(&self, urgency: Urgency, mut pools: impl Iterator<Item = Pool>) -> Option<Pool> {
        pools.find(|p| self.0[p.index()].is_some_and(|t| urgency <= t))
    }

    fn record(&mut self, pool: Pool, urgency: Urgency) {
        self.0[pool.index()].get_or_insert(urgency);
    }
}

#[derive(Debug, Clone)]
pub struct RequestArbitrator {
    max_depth: usize,
}

impl Default for RequestArbitrator {
    fn default() -> Self {
        Self::new(8)
    }
}

impl RequestArbitrator {
    pub fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }

    /// Most substitutions one request may go through
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Fulfil as many requests as `pool` allows, highest urgency first
    ///
    /// `pool` is a working copy; the authoritative counters belong to the world.
    /// Units in `claimed` belong to some objective and are never handed work.
    pub async fn arbitrate(
        &self,
        mut requests: Vec<Request>,
        pool: ResourcePool,
        world: &dyn World,
        own: &[UnitSnapshot],
        claimed: &Busy,
        tech: &TechTree,
    ) -> ArbitrationReport {
        // Stable: equal urgencies keep submission order
        requests.sort_by(|a, b| b.urgency.cmp(&a.urgency));

        let mut report = ArbitrationReport {
            remaining: pool,
            ..Default::default()
        };
        let mut thresholds = Thresholds::default();
        let mut checked: AHashSet<Expense> = AHashSet::new();
        let mut busy = claimed.clone();

        info!(
            "Arbitrating {} requests (minerals {}, gas {}, supply {})",
            requests.len(),
            pool.minerals,
            pool.gas,
            pool.supply
        );

        for original in requests {
            let requested = original.expense();
            if original.urgency.is_none() {
                report.reports.push(RequestReport {
                    urgency: original.urgency,
                    requested,
                    resolved: requested,
                    verdict: Verdict::Ignored,
                });
                continue;
            }

            let (request, outcome) = self.follow_chain(original, world, own, &busy, tech).await;
            let resolved = request.expense();
            let verdict = if !checked.insert(resolved) {
                Verdict::Duplicate
            } else {
                match outcome {
                    Outcome::Fulfilled(command) => {
                        self.settle(&request, command, tech, &mut thresholds, &mut busy, &mut report)
                    }
                    Outcome::Dropped(reason) => Verdict::Dropped(reason),
                    // follow_chain never returns an unresolved substitution
                    Outcome::NeedsDependency(_) => Verdict::Dropped(DropReason::DependencyTooDeep),
                }
            };

            match &verdict {
                Verdict::Dropped(reason) if reason.is_unresolvable() => {
                    warn!(
                        "{:?} request for {:?} dropped: {:?}",
                        request.urgency, resolved, reason
                    );
                }
                _ => debug!(
                    "{:?} request for {:?} (as {:?}): {:?}",
                    request.urgency, requested, resolved, verdict
                ),
            }

            report.reports.push(RequestReport {
                urgency: request.urgency,
                requested,
                resolved,
                verdict,
            });
        }

        report
    }

    /// Resolve, replacing the request with its prerequisite until it settles
    async fn follow_chain(
        &self,
        mut request: Request,
        world: &dyn World,
        own: &[UnitSnapshot],
        busy: &Busy,
        tech: &TechTree,
    ) -> (Request, Outcome) {
        for _ in 0..=self.max_depth {
            match resolve(&request, world, own, busy, tech).await {
                Outcome::NeedsDependency(dependency) => {
                    debug!(
                        "Replacing request for {:?} with {:?}",
                        request.expense(),
                        dependency.expense()
                    );
                    request = dependency;
                }
                outcome => return (request, outcome),
            }
        }
        (request, Outcome::Dropped(DropReason::DependencyTooDeep))
    }

    /// Threshold and affordability checks for a request that has a command
    fn settle(
        &self,
        request: &Request,
        command: IssuedCommand,
        tech: &TechTree,
        thresholds: &mut Thresholds,
        busy: &mut Busy,
        report: &mut ArbitrationReport,
    ) -> Verdict {
        let Some(cost) = tech.cost(request.expense()) else {
            return Verdict::Dropped(DropReason::UnknownExpense);
        };

        if let Some(pool) = thresholds.blocking(request.urgency, cost.pools()) {
            return Verdict::BelowThreshold(pool);
        }

        let shortfalls = report.remaining.shortfalls(&cost);
        if !shortfalls.is_empty() {
            for pool in &shortfalls {
                thresholds.record(*pool, request.urgency);
            }
            return Verdict::Unaffordable(shortfalls);
        }

        report.remaining.deduct(&cost);
        busy.insert(command.unit);
        report.commands.push(command);
        Verdict::Fulfilled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{UnitId, UnitKind, Vec2};
    use crate::requests::pool::Cost;
    use crate::requests::tech::UnitSpec;
    use crate::world::SandboxWorld;

    const BASE: UnitKind = UnitKind(1);
    const WORKER: UnitKind = UnitKind(2);
    const BARRACKS: UnitKind = UnitKind(3);
    const SOLDIER: UnitKind = UnitKind(4);
    const SCOUT: UnitKind = UnitKind(5);

    fn tech() -> TechTree {
        TechTree::builder()
            .unit(BASE, UnitSpec::structure(Cost::new(400, 0, 0)))
            .unit(WORKER, UnitSpec::unit(Cost::new(50, 0, 1), BASE))
            .unit(BARRACKS, UnitSpec::structure(Cost::new(150, 0, 0)).max_count(2))
            .unit(SOLDIER, UnitSpec::unit(Cost::new(50, 0, 2), BARRACKS))
            .unit(SCOUT, UnitSpec::unit(Cost::new(25, 0, 1), BARRACKS))
            .build()
            .expect("valid tree")
    }

    fn world() -> SandboxWorld {
        let mut world = SandboxWorld::new();
        world.add_own(UnitSnapshot::structure(UnitId(1), BASE, Vec2::new(0.0, 0.0)));
        world.add_own(UnitSnapshot::structure(UnitId(2), BARRACKS, Vec2::new(10.0, 0.0)));
        world.add_own(UnitSnapshot::worker(UnitId(3), WORKER, Vec2::new(2.0, 0.0)));
        world
    }

    #[tokio::test]
    async fn test_duplicate_expense_skipped() {
        let world = world();
        let own = world.own_units();
        let requests = vec![
            Request::train(SOLDIER, Urgency::High),
            Request::train(SOLDIER, Urgency::Low),
        ];
        let report = RequestArbitrator::default()
            .arbitrate(
                requests,
                ResourcePool::new(500, 0, 10),
                &world,
                &own,
                &Busy::new(),
                &tech(),
            )
            .await;
        assert_eq!(report.reports[0].verdict, Verdict::Fulfilled);
        assert_eq!(report.reports[1].verdict, Verdict::Duplicate);
        assert_eq!(report.commands.len(), 1);
    }

    #[tokio::test]
    async fn test_threshold_blocks_lower_urgency() {
        let world = world();
        let own = world.own_units();
        // Soldier can't be paid for; the worker at lower urgency must not jump the queue
        let requests = vec![
            Request::train(WORKER, Urgency::Low),
            Request::train(SOLDIER, Urgency::High),
        ];
        let report = RequestArbitrator::default()
            .arbitrate(
                requests,
                ResourcePool::new(49, 0, 10),
                &world,
                &own,
                &Busy::new(),
                &tech(),
            )
            .await;
        assert_eq!(
            report.verdict_for(Expense::Unit(SOLDIER)),
            Some(&Verdict::Unaffordable(vec![Pool::Minerals]))
        );
        assert_eq!(
            report.verdict_for(Expense::Unit(WORKER)),
            Some(&Verdict::BelowThreshold(Pool::Minerals))
        );
        assert!(report.commands.is_empty());
    }

    #[tokio::test]
    async fn test_none_urgency_ignored() {
        let world = world();
        let own = world.own_units();
        let report = RequestArbitrator::default()
            .arbitrate(
                vec![Request::train(WORKER, Urgency::None)],
                ResourcePool::new(500, 0, 10),
                &world,
                &own,
                &Busy::new(),
                &tech(),
            )
            .await;
        assert_eq!(report.reports[0].verdict, Verdict::Ignored);
        assert!(report.commands.is_empty());
    }

    #[tokio::test]
    async fn test_substitution_is_reported_and_paid() {
        let mut world = SandboxWorld::new();
        world.add_own(UnitSnapshot::structure(UnitId(1), BASE, Vec2::new(0.0, 0.0)));
        world.add_own(UnitSnapshot::worker(UnitId(3), WORKER, Vec2::new(2.0, 0.0)));
        let own = world.own_units();
        let report = RequestArbitrator::default()
            .arbitrate(
                vec![Request::train(SOLDIER, Urgency::Medium)],
                ResourcePool::new(200, 0, 10),
                &world,
                &own,
                &Busy::new(),
                &tech(),
            )
            .await;
        let entry = &report.reports[0];
        assert_eq!(entry.requested, Expense::Unit(SOLDIER));
        assert_eq!(entry.resolved, Expense::Unit(BARRACKS));
        assert_eq!(entry.verdict, Verdict::Fulfilled);
        assert_eq!(report.remaining.minerals, 50);
    }

    #[tokio::test]
    async fn test_producer_used_once_per_tick() {
        let world = world();
        let own = world.own_units();
        let requests = vec![
            Request::train(SOLDIER, Urgency::High),
            Request::train(SCOUT, Urgency::Medium),
        ];
        let report = RequestArbitrator::default()
            .arbitrate(
                requests,
                ResourcePool::new(1000, 0, 10),
                &world,
                &own,
                &Busy::new(),
                &tech(),
            )
            .await;
        // The only barracks is taken, so the scout turns into a second barracks
        assert_eq!(report.fulfilled_count(), 2);
        assert_eq!(report.reports[1].resolved, Expense::Unit(BARRACKS));
        let units: AHashSet<UnitId> = report.commands.iter().map(|c| c.unit).collect();
        assert_eq!(units.len(), 2);
    }

    #[tokio::test]
    async fn test_claimed_worker_is_not_given_a_build() {
        let mut world = SandboxWorld::new();
        world.add_own(UnitSnapshot::structure(UnitId(1), BASE, Vec2::new(0.0, 0.0)));
        world.add_own(UnitSnapshot::worker(UnitId(3), WORKER, Vec2::new(2.0, 0.0)));
        let own = world.own_units();
        let claimed: Busy = [UnitId(3)].into_iter().collect();

        let report = RequestArbitrator::default()
            .arbitrate(
                vec![Request::build(BARRACKS, Urgency::Low)],
                ResourcePool::new(500, 0, 10),
                &world,
                &own,
                &claimed,
                &tech(),
            )
            .await;
        assert_eq!(report.reports[0].verdict, Verdict::Dropped(DropReason::NoBuilder));
        assert!(report.commands.is_empty());
        assert_eq!(report.remaining.minerals, 500);
    }
}
