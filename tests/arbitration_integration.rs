//! Request arbitration integration tests
//!
//! Covers the priority auction end to end against the sandbox world: the
//! pool-threshold scenario, dependency substitution through the tech tree,
//! and urgency monotonicity over random request sets.

use proptest::prelude::*;

use skirmish_engine::allocation::AllocationRegistry;

use skirmish_engine::core::types::{UnitId, UnitKind, Urgency, Vec2};
use skirmish_engine::requests::{
    Busy, Cost, DropReason, Expense, Pool, Request, RequestArbitrator, ResourcePool, TechTree,
    UnitSpec, Verdict,
};
use skirmish_engine::world::{Command, SandboxWorld, UnitSnapshot, World};

const BASE: UnitKind = UnitKind(1);
const WORKER: UnitKind = UnitKind(2);
const BARRACKS: UnitKind = UnitKind(3);
const HEAVY: UnitKind = UnitKind(4);
const LIGHT: UnitKind = UnitKind(5);

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("runtime")
}

#[tokio::test]
async fn test_mineral_shortfall_does_not_block_supply_only_request() {
    let tech = TechTree::builder()
        .unit(BARRACKS, UnitSpec::structure(Cost::new(150, 0, 0)))
        .unit(HEAVY, UnitSpec::unit(Cost::new(100, 0, 1), BARRACKS))
        .unit(LIGHT, UnitSpec::unit(Cost::new(0, 0, 1), BARRACKS))
        .build()
        .expect("valid tree");
    let mut world = SandboxWorld::new();
    world.add_own(UnitSnapshot::structure(UnitId(1), BARRACKS, Vec2::default()));
    let own = world.own_units();

    let requests = vec![
        Request::train(LIGHT, Urgency::from_level(3)),
        Request::train(HEAVY, Urgency::from_level(8)),
    ];
    let report = RequestArbitrator::default()
        .arbitrate(
            requests,
            ResourcePool::new(0, 0, 5),
            &world,
            &own,
            &Busy::new(),
            &tech,
        )
        .await;

    assert_eq!(
        report.verdict_for(Expense::Unit(HEAVY)),
        Some(&Verdict::Unaffordable(vec![Pool::Minerals]))
    );
    assert_eq!(report.verdict_for(Expense::Unit(LIGHT)), Some(&Verdict::Fulfilled));
    assert_eq!(report.commands.len(), 1);
    assert_eq!(report.commands[0].command, Command::Train(LIGHT));
    assert_eq!(report.remaining, ResourcePool::new(0, 0, 4));
}

#[tokio::test]
async fn test_missing_placement_drops_and_frees_the_pool() {
    let tech = TechTree::builder()
        .unit(BASE, UnitSpec::structure(Cost::new(400, 0, 0)))
        .unit(WORKER, UnitSpec::unit(Cost::new(50, 0, 1), BASE))
        .unit(BARRACKS, UnitSpec::structure(Cost::new(150, 0, 0)))
        .build()
        .expect("valid tree");
    let mut world = SandboxWorld::new();
    world.add_own(UnitSnapshot::structure(UnitId(1), BASE, Vec2::default()));
    world.add_own(UnitSnapshot::worker(UnitId(2), WORKER, Vec2::new(2.0, 0.0)));
    world.block_placement(true);
    let own = world.own_units();

    let requests = vec![
        Request::build(BARRACKS, Urgency::High),
        Request::train(WORKER, Urgency::Low),
    ];
    let report = RequestArbitrator::default()
        .arbitrate(
            requests,
            ResourcePool::new(160, 0, 5),
            &world,
            &own,
            &Busy::new(),
            &tech,
        )
        .await;

    // The drop is not a resource failure, so nothing lower is held back
    assert_eq!(
        report.verdict_for(Expense::Unit(BARRACKS)),
        Some(&Verdict::Dropped(DropReason::NoPlacement))
    );
    assert_eq!(report.verdict_for(Expense::Unit(WORKER)), Some(&Verdict::Fulfilled));
    assert_eq!(report.remaining.minerals, 110);
}

#[tokio::test]
async fn test_chain_builds_missing_tech_first() {
    const ARMORY: UnitKind = UnitKind(6);
    let tech = TechTree::builder()
        .unit(BASE, UnitSpec::structure(Cost::new(400, 0, 0)))
        .unit(WORKER, UnitSpec::unit(Cost::new(50, 0, 1), BASE))
        .unit(BARRACKS, UnitSpec::structure(Cost::new(150, 0, 0)))
        .unit(ARMORY, UnitSpec::structure(Cost::new(125, 0, 0)).requires(BARRACKS))
        .unit(HEAVY, UnitSpec::unit(Cost::new(100, 0, 2), BARRACKS).requires(ARMORY))
        .build()
        .expect("valid tree");
    let mut world = SandboxWorld::new().with_tech(tech.clone());
    world.add_own(UnitSnapshot::structure(UnitId(1), BASE, Vec2::default()));
    world.add_own(UnitSnapshot::worker(UnitId(2), WORKER, Vec2::new(2.0, 0.0)));
    let own = world.own_units();

    let report = RequestArbitrator::default()
        .arbitrate(
            vec![Request::train(HEAVY, Urgency::Medium)],
            ResourcePool::new(500, 0, 10),
            &world,
            &own,
            &Busy::new(),
            &tech,
        )
        .await;

    // Neither barracks nor armory exists; the deepest missing piece is built
    let entry = &report.reports[0];
    assert_eq!(entry.resolved, Expense::Unit(BARRACKS));
    assert_eq!(entry.verdict, Verdict::Fulfilled);
    assert!(matches!(
        report.commands[0].command,
        Command::Build { kind: BARRACKS, .. }
    ));
}

#[tokio::test]
async fn test_worker_held_by_defense_is_left_alone() {
    let tech = TechTree::builder()
        .unit(BASE, UnitSpec::structure(Cost::new(400, 0, 0)))
        .unit(WORKER, UnitSpec::unit(Cost::new(50, 0, 1), BASE))
        .unit(BARRACKS, UnitSpec::structure(Cost::new(150, 0, 0)))
        .build()
        .expect("valid tree");
    let mut world = SandboxWorld::new();
    world.add_own(UnitSnapshot::structure(UnitId(1), BASE, Vec2::default()));
    world.add_own(UnitSnapshot::worker(UnitId(2), WORKER, Vec2::new(2.0, 0.0)));
    world.add_own(UnitSnapshot::worker(UnitId(3), WORKER, Vec2::new(40.0, 0.0)));
    let own = world.own_units();

    let mut registry = AllocationRegistry::new();
    let defense = registry.register("defense", Urgency::VeryHigh);
    registry.take(&[UnitId(2)], defense);

    let report = RequestArbitrator::default()
        .arbitrate(
            vec![Request::build(BARRACKS, Urgency::Low)],
            ResourcePool::new(400, 0, 5),
            &world,
            &own,
            &registry.held_ids(),
            &tech,
        )
        .await;

    // The nearer worker is drafted, so the far one builds
    assert_eq!(report.verdict_for(Expense::Unit(BARRACKS)), Some(&Verdict::Fulfilled));
    assert_eq!(report.commands.len(), 1);
    assert_eq!(report.commands[0].unit, UnitId(3));

    registry.take(&[UnitId(3)], defense);
    let report = RequestArbitrator::default()
        .arbitrate(
            vec![Request::build(BARRACKS, Urgency::Low)],
            ResourcePool::new(400, 0, 5),
            &world,
            &own,
            &registry.held_ids(),
            &tech,
        )
        .await;
    assert_eq!(
        report.verdict_for(Expense::Unit(BARRACKS)),
        Some(&Verdict::Dropped(DropReason::NoBuilder))
    );
    assert!(report.commands.is_empty());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// A lower request never gets through a pool a higher one could not pay from
    #[test]
    fn prop_urgency_monotonic(
        asks in prop::collection::vec(
            (0u32..300, prop_oneof![Just(0u32), 1u32..100], 0u32..3, 1i32..=9),
            1..8,
        ),
        minerals in 0u32..600,
        gas in 0u32..150,
        supply in 0u32..8,
    ) {
        // One kind and one producer per request, so nothing collides
        let mut builder = TechTree::builder();
        let mut world = SandboxWorld::new();
        let mut requests = Vec::new();
        for (i, (m, g, s, level)) in asks.iter().enumerate() {
            let producer = UnitKind(100 + i as u32);
            let kind = UnitKind(1 + i as u32);
            builder = builder
                .unit(producer, UnitSpec::structure(Cost::new(150, 0, 0)))
                .unit(kind, UnitSpec::unit(Cost::new(*m, *g, *s), producer));
            world.add_own(UnitSnapshot::structure(UnitId(100 + i as u64), producer, Vec2::default()));
            requests.push(Request::train(kind, Urgency::from_level(*level)));
        }
        let tech = builder.build().expect("valid tree");
        let own = world.own_units();

        let report = runtime().block_on(RequestArbitrator::default().arbitrate(
            requests,
            ResourcePool::new(minerals, gas, supply),
            &world,
            &own,
            &Busy::new(),
            &tech,
        ));

        for low in report.reports.iter().filter(|r| r.verdict == Verdict::Fulfilled) {
            let low_cost = tech.cost(low.resolved).expect("known expense");
            for high in report.reports.iter().filter(|r| r.urgency > low.urgency) {
                let failed_on: Vec<Pool> = match &high.verdict {
                    Verdict::Unaffordable(pools) => pools.clone(),
                    Verdict::BelowThreshold(pool) => vec![*pool],
                    _ => Vec::new(),
                };
                for pool in failed_on {
                    prop_assert_eq!(
                        low_cost.amount(pool),
                        0,
                        "{:?} got {:?} that {:?} could not",
                        low.requested,
                        pool,
                        high.requested
                    );
                }
            }
        }
    }
}
