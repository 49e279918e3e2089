//! Full engine integration tests
//!
//! Runs the stock engine against the seeded sandbox skirmish, feeding deaths
//! and finished research back the way the simulator binary does.

use skirmish_engine::core::config::EngineConfig;
use skirmish_engine::core::types::{UnitId, UnitKind, Urgency, Vec2};
use skirmish_engine::producers::{SupplyBuffer, WorkerBuilder};
use skirmish_engine::requests::{
    Cost, DropReason, Expense, Request, TechTree, UnitSpec, Verdict,
};
use skirmish_engine::scenario::{self, BARRACKS, DEPOT, WORKER};
use skirmish_engine::world::{SandboxWorld, UnitSnapshot, World};
use skirmish_engine::{Engine, TickReport};

/// One engine pass plus one world step
async fn step(engine: &mut Engine, world: &mut SandboxWorld) -> TickReport {
    let report = engine.tick(world).await;
    for unit in world.advance() {
        engine.on_unit_destroyed(unit, report.tick);
    }
    for upgrade in world.take_finished_upgrades() {
        engine.on_upgrade_complete(upgrade);
    }
    report
}

/// Every held unit must still exist when the engine hands out orders
fn assert_claims_sound(engine: &Engine, world: &SandboxWorld) {
    let registry = engine.registry();
    assert!(registry.is_disjoint());
    for (claimant, _) in registry.claimants() {
        for unit in registry.allocated(claimant).into_iter().flatten() {
            assert!(world.own_unit(*unit).is_some(), "{:?} holds dead {:?}", claimant, unit);
        }
    }
}

#[tokio::test]
async fn test_raid_triggers_defense_with_workers() {
    let mut world = scenario::skirmish(3).expect("map");
    let tech = scenario::demo_tech().expect("tech");
    // No army, so only the drafted workers can answer the raid
    let mut engine = Engine::new(EngineConfig::default(), tech)
        .with_producer(SupplyBuffer::new(DEPOT))
        .with_producer(WorkerBuilder::new(WORKER));

    let mut defense_created = false;
    let mut workers_drafted = false;
    for _ in 0..600 {
        let report = step(&mut engine, &mut world).await;
        defense_created |= report.objectives.created.contains(&"defense");
        workers_drafted |= report
            .objectives
            .live
            .iter()
            .any(|o| o.label == "defense" && o.held > 0);
        assert!(engine.scheduler().attack().is_none());
        if workers_drafted {
            break;
        }
    }

    assert!(defense_created, "the raid never registered as a threat");
    assert!(workers_drafted, "defense never drafted a worker");
}

#[tokio::test]
async fn test_stock_engine_keeps_claims_sound() {
    for seed in [1, 2, 3] {
        let mut world = scenario::skirmish(seed).expect("map");
        let mut engine = scenario::demo_engine(EngineConfig::default()).expect("engine");

        let mut last_tick = None;
        let mut fulfilled = 0;
        let mut worker_trained = false;
        for _ in 0..1500 {
            let report = engine.tick(&mut world).await;
            assert_claims_sound(&engine, &world);
            assert!(last_tick.map_or(true, |t| report.tick > t));
            last_tick = Some(report.tick);

            fulfilled += report.arbitration.fulfilled_count();
            worker_trained |= report
                .arbitration
                .fulfilled()
                .any(|r| r.resolved == Expense::Unit(WORKER));
            // Never more than one objective of each kind
            assert!(report.objectives.live.len() <= 2);

            for unit in world.advance() {
                engine.on_unit_destroyed(unit, report.tick);
            }
            for upgrade in world.take_finished_upgrades() {
                engine.on_upgrade_complete(upgrade);
            }
        }

        assert!(fulfilled > 0, "seed {}: nothing was ever produced", seed);
        assert!(worker_trained, "seed {}: no worker was trained", seed);
    }
}

#[tokio::test]
async fn test_submitted_request_is_arbitrated_once() {
    let mut world = scenario::skirmish(5).expect("map");
    let tech = scenario::demo_tech().expect("tech");
    let mut engine = Engine::new(EngineConfig::default(), tech);

    // Barracks needs a depot first, which is what gets built
    engine.submit(Request::build(BARRACKS, Urgency::High));
    let report = step(&mut engine, &mut world).await;
    let entry = &report.arbitration.reports[0];
    assert_eq!(entry.requested, Expense::Unit(BARRACKS));
    assert_eq!(entry.resolved, Expense::Unit(DEPOT));
    assert_eq!(entry.verdict, Verdict::Fulfilled);

    let report = step(&mut engine, &mut world).await;
    assert!(report.arbitration.reports.is_empty());
}

#[tokio::test]
async fn test_claimed_workers_are_not_sent_to_build() {
    let mut world = scenario::skirmish(5).expect("map");
    let tech = scenario::demo_tech().expect("tech");
    let mut engine = Engine::new(EngineConfig::default(), tech);

    let workers: Vec<UnitId> = world
        .own_units()
        .iter()
        .filter(|u| u.is_worker)
        .map(|u| u.id)
        .collect();
    assert!(!workers.is_empty());
    let militia = engine.register_claimant("militia", Urgency::VeryHigh);
    engine.registry_mut().take(&workers, militia);

    engine.submit(Request::build(BARRACKS, Urgency::High));
    let report = step(&mut engine, &mut world).await;
    assert_eq!(
        report.arbitration.reports[0].verdict,
        Verdict::Dropped(DropReason::NoBuilder)
    );
    assert!(report
        .arbitration
        .commands
        .iter()
        .all(|c| !workers.contains(&c.unit)));
}

#[tokio::test]
async fn test_deep_tech_chain_is_not_cut_short() {
    const BASE: UnitKind = UnitKind(1);
    const HAND: UnitKind = UnitKind(2);
    // Ten structures, each one requiring the one before it
    let mut builder = TechTree::builder()
        .unit(BASE, UnitSpec::structure(Cost::new(400, 0, 0)))
        .unit(HAND, UnitSpec::unit(Cost::new(50, 0, 1), BASE))
        .unit(UnitKind(100), UnitSpec::structure(Cost::new(100, 0, 0)));
    for level in 101..=110 {
        builder = builder.unit(
            UnitKind(level),
            UnitSpec::structure(Cost::new(100, 0, 0)).requires(UnitKind(level - 1)),
        );
    }
    let tech = builder.build().expect("valid tree");
    assert_eq!(tech.max_dependency_depth(), 10);

    let mut world = SandboxWorld::new().with_tech(tech.clone());
    world.add_own(UnitSnapshot::structure(UnitId(1), BASE, Vec2::default()));
    world.add_own(UnitSnapshot::worker(UnitId(2), HAND, Vec2::new(2.0, 0.0)));
    world.set_resources(1000, 0);

    let config = EngineConfig::default();
    assert!(config.arbitrator.max_dependency_depth < 10);
    let mut engine = Engine::new(config, tech);
    assert_eq!(engine.arbitrator().max_depth(), 10);

    engine.submit(Request::build(UnitKind(110), Urgency::High));
    let report = step(&mut engine, &mut world).await;
    let entry = &report.arbitration.reports[0];
    assert_eq!(entry.resolved, Expense::Unit(UnitKind(100)));
    assert_eq!(entry.verdict, Verdict::Fulfilled);
}

async fn replay(seed: u64, ticks: usize) -> Vec<String> {
    let mut world = scenario::skirmish(seed).expect("map");
    let mut engine = scenario::demo_engine(EngineConfig::default()).expect("engine");
    let mut reports = Vec::with_capacity(ticks);
    for _ in 0..ticks {
        let report = step(&mut engine, &mut world).await;
        reports.push(serde_json::to_string(&report).expect("report serializes"));
    }
    reports
}

#[tokio::test]
async fn test_same_seed_replays_identically() {
    let first = replay(2, 400).await;
    let second = replay(2, 400).await;
    for (tick, (a, b)) in first.iter().zip(&second).enumerate() {
        assert_eq!(a, b, "runs diverged at tick {}", tick);
    }
}
