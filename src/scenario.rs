//! Demo skirmish: a small tech tree, a seeded sandbox map and a stock engine
//!
//! Used by the `skirmish-sim` binary and the engine integration tests. The
//! map is one own base in the south-west corner, an enemy base pair in the
//! north-east, and a raiding party that walks into our base early on.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::core::config::EngineConfig;
use crate::core::error::Result;
use crate::core::types::{UnitId, UnitKind, UpgradeId, Urgency, Vec2};
use crate::engine::Engine;
use crate::producers::{ArmyBuilder, SupplyBuffer, Upgrader, WorkerBuilder};
use crate::requests::{Cost, TechTree, UnitSpec};
use crate::world::{SandboxWorld, UnitSnapshot};

pub const BASE: UnitKind = UnitKind(1);
pub const WORKER: UnitKind = UnitKind(2);
pub const DEPOT: UnitKind = UnitKind(3);
pub const BARRACKS: UnitKind = UnitKind(4);
pub const RIFLEMAN: UnitKind = UnitKind(5);
pub const ARMORY: UnitKind = UnitKind(6);
pub const BRUISER: UnitKind = UnitKind(7);

pub const RAIDER: UnitKind = UnitKind(20);

pub const WEAPONS_1: UpgradeId = UpgradeId(1);
pub const WEAPONS_2: UpgradeId = UpgradeId(2);
pub const ARMOR_1: UpgradeId = UpgradeId(3);

pub const HOME: Vec2 = Vec2 { x: 10.0, y: 10.0 };
pub const RALLY: Vec2 = Vec2 { x: 22.0, y: 22.0 };
pub const ENEMY_HOME: Vec2 = Vec2 { x: 110.0, y: 110.0 };

pub fn demo_tech() -> Result<TechTree> {
    TechTree::builder()
        .unit(BASE, UnitSpec::structure(Cost::new(400, 0, 0)).max_count(3).supply_provided(15))
        .unit(WORKER, UnitSpec::unit(Cost::new(50, 0, 1), BASE).build_ticks(40))
        .unit(
            DEPOT,
            UnitSpec::structure(Cost::new(100, 0, 0))
                .max_count(u32::MAX)
                .supply_provided(8)
                .build_ticks(80),
        )
        .unit(
            BARRACKS,
            UnitSpec::structure(Cost::new(150, 0, 0))
                .requires(DEPOT)
                .max_count(3)
                .build_ticks(120),
        )
        .unit(RIFLEMAN, UnitSpec::unit(Cost::new(50, 0, 1), BARRACKS).build_ticks(50))
        .unit(ARMORY, UnitSpec::structure(Cost::new(125, 0, 0)).requires(BARRACKS))
        .unit(
            BRUISER,
            UnitSpec::unit(Cost::new(125, 0, 2), BARRACKS)
                .requires(ARMORY)
                .build_ticks(80),
        )
        .upgrade(WEAPONS_1, Cost::new(100, 0, 0), ARMORY)
        .upgrade(WEAPONS_2, Cost::new(175, 0, 0), ARMORY)
        .upgrade(ARMOR_1, Cost::new(100, 0, 0), ARMORY)
        .build()
}

fn base_at(id: u64, position: Vec2) -> UnitSnapshot {
    let mut base = UnitSnapshot::structure(UnitId(id), BASE, position);
    base.is_base = true;
    base.health = 1500.0;
    base
}

fn rifleman(id: u64, position: Vec2) -> UnitSnapshot {
    let mut unit = UnitSnapshot::new(UnitId(id), RIFLEMAN, position);
    unit.health = 45.0;
    unit.damage = 9.8;
    unit.range = 5.0;
    unit
}

fn bruiser(id: u64, position: Vec2) -> UnitSnapshot {
    let mut unit = UnitSnapshot::new(UnitId(id), BRUISER, position);
    unit.health = 150.0;
    unit.damage = 12.0;
    unit.range = 1.0;
    unit.is_durable = true;
    unit
}

fn raider(id: u64, position: Vec2) -> UnitSnapshot {
    let mut unit = UnitSnapshot::new(UnitId(id), RAIDER, position);
    unit.health = 100.0;
    unit.damage = 9.0;
    unit.range = 1.0;
    unit
}

fn scatter(rng: &mut ChaCha8Rng, center: Vec2, spread: f32) -> Vec2 {
    center
        + Vec2::new(
            rng.gen_range(-spread..=spread),
            rng.gen_range(-spread..=spread),
        )
}

/// A seeded skirmish map; the same seed always lays out the same map
pub fn skirmish(seed: u64) -> Result<SandboxWorld> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut world = SandboxWorld::new().with_tech(demo_tech()?);

    world.set_template(BASE, base_at(0, Vec2::default()));
    world.set_template(WORKER, UnitSnapshot::worker(UnitId(0), WORKER, Vec2::default()));
    world.set_template(RIFLEMAN, rifleman(0, Vec2::default()));
    world.set_template(BRUISER, bruiser(0, Vec2::default()));

    world.set_resources(200, 0);
    world.set_supply(12, 15);
    world.set_rally_point(RALLY);
    world.set_enemy_start(ENEMY_HOME);

    // 1. Own start: one base and its workers
    world.add_own(base_at(1, HOME));
    for i in 0..12 {
        let at = scatter(&mut rng, HOME, 4.0);
        world.add_own(UnitSnapshot::worker(UnitId(100 + i), WORKER, at));
    }

    // 2. Enemy bases and a garrison
    world.add_enemy(base_at(1000, ENEMY_HOME));
    world.add_enemy(base_at(1001, Vec2::new(80.0, 115.0)));
    let garrison = rng.gen_range(5..=9);
    for i in 0..garrison {
        let at = scatter(&mut rng, Vec2::new(100.0, 100.0), 6.0);
        world.add_enemy(raider(1100 + i, at));
    }

    // 3. A raiding party already on its way to our base
    let raiders = rng.gen_range(3..=5);
    let staging = scatter(&mut rng, Vec2::new(45.0, 45.0), 5.0);
    for i in 0..raiders {
        let id = 1200 + i;
        world.add_enemy(raider(id, scatter(&mut rng, staging, 2.0)));
        world.send_enemy(UnitId(id), HOME);
    }

    Ok(world)
}

/// Engine wired with the stock producers for the demo tech tree
pub fn demo_engine(config: EngineConfig) -> Result<Engine> {
    let upgrader = Upgrader::new()
        .with_chain(Urgency::Medium, vec![WEAPONS_1, WEAPONS_2])
        .with_chain(Urgency::Low, vec![ARMOR_1]);

    Ok(Engine::new(config, demo_tech()?)
        .with_producer(SupplyBuffer::new(DEPOT))
        .with_producer(WorkerBuilder::new(WORKER))
        .with_producer(ArmyBuilder::new(vec![RIFLEMAN, RIFLEMAN, BRUISER]))
        .with_producer(upgrader))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::requests::Expense;
    use crate::world::World;

    #[test]
    fn test_demo_tech_is_acyclic() {
        let tech = demo_tech().expect("demo tech builds");
        assert_eq!(tech.dependency_depth(Expense::Unit(BRUISER)), 3);
    }

    #[test]
    fn test_same_seed_same_map() {
        let a = skirmish(7).expect("map");
        let b = skirmish(7).expect("map");
        assert_eq!(a.all_enemies(), b.all_enemies());
        assert_eq!(a.own_units(), b.own_units());
    }
}
