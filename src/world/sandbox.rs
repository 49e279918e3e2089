//! In-memory world for tests and the demo binary
//!
//! Deliberately coarse: straight-line movement, continuous damage, vision as
//! a fixed radius around own units. Good enough to drive the engine through
//! every objective state without a game client.

use ahash::{AHashMap, AHashSet};
use async_trait::async_trait;
use ordered_float::OrderedFloat;

use crate::core::types::{AbilityId, Tick, UnitId, UnitKind, UpgradeId, Vec2};
use crate::requests::{Cost, ResourcePool, TechTree};
use crate::world::{Command, IssuedCommand, UnitSnapshot, World};

/// Ticks per second of game time
const TICKS_PER_SECOND: f32 = 22.4;
/// Distance covered per tick by a moving unit
const UNIT_SPEED: f32 = 0.2;
/// Minerals gained per tick by each gathering worker
const INCOME_PER_WORKER: f32 = 0.05;
/// Spacing between structure placement candidates
const PLACEMENT_STEP: f32 = 4.0;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Order {
    Move(Vec2),
    AttackMove(Vec2),
    Attack(UnitId),
}

#[derive(Debug, Clone)]
enum Product {
    Unit { kind: UnitKind, at: Vec2 },
    Upgrade(UpgradeId),
}

#[derive(Debug, Clone)]
struct Job {
    product: Product,
    producer: UnitId,
    /// Worker constructing a structure; goes back to gathering when done
    builds: bool,
    remaining: u64,
}

#[derive(Debug, Clone)]
pub struct SandboxWorld {
    tick: Tick,
    minerals: f32,
    gas: u32,
    supply_used: u32,
    supply_cap: u32,
    own: Vec<UnitSnapshot>,
    enemies: Vec<UnitSnapshot>,
    sight_range: f32,
    rally_point: Vec2,
    enemy_start: Vec2,
    pending_overrides: AHashMap<UnitKind, u32>,
    upgrades: AHashSet<UpgradeId>,
    blocked_abilities: AHashSet<(UnitId, AbilityId)>,
    placement_blocked: bool,
    orders: AHashMap<UnitId, Order>,
    jobs: Vec<Job>,
    tech: Option<TechTree>,
    templates: AHashMap<UnitKind, UnitSnapshot>,
    executed: Vec<IssuedCommand>,
    finished_upgrades: Vec<UpgradeId>,
    next_id: u64,
}

impl Default for SandboxWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl SandboxWorld {
    pub fn new() -> Self {
        Self {
            tick: 0,
            minerals: 0.0,
            gas: 0,
            supply_used: 0,
            supply_cap: 0,
            own: Vec::new(),
            enemies: Vec::new(),
            sight_range: 12.0,
            rally_point: Vec2::default(),
            enemy_start: Vec2::new(100.0, 100.0),
            pending_overrides: AHashMap::new(),
            upgrades: AHashSet::new(),
            blocked_abilities: AHashSet::new(),
            placement_blocked: false,
            orders: AHashMap::new(),
            jobs: Vec::new(),
            tech: None,
            templates: AHashMap::new(),
            executed: Vec::new(),
            finished_upgrades: Vec::new(),
            next_id: 10_000,
        }
    }

    /// Catalog used to charge and complete production orders
    pub fn with_tech(mut self, tech: TechTree) -> Self {
        self.tech = Some(tech);
        self
    }

    pub fn set_resources(&mut self, minerals: u32, gas: u32) {
        self.minerals = minerals as f32;
        self.gas = gas;
    }

    pub fn set_supply(&mut self, used: u32, cap: u32) {
        self.supply_used = used;
        self.supply_cap = cap;
    }

    pub fn set_rally_point(&mut self, rally_point: Vec2) {
        self.rally_point = rally_point;
    }

    pub fn set_enemy_start(&mut self, enemy_start: Vec2) {
        self.enemy_start = enemy_start;
    }

    pub fn set_sight_range(&mut self, range: f32) {
        self.sight_range = range;
    }

    /// Stats given to units of `kind` when they finish
    pub fn set_template(&mut self, kind: UnitKind, template: UnitSnapshot) {
        self.templates.insert(kind, template);
    }

    pub fn add_own(&mut self, unit: UnitSnapshot) {
        self.next_id = self.next_id.max(unit.id.0 + 1);
        self.own.push(unit);
    }

    pub fn add_enemy(&mut self, unit: UnitSnapshot) {
        self.next_id = self.next_id.max(unit.id.0 + 1);
        self.enemies.push(unit);
    }

    pub fn remove_own(&mut self, id: UnitId) -> Option<UnitSnapshot> {
        let index = self.own.iter().position(|u| u.id == id)?;
        self.orders.remove(&id);
        Some(self.own.remove(index))
    }

    pub fn remove_enemy(&mut self, id: UnitId) -> Option<UnitSnapshot> {
        let index = self.enemies.iter().position(|u| u.id == id)?;
        self.orders.remove(&id);
        Some(self.enemies.remove(index))
    }

    pub fn move_own(&mut self, id: UnitId, position: Vec2) {
        if let Some(unit) = self.own.iter_mut().find(|u| u.id == id) {
            unit.position = position;
        }
    }

    pub fn move_enemy(&mut self, id: UnitId, position: Vec2) {
        if let Some(unit) = self.enemies.iter_mut().find(|u| u.id == id) {
            unit.position = position;
        }
    }

    /// Order a hostile to attack-move somewhere
    pub fn send_enemy(&mut self, id: UnitId, destination: Vec2) {
        if self.enemies.iter().any(|u| u.id == id) {
            self.orders.insert(id, Order::AttackMove(destination));
        }
    }

    pub fn set_pending(&mut self, kind: UnitKind, count: u32) {
        self.pending_overrides.insert(kind, count);
    }

    pub fn set_upgrade_pending(&mut self, upgrade: UpgradeId) {
        self.upgrades.insert(upgrade);
    }

    pub fn block_ability(&mut self, unit: UnitId, ability: AbilityId) {
        self.blocked_abilities.insert((unit, ability));
    }

    pub fn block_placement(&mut self, blocked: bool) {
        self.placement_blocked = blocked;
    }

    pub fn own_unit(&self, id: UnitId) -> Option<&UnitSnapshot> {
        self.own.iter().find(|u| u.id == id)
    }

    pub fn enemy_unit(&self, id: UnitId) -> Option<&UnitSnapshot> {
        self.enemies.iter().find(|u| u.id == id)
    }

    pub fn all_enemies(&self) -> &[UnitSnapshot] {
        &self.enemies
    }

    /// Every command received so far, in order
    pub fn executed(&self) -> &[IssuedCommand] {
        &self.executed
    }

    pub fn clear_executed(&mut self) {
        self.executed.clear();
    }

    /// Upgrades whose research finished since the last call
    pub fn take_finished_upgrades(&mut self) -> Vec<UpgradeId> {
        std::mem::take(&mut self.finished_upgrades)
    }

    /// Step one tick of movement, combat, production and income
    ///
    /// Returns the ids of units destroyed this tick, own and hostile.
    pub fn advance(&mut self) -> Vec<UnitId> {
        self.tick += 1;
        self.step_movement();
        let destroyed = self.step_combat();
        self.step_jobs();

        let gathering = self.own.iter().filter(|u| u.is_gathering).count() as f32;
        self.minerals += gathering * INCOME_PER_WORKER;

        destroyed
    }

    fn step_movement(&mut self) {
        let enemy_positions: AHashMap<UnitId, Vec2> =
            self.enemies.iter().map(|u| (u.id, u.position)).collect();
        let own_positions: AHashMap<UnitId, Vec2> =
            self.own.iter().map(|u| (u.id, u.position)).collect();

        for (units, foes) in [
            (&mut self.own, &enemy_positions),
            (&mut self.enemies, &own_positions),
        ] {
            for unit in units.iter_mut() {
                let Some(order) = self.orders.get(&unit.id).copied() else {
                    continue;
                };
                let in_reach = |p: &Vec2| unit.position.distance(p) <= unit.range + 0.5;
                let destination = match order {
                    Order::Move(target) => Some(target),
                    Order::AttackMove(target) => {
                        if unit.damage > 0.0 && foes.values().any(in_reach) {
                            None
                        } else {
                            Some(target)
                        }
                    }
                    Order::Attack(target) => foes.get(&target).filter(|p| !in_reach(*p)).copied(),
                };
                match destination {
                    Some(target) => {
                        unit.position = unit.position.towards(&target, UNIT_SPEED);
                        unit.is_idle = unit.position == target;
                    }
                    None => unit.is_idle = false,
                }
            }
        }

        // Arrived movers go idle
        let arrived: Vec<UnitId> = self
            .own
            .iter()
            .chain(self.enemies.iter())
            .filter(|u| u.is_idle)
            .map(|u| u.id)
            .collect();
        for id in arrived {
            if matches!(self.orders.get(&id), Some(Order::Move(_))) {
                self.orders.remove(&id);
            }
        }
    }

    fn step_combat(&mut self) -> Vec<UnitId> {
        let own_hits = Self::exchange(&self.own, &self.enemies, &self.orders);
        let enemy_hits = Self::exchange(&self.enemies, &self.own, &self.orders);

        for (units, hits) in [(&mut self.enemies, own_hits), (&mut self.own, enemy_hits)] {
            for unit in units.iter_mut() {
                if let Some(damage) = hits.get(&unit.id) {
                    unit.health -= damage;
                }
            }
        }
        for unit in self.own.iter_mut().chain(self.enemies.iter_mut()) {
            unit.weapon_cooldown = (unit.weapon_cooldown - 1.0 / TICKS_PER_SECOND).max(0.0);
        }

        let mut destroyed = Vec::new();
        for units in [&mut self.own, &mut self.enemies] {
            units.retain(|u| {
                if u.health <= 0.0 {
                    destroyed.push(u.id);
                    false
                } else {
                    true
                }
            });
        }
        for id in &destroyed {
            self.orders.remove(id);
        }
        destroyed
    }

    /// Damage dealt by `attackers` this tick, keyed by victim
    fn exchange(
        attackers: &[UnitSnapshot],
        victims: &[UnitSnapshot],
        orders: &AHashMap<UnitId, Order>,
    ) -> AHashMap<UnitId, f32> {
        let mut hits = AHashMap::new();
        for attacker in attackers.iter().filter(|u| u.damage > 0.0 && u.is_ready) {
            if matches!(orders.get(&attacker.id), Some(Order::Move(_))) {
                continue;
            }
            let preferred = match orders.get(&attacker.id) {
                Some(Order::Attack(target)) => victims.iter().find(|v| v.id == *target),
                _ => None,
            };
            let victim = preferred
                .filter(|v| attacker.position.distance(&v.position) <= attacker.range + 0.5)
                .or_else(|| {
                    victims
                        .iter()
                        .filter(|v| attacker.position.distance(&v.position) <= attacker.range + 0.5)
                        .min_by_key(|v| OrderedFloat(attacker.position.distance(&v.position)))
                });
            if let Some(victim) = victim {
                *hits.entry(victim.id).or_insert(0.0) += attacker.damage / TICKS_PER_SECOND;
            }
        }
        hits
    }

    fn step_jobs(&mut self) {
        let mut finished = Vec::new();
        self.jobs.retain_mut(|job| {
            job.remaining = job.remaining.saturating_sub(1);
            if job.remaining == 0 {
                finished.push(job.clone());
                false
            } else {
                true
            }
        });

        for job in finished {
            if job.builds {
                self.orders.remove(&job.producer);
                self.set_gathering(job.producer, true);
            } else if let Some(unit) = self.own.iter_mut().find(|u| u.id == job.producer) {
                unit.is_idle = true;
            }
            match job.product {
                Product::Unit { kind, at } => self.spawn(kind, at),
                Product::Upgrade(upgrade) => self.finished_upgrades.push(upgrade),
            }
        }
    }

    fn spawn(&mut self, kind: UnitKind, at: Vec2) {
        let id = UnitId(self.next_id);
        self.next_id += 1;

        let spec = self.tech.as_ref().and_then(|t| t.unit(kind)).cloned();
        let mut unit = match (self.templates.get(&kind), &spec) {
            (Some(template), _) => template.clone(),
            (None, Some(spec)) if spec.is_structure => UnitSnapshot::structure(id, kind, at),
            _ => UnitSnapshot::new(id, kind, at),
        };
        unit.id = id;
        unit.kind = kind;
        unit.position = at;

        if let Some(spec) = spec {
            self.supply_cap += spec.supply_provided;
        }
        self.own.push(unit);
    }

    fn set_gathering(&mut self, id: UnitId, gathering: bool) {
        if let Some(unit) = self.own.iter_mut().find(|u| u.id == id) {
            unit.is_gathering = gathering;
            unit.is_idle = false;
        }
    }

    /// Charge the catalog cost of a production order; false if unaffordable
    fn charge(&mut self, cost: Cost) -> bool {
        if (cost.minerals as f32) > self.minerals || cost.gas > self.gas {
            return false;
        }
        self.minerals -= cost.minerals as f32;
        self.gas -= cost.gas;
        self.supply_used += cost.supply;
        true
    }

    fn enqueue(&mut self, issued: &IssuedCommand) {
        let Some(producer) = self.own.iter().find(|u| u.id == issued.unit).cloned() else {
            return;
        };
        let (product, cost, ticks) = match (&issued.command, &self.tech) {
            (Command::Train(kind), Some(tech)) => match tech.unit(*kind) {
                Some(spec) => (
                    Product::Unit {
                        kind: *kind,
                        at: producer.position,
                    },
                    spec.cost,
                    spec.build_ticks,
                ),
                None => return,
            },
            (Command::Build { kind, at }, Some(tech)) => match tech.unit(*kind) {
                Some(spec) => (
                    Product::Unit {
                        kind: *kind,
                        at: *at,
                    },
                    spec.cost,
                    spec.build_ticks,
                ),
                None => return,
            },
            (Command::Research(upgrade), Some(tech)) => match tech.upgrade(*upgrade) {
                Some(spec) => (Product::Upgrade(*upgrade), spec.cost, 200),
                None => return,
            },
            _ => return,
        };
        if !self.charge(cost) {
            return;
        }

        let builds = matches!(issued.command, Command::Build { .. });
        if let Product::Upgrade(upgrade) = &product {
            self.upgrades.insert(*upgrade);
        }
        if let Some(unit) = self.own.iter_mut().find(|u| u.id == producer.id) {
            unit.is_idle = false;
            unit.is_gathering &= !builds;
        }
        if let Command::Build { at, .. } = &issued.command {
            self.orders.insert(producer.id, Order::Move(*at));
        }
        self.jobs.push(Job {
            product,
            producer: producer.id,
            builds,
            remaining: ticks.max(1),
        });
    }
}

#[async_trait]
impl World for SandboxWorld {
    fn current_tick(&self) -> Tick {
        self.tick
    }

    fn resources(&self) -> ResourcePool {
        ResourcePool::new(
            self.minerals as u32,
            self.gas,
            self.supply_cap.saturating_sub(self.supply_used),
        )
    }

    fn supply_used(&self) -> u32 {
        self.supply_used
    }

    fn supply_cap(&self) -> u32 {
        self.supply_cap
    }

    fn own_units(&self) -> Vec<UnitSnapshot> {
        self.own.clone()
    }

    fn visible_enemies(&self) -> Vec<UnitSnapshot> {
        self.enemies
            .iter()
            .filter(|u| self.is_visible(u.position))
            .cloned()
            .collect()
    }

    fn is_visible(&self, position: Vec2) -> bool {
        self.own
            .iter()
            .any(|u| u.position.distance(&position) <= self.sight_range)
    }

    fn rally_point(&self) -> Vec2 {
        self.rally_point
    }

    fn enemy_start(&self) -> Vec2 {
        self.enemy_start
    }

    fn pending(&self, kind: UnitKind) -> u32 {
        let queued = self
            .jobs
            .iter()
            .filter(|j| matches!(&j.product, Product::Unit { kind: k, .. } if *k == kind))
            .count() as u32;
        queued + self.pending_overrides.get(&kind).copied().unwrap_or(0)
    }

    fn upgrade_pending(&self, upgrade: UpgradeId) -> bool {
        self.upgrades.contains(&upgrade)
    }

    async fn ability_available(&self, unit: UnitId, ability: AbilityId) -> bool {
        !self.blocked_abilities.contains(&(unit, ability))
    }

    async fn find_placement(&self, _kind: UnitKind, near: Vec2) -> Option<Vec2> {
        if self.placement_blocked {
            return None;
        }
        // Walk outward in rings until a spot clear of other structures turns up
        for ring in 1..=8 {
            let radius = ring as f32 * PLACEMENT_STEP;
            for step in 0..(ring * 8) {
                let angle = step as f32 / (ring * 8) as f32 * std::f32::consts::TAU;
                let spot = near + Vec2::new(angle.cos() * radius, angle.sin() * radius);
                let clear = self
                    .own
                    .iter()
                    .filter(|u| u.is_structure)
                    .all(|u| u.position.distance(&spot) >= PLACEMENT_STEP);
                let reserved = self.jobs.iter().any(|j| {
                    matches!(&j.product, Product::Unit { at, .. } if at.distance(&spot) < PLACEMENT_STEP)
                });
                if clear && !reserved {
                    return Some(spot);
                }
            }
        }
        None
    }

    fn execute(&mut self, commands: Vec<IssuedCommand>) {
        for issued in commands {
            match &issued.command {
                Command::Move(target) => {
                    self.orders.insert(issued.unit, Order::Move(*target));
                    self.set_gathering(issued.unit, false);
                }
                Command::AttackMove(target) => {
                    self.orders.insert(issued.unit, Order::AttackMove(*target));
                    self.set_gathering(issued.unit, false);
                }
                Command::Attack(target) => {
                    self.orders.insert(issued.unit, Order::Attack(*target));
                    self.set_gathering(issued.unit, false);
                }
                Command::Stop => {
                    self.orders.remove(&issued.unit);
                    if let Some(unit) = self.own.iter_mut().find(|u| u.id == issued.unit) {
                        unit.is_idle = true;
                    }
                }
                Command::Train(_) | Command::Build { .. } | Command::Research(_) => {
                    self.enqueue(&issued);
                }
                Command::UseAbility(_) => {}
            }
            self.executed.push(issued);
        }
    }
}
