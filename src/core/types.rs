//! Core type definitions used throughout the codebase

use serde::{Deserialize, Serialize};

/// Game loop step counter (the world advances one tick per engine pass)
pub type Tick = u64;

/// Identifier the world assigns to a unit or structure
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UnitId(pub u64);

/// Unit or structure type, opaque to the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UnitKind(pub u32);

/// Research upgrade type
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UpgradeId(pub u32);

/// Ability a unit may or may not currently be able to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AbilityId(pub u32);

/// Priority of a request or a unit claim
///
/// Governs both the order of the resource auction and which claimant may
/// take units from which. `None` means "don't do this".
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[repr(u8)]
pub enum Urgency {
    #[default]
    None = 0,
    /// Totally fine if it never happens
    VeryLow = 1,
    /// Whenever there is an excess
    Low = 2,
    MediumLow = 3,
    /// As a matter of course
    Medium = 4,
    MediumHigh = 5,
    /// Put some other things off
    High = 6,
    VeryHigh = 7,
    /// Absolutely do this right now
    Extreme = 8,
    /// Failing this, the game is lost anyway
    LifeOrDeath = 9,
}

impl Urgency {
    const LEVELS: [Urgency; 10] = [
        Urgency::None,
        Urgency::VeryLow,
        Urgency::Low,
        Urgency::MediumLow,
        Urgency::Medium,
        Urgency::MediumHigh,
        Urgency::High,
        Urgency::VeryHigh,
        Urgency::Extreme,
        Urgency::LifeOrDeath,
    ];

    /// Numeric level, 0 (never) to 9 (critical)
    pub fn level(self) -> u8 {
        self as u8
    }

    /// Urgency for a numeric level, clamped into 0..=9
    pub fn from_level(level: i32) -> Self {
        Self::LEVELS[level.clamp(0, 9) as usize]
    }

    /// One step lower, stopping at `None`
    pub fn lower(self) -> Self {
        Self::from_level(self.level() as i32 - 1)
    }

    /// One step higher, stopping at `LifeOrDeath`
    pub fn raise(self) -> Self {
        Self::from_level(self.level() as i32 + 1)
    }

    pub fn is_none(self) -> bool {
        self == Urgency::None
    }
}

/// 2D map position
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Self) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn is_closer_than(&self, range: f32, other: &Self) -> bool {
        self.distance(other) < range
    }

    pub fn length(&self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    pub fn normalize(&self) -> Self {
        let len = self.length();
        if len > 0.0001 {
            Self { x: self.x / len, y: self.y / len }
        } else {
            Self::default()
        }
    }

    /// Point `step` units from self in the direction of `target`.
    /// Negative steps move away. Never overshoots the target.
    pub fn towards(&self, target: &Self, step: f32) -> Self {
        let dist = self.distance(target);
        if dist < 0.0001 {
            return *self;
        }
        let step = step.min(dist);
        *self + (*target - *self).normalize() * step
    }
}

impl std::ops::Add for Vec2 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self { x: self.x + rhs.x, y: self.y + rhs.y }
    }
}

impl std::ops::Sub for Vec2 {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self { x: self.x - rhs.x, y: self.y - rhs.y }
    }
}

impl std::ops::Mul<f32> for Vec2 {
    type Output = Self;
    fn mul(self, rhs: f32) -> Self {
        Self { x: self.x * rhs, y: self.y * rhs }
    }
}
