//! Core game records and geometry

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Tank facing / movement direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

/// Which camp a player or tank fights for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Human,
    Bot,
}

/// Tank upgrade tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TankLevel {
    Basic,
    Fast,
    Power,
    Armor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TankColor {
    Yellow,
    Green,
    Silver,
    Red,
}

/// Globally unique tank identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TankId(Uuid);

impl TankId {
    /// Allocate a fresh id
    pub fn next() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for TankId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Decision produced by the direction resolver, consumed once per tank-tick
/// by the movement driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MovementIntent {
    Turn(Direction),
    Forward,
    Idle,
}

/// Position in stage coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pos {
    pub x: f32,
    pub y: f32,
}

pub const TANK_SIZE: f32 = 16.0;
pub const POWER_UP_SIZE: f32 = 16.0;

/// Axis-aligned bounding rectangle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Grow (positive margin) or shrink (negative margin) by the same amount
    /// on every side
    pub fn inflate(self, margin: f32) -> Self {
        Self {
            x: self.x - margin,
            y: self.y - margin,
            width: self.width + 2.0 * margin,
            height: self.height + 2.0 * margin,
        }
    }

    /// Strict AABB overlap; rectangles that merely touch do not overlap
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.x < other.x + other.width
            && other.x < self.x + self.width
            && self.y < other.y + other.height
            && other.y < self.y + self.height
    }
}

/// A tank owned by the shared store once spawned
#[derive(Debug, Clone, PartialEq)]
pub struct TankRecord {
    pub tank_id: TankId,
    pub x: f32,
    pub y: f32,
    pub direction: Direction,
    pub level: TankLevel,
    pub color: TankColor,
    pub hp: u32,
    pub active: bool,
    /// Remaining invulnerability window, milliseconds
    pub helmet_duration_ms: u64,
    /// Remaining freeze, milliseconds; zero when the tank can act
    pub frozen_timeout_ms: u64,
    pub side: Side,
}

impl TankRecord {
    /// Fresh basic tank in the given color, not yet placed on the stage
    pub fn basic(side: Side, color: TankColor) -> Self {
        Self {
            tank_id: TankId::next(),
            x: 0.0,
            y: 0.0,
            direction: Direction::Up,
            level: TankLevel::Basic,
            color,
            hp: 1,
            active: false,
            helmet_duration_ms: 0,
            frozen_timeout_ms: 0,
            side,
        }
    }

    /// Place the tank at a spawn position under a fresh id, facing up and
    /// wearing a helmet. Upgrade attributes (level, color) carry through,
    /// which is how a reserved tank is restored.
    pub fn spawned_at(mut self, tank_id: TankId, pos: Pos, helmet_ms: u64) -> Self {
        self.tank_id = tank_id;
        self.x = pos.x;
        self.y = pos.y;
        self.direction = Direction::Up;
        self.active = true;
        self.helmet_duration_ms = helmet_ms;
        self.frozen_timeout_ms = 0;
        self
    }

    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, TANK_SIZE, TANK_SIZE)
    }
}

/// A registered player, owned by the shared store
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerRecord {
    pub player_name: String,
    pub lives: u32,
    pub side: Side,
    /// Tank currently bound to this player, if any
    pub active_tank_id: Option<TankId>,
    /// Tank carried over across a stage boundary; mutually exclusive with an
    /// active tank
    pub reserved_tank: Option<TankRecord>,
}

impl PlayerRecord {
    pub fn new(player_name: impl Into<String>, lives: u32, side: Side) -> Self {
        Self {
            player_name: player_name.into(),
            lives,
            side,
            active_tank_id: None,
            reserved_tank: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PowerUpKind {
    Tank,
    Star,
    Grenade,
    Timer,
    Helmet,
    Shovel,
}

/// A power-up sitting on the stage
#[derive(Debug, Clone, PartialEq)]
pub struct PowerUp {
    pub power_up_id: Uuid,
    pub kind: PowerUpKind,
    pub x: f32,
    pub y: f32,
}

impl PowerUp {
    pub fn new(kind: PowerUpKind, x: f32, y: f32) -> Self {
        Self {
            power_up_id: Uuid::new_v4(),
            kind,
            x,
            y,
        }
    }

    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, POWER_UP_SIZE, POWER_UP_SIZE)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KillMethod {
    Bullet,
}

/// One recorded kill
#[derive(Debug, Clone, PartialEq)]
pub struct KillRecord {
    pub method: KillMethod,
    pub source_player: String,
    pub source_tank: TankId,
    pub target_player: String,
    pub target_tank: TankId,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_overlap_is_strict() {
        let a = Rect::new(0.0, 0.0, 16.0, 16.0);
        let touching = Rect::new(16.0, 0.0, 16.0, 16.0);
        let overlapping = Rect::new(15.0, 15.0, 16.0, 16.0);
        assert!(!a.overlaps(&touching));
        assert!(a.overlaps(&overlapping));
        assert!(a.overlaps(&a));
    }

    #[test]
    fn inflate_with_negative_margin_shrinks() {
        let r = Rect::new(0.0, 0.0, 16.0, 16.0).inflate(-0.5);
        assert_eq!(r, Rect::new(0.5, 0.5, 15.0, 15.0));
    }

    #[test]
    fn spawned_at_keeps_upgrade_attributes() {
        let mut proto = TankRecord::basic(Side::Human, TankColor::Green);
        proto.level = TankLevel::Armor;

        let id = TankId::next();
        let tank = proto.spawned_at(id, Pos { x: 64.0, y: 192.0 }, 2250);

        assert_eq!(tank.tank_id, id);
        assert_eq!(tank.level, TankLevel::Armor);
        assert_eq!(tank.color, TankColor::Green);
        assert_eq!(tank.direction, Direction::Up);
        assert!(tank.active);
        assert_eq!(tank.helmet_duration_ms, 2250);
    }
}
