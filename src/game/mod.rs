//! Game domain types and the tick driver

pub mod driver;
pub mod types;

pub use driver::TickDriver;
pub use types::{
    Direction, KillMethod, KillRecord, MovementIntent, PlayerRecord, Pos, PowerUp, PowerUpKind,
    Rect, Side, TankColor, TankId, TankLevel, TankRecord, POWER_UP_SIZE, TANK_SIZE,
};
