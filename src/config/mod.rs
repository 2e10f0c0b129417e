//! Configuration module - environment variable parsing

use std::env;

use serde::Deserialize;

use crate::game::{Pos, TankColor};
use crate::input::ControlMap;
use crate::util::time::SIMULATION_TPS;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Simulation tick rate (ticks per second)
    pub tick_rate: u32,
    /// Lives a human player starts with
    pub starting_lives: u32,
    /// Key bindings for the first local player
    pub player_one_controls: ControlMap,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let tick_rate = match env::var("TICK_RATE") {
            Ok(raw) => raw
                .parse()
                .map_err(|_| ConfigError::InvalidNumber("TICK_RATE"))?,
            Err(_) => SIMULATION_TPS,
        };

        let starting_lives = match env::var("STARTING_LIVES") {
            Ok(raw) => raw
                .parse()
                .map_err(|_| ConfigError::InvalidNumber("STARTING_LIVES"))?,
            Err(_) => 3,
        };

        // JSON object with up/down/left/right/fire key codes
        let player_one_controls = match env::var("PLAYER_ONE_CONTROLS") {
            Ok(raw) => serde_json::from_str(&raw)?,
            Err(_) => ControlMap::wasd(),
        };

        Ok(Self {
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            tick_rate,
            starting_lives,
            player_one_controls,
        })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid numeric value for {0}")]
    InvalidNumber(&'static str),

    #[error("Invalid PLAYER_ONE_CONTROLS mapping: {0}")]
    InvalidControls(#[from] serde_json::Error),
}

/// Per-player session configuration, immutable for the session's lifetime
#[derive(Debug, Clone, Deserialize)]
pub struct PlayerConfig {
    pub color: TankColor,
    pub spawn_pos: Pos,
    pub control: ControlMap,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn player_config_parses_from_json() {
        let raw = r#"{
            "color": "yellow",
            "spawn_pos": { "x": 64.0, "y": 192.0 },
            "control": {
                "up": "ArrowUp",
                "down": "ArrowDown",
                "left": "ArrowLeft",
                "right": "ArrowRight",
                "fire": "Space"
            }
        }"#;
        let config: PlayerConfig = serde_json::from_str(raw).unwrap();
        assert_eq!(config.color, TankColor::Yellow);
        assert_eq!(config.spawn_pos.x, 64.0);
        assert_eq!(config.control.fire, "Space");
    }
}
