//! Time utilities for the tick-driven simulation

use std::time::Duration;

/// Native tick rate of the game loop
pub const SIMULATION_TPS: u32 = 60;

/// Duration of one simulation tick
pub fn tick_duration(tick_rate: u32) -> Duration {
    Duration::from_micros(1_000_000 / tick_rate.max(1) as u64)
}

/// Convert a frame count at the native tick rate into milliseconds.
/// Durations tuned in frames (helmet windows, freeze timers) are stored
/// in milliseconds so they stay meaningful at other tick rates.
pub const fn frame(frames: u64) -> u64 {
    frames * 1000 / SIMULATION_TPS as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_converts_at_sixty_fps() {
        assert_eq!(frame(60), 1000);
        assert_eq!(frame(135), 2250);
        assert_eq!(frame(180), 3000);
    }

    #[test]
    fn tick_duration_never_divides_by_zero() {
        assert_eq!(tick_duration(60), Duration::from_micros(16_666));
        assert_eq!(tick_duration(0), Duration::from_micros(1_000_000));
    }
}
