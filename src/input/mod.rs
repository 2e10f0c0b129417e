//! Device input sampling and per-tick intent resolution
//!
//! The sampler owns the only writer that sets [`InputState`] key flags.
//! The fire edge is a short latch rather than a plain flag: the tick reset
//! task ages a fresh tap at each tick boundary instead of destroying it, and
//! the movement driver's fire-check consumes it under the same lock. The
//! reset task and the fire-check are independent tasks, so whichever runs
//! first a within-tick tap is seen by exactly one fire-check. Resolvers read
//! the state through an [`InputHandle`] shared with the external per-tank
//! movement driver.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::Deserialize;
use tokio::sync::broadcast;
use tracing::warn;

use crate::game::{Direction, MovementIntent};
use crate::store::Action;

/// A raw device press/release notification
#[derive(Debug, Clone)]
pub struct KeyEvent {
    pub code: String,
    pub pressed: bool,
}

/// Fan-out point for raw device events. Samplers subscribe; dropping the
/// receiver is the unsubscribe, so a sampler task that exits on any path
/// releases its subscription.
#[derive(Clone)]
pub struct InputHub {
    events: broadcast::Sender<KeyEvent>,
}

impl InputHub {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(64);
        Self { events }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<KeyEvent> {
        self.events.subscribe()
    }

    pub fn press(&self, code: &str) {
        let _ = self.events.send(KeyEvent {
            code: code.to_string(),
            pressed: true,
        });
    }

    pub fn release(&self, code: &str) {
        let _ = self.events.send(KeyEvent {
            code: code.to_string(),
            pressed: false,
        });
    }

    /// Live subscriptions; lets teardown be verified
    pub fn subscriber_count(&self) -> usize {
        self.events.receiver_count()
    }
}

impl Default for InputHub {
    fn default() -> Self {
        Self::new()
    }
}

/// Key codes bound to the five tank controls
#[derive(Debug, Clone, Deserialize)]
pub struct ControlMap {
    pub up: String,
    pub down: String,
    pub left: String,
    pub right: String,
    pub fire: String,
}

impl ControlMap {
    /// Default bindings for the first local player
    pub fn wasd() -> Self {
        Self {
            up: "KeyW".into(),
            down: "KeyS".into(),
            left: "KeyA".into(),
            right: "KeyD".into(),
            fire: "KeyJ".into(),
        }
    }

    fn direction_for(&self, code: &str) -> Option<Direction> {
        if code == self.up {
            Some(Direction::Up)
        } else if code == self.down {
            Some(Direction::Down)
        } else if code == self.left {
            Some(Direction::Left)
        } else if code == self.right {
            Some(Direction::Right)
        } else {
            None
        }
    }

    fn is_fire(&self, code: &str) -> bool {
        code == self.fire
    }
}

/// Which direction keys are held (in press order, no duplicates) plus the
/// fire latch
#[derive(Debug, Default)]
pub struct InputState {
    pressed: Vec<Direction>,
    /// Tap latched during the current tick window
    fire_pressed_this_tick: bool,
    /// Tap from the previous window that no fire-check has consumed yet
    fire_pressed_last_tick: bool,
    fire_held: bool,
}

impl InputState {
    fn press_direction(&mut self, direction: Direction) {
        if !self.pressed.contains(&direction) {
            self.pressed.push(direction);
        }
    }

    fn release_direction(&mut self, direction: Direction) {
        self.pressed.retain(|&d| d != direction);
    }

    fn press_fire(&mut self) {
        self.fire_held = true;
        self.fire_pressed_this_tick = true;
    }

    fn release_fire(&mut self) {
        self.fire_held = false;
    }

    /// Age the latch at a tick boundary. A tap the fire-check has not seen
    /// yet survives one boundary; a consumed or stale one drops out.
    fn shift_fire_edge(&mut self) {
        self.fire_pressed_last_tick = self.fire_pressed_this_tick;
        self.fire_pressed_this_tick = false;
    }

    /// A fire-check observed the latch; a tap fires exactly once
    fn consume_fire_edge(&mut self) {
        self.fire_pressed_this_tick = false;
        self.fire_pressed_last_tick = false;
    }

    /// Most recently pressed direction still held
    fn last_pressed(&self) -> Option<Direction> {
        self.pressed.last().copied()
    }
}

/// Decide this tick's movement from the held keys; the most recent press
/// still held wins.
pub fn resolve(state: &InputState, facing: Direction) -> MovementIntent {
    match state.last_pressed() {
        Some(direction) if direction == facing => MovementIntent::Forward,
        Some(direction) => MovementIntent::Turn(direction),
        None => MovementIntent::Idle,
    }
}

/// Fire if the control is held now or an unconsumed tap is latched; a tap
/// released before the fire-check still counts.
pub fn should_fire(state: &InputState) -> bool {
    state.fire_pressed_this_tick || state.fire_pressed_last_tick || state.fire_held
}

/// Shared read view of one player's input state, handed to the external
/// movement driver
#[derive(Clone, Default)]
pub struct InputHandle {
    state: Arc<Mutex<InputState>>,
}

impl InputHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn movement_intent(&self, facing: Direction) -> MovementIntent {
        resolve(&self.state.lock(), facing)
    }

    /// Consuming fire-check for this tank-tick. The read and the latch clear
    /// happen under one lock, so the tick reset task can never interleave
    /// between them.
    pub fn should_fire(&self) -> bool {
        let mut state = self.state.lock();
        let fire = should_fire(&state);
        state.consume_fire_edge();
        fire
    }
}

/// Mutate the input state from raw device events until the hub closes.
/// Key codes outside the control mapping produce no effect.
pub async fn sample(
    mut events: broadcast::Receiver<KeyEvent>,
    controls: ControlMap,
    handle: InputHandle,
) {
    loop {
        match events.recv().await {
            Ok(event) => {
                let mut state = handle.state.lock();
                if controls.is_fire(&event.code) {
                    if event.pressed {
                        state.press_fire();
                    } else {
                        state.release_fire();
                    }
                } else if let Some(direction) = controls.direction_for(&event.code) {
                    if event.pressed {
                        state.press_direction(direction);
                    } else {
                        state.release_direction(direction);
                    }
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "input sampler lagged, key events dropped");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

/// Age the fire latch at every tick boundary. This task runs concurrently
/// with the tick's fire-checks, so it shifts the latch instead of clearing
/// it: an unseen tap stays visible for one more window and is dropped only
/// after a fire-check consumed it or a full window passed without one.
pub async fn reset_fire_each_tick(mut actions: broadcast::Receiver<Action>, handle: InputHandle) {
    loop {
        match actions.recv().await {
            Ok(Action::Tick) => handle.state.lock().shift_fire_edge(),
            Ok(_) => {}
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "fire reset lagged, tick signals dropped");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn most_recent_held_direction_wins() {
        let mut state = InputState::default();
        state.press_direction(Direction::Left);
        state.press_direction(Direction::Up);
        assert_eq!(
            resolve(&state, Direction::Down),
            MovementIntent::Turn(Direction::Up)
        );

        state.release_direction(Direction::Up);
        assert_eq!(
            resolve(&state, Direction::Down),
            MovementIntent::Turn(Direction::Left)
        );
    }

    #[test]
    fn facing_the_held_direction_moves_forward() {
        let mut state = InputState::default();
        state.press_direction(Direction::Right);
        assert_eq!(resolve(&state, Direction::Right), MovementIntent::Forward);
    }

    #[test]
    fn no_keys_held_is_idle() {
        let state = InputState::default();
        assert_eq!(resolve(&state, Direction::Up), MovementIntent::Idle);
    }

    #[test]
    fn repeated_press_does_not_reorder() {
        let mut state = InputState::default();
        state.press_direction(Direction::Left);
        state.press_direction(Direction::Up);
        state.press_direction(Direction::Left);
        assert_eq!(
            resolve(&state, Direction::Down),
            MovementIntent::Turn(Direction::Up)
        );
    }

    #[test]
    fn tap_within_one_tick_still_fires() {
        let mut state = InputState::default();
        state.press_fire();
        state.release_fire();
        assert!(should_fire(&state));

        // consumed by this tick's fire-check, gone at the next boundary
        state.consume_fire_edge();
        state.shift_fire_edge();
        assert!(!should_fire(&state));
    }

    #[test]
    fn held_fire_keeps_firing_across_ticks() {
        let mut state = InputState::default();
        state.press_fire();
        state.consume_fire_edge();
        state.shift_fire_edge();
        assert!(should_fire(&state));
        state.release_fire();
        assert!(!should_fire(&state));
    }

    #[test]
    fn tick_boundary_never_clears_an_unseen_tap() {
        let handle = InputHandle::new();
        {
            let mut state = handle.state.lock();
            state.press_fire();
            state.release_fire();
        }

        // the boundary task can beat the movement driver's fire-check
        handle.state.lock().shift_fire_edge();
        assert!(handle.should_fire(), "tap survives one tick boundary");
        assert!(!handle.should_fire(), "a consumed tap fires exactly once");
    }

    #[test]
    fn unconsumed_tap_goes_stale_after_a_full_window() {
        let mut state = InputState::default();
        state.press_fire();
        state.release_fire();

        state.shift_fire_edge();
        state.shift_fire_edge();
        assert!(!should_fire(&state));
    }

    #[tokio::test]
    async fn sampler_applies_the_control_mapping() {
        let hub = InputHub::new();
        let handle = InputHandle::new();
        let sampler = tokio::spawn(sample(
            hub.subscribe(),
            ControlMap::wasd(),
            handle.clone(),
        ));

        hub.press("KeyJ");
        hub.release("KeyJ");
        hub.press("Escape"); // unmapped, ignored
        hub.press("KeyA");

        // events arrive in order, so once the trailing press is visible the
        // fire tap has been sampled too
        let deadline = tokio::time::Instant::now() + std::time::Duration::from_secs(1);
        while handle.movement_intent(Direction::Up) != MovementIntent::Turn(Direction::Left)
            && tokio::time::Instant::now() < deadline
        {
            tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        }

        assert_eq!(
            handle.movement_intent(Direction::Up),
            MovementIntent::Turn(Direction::Left)
        );
        assert!(handle.should_fire());

        sampler.abort();
    }
}
