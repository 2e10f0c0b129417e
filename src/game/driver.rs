//! Game-loop tick driver

use std::sync::Arc;

use tokio::time::interval;
use tracing::info;

use crate::store::{Action, Store};
use crate::util::time::tick_duration;

/// Paces the per-tick signals the coordinators wait on. The tick's own game
/// logic (movement, bullets, collisions) runs in the systems driven by these
/// signals; the driver only emits them.
pub struct TickDriver {
    store: Arc<Store>,
    tick_rate: u32,
}

impl TickDriver {
    pub fn new(store: Arc<Store>, tick_rate: u32) -> Self {
        Self { store, tick_rate }
    }

    /// Run until the task is cancelled: StartStage once, then Tick and
    /// AfterTick every interval.
    pub async fn run(self) {
        info!(tick_rate = self.tick_rate, "tick driver started");
        self.store.dispatch(Action::StartStage);

        let mut ticks = interval(tick_duration(self.tick_rate));
        ticks.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            ticks.tick().await;
            self.store.dispatch(Action::Tick);
            self.store.dispatch(Action::AfterTick);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn driver_emits_stage_start_then_tick_pairs() {
        let store = Store::new();
        let mut actions = store.subscribe();
        let driver = tokio::spawn(TickDriver::new(store.clone(), 200).run());

        assert!(matches!(actions.recv().await, Ok(Action::StartStage)));
        assert!(matches!(actions.recv().await, Ok(Action::Tick)));
        assert!(matches!(actions.recv().await, Ok(Action::AfterTick)));
        assert!(matches!(actions.recv().await, Ok(Action::Tick)));

        driver.abort();
    }
}
