//! Player session: task group ownership and guaranteed teardown
//!
//! A session forks every per-player watcher into one `JoinSet` and joins
//! them fail-fast: the first child to finish (or panic) ends the session and
//! cancels the rest. Teardown (deactivate the active tank, deregister the
//! player) is held in a drop guard so it runs exactly once on every exit
//! path, including abort of the session task itself.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{info, warn};

use crate::config::PlayerConfig;
use crate::game::{PlayerRecord, Side};
use crate::input::{self, InputHandle, InputHub};
use crate::player::{lifecycle, pickup};
use crate::store::{Action, Store};

/// Control handle for a running session
pub struct SessionHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
    input: InputHandle,
}

impl SessionHandle {
    /// Ask the session to wind down; teardown runs before the task exits
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }

    /// Wait for the session task to finish
    pub async fn join(self) {
        let _ = self.task.await;
    }

    /// Input view for the external per-tank movement driver
    pub fn input(&self) -> InputHandle {
        self.input.clone()
    }
}

/// Register the player and fork the session task group.
///
/// Every subscription is taken synchronously here, so a signal dispatched
/// right after `spawn` returns is never missed by the watchers.
pub fn spawn(
    store: Arc<Store>,
    hub: &InputHub,
    player_name: String,
    lives: u32,
    config: PlayerConfig,
) -> SessionHandle {
    store.dispatch(Action::AddPlayer(PlayerRecord::new(
        player_name.clone(),
        lives,
        Side::Human,
    )));
    info!(player = %player_name, lives, "player registered");

    let key_events = hub.subscribe();
    let input = InputHandle::new();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let mut tasks = JoinSet::new();
    tasks.spawn(pickup::pickup_loop(
        store.clone(),
        player_name.clone(),
        store.subscribe(),
    ));
    tasks.spawn(lifecycle::stage_start_loop(
        store.clone(),
        player_name.clone(),
        config.clone(),
        store.subscribe(),
    ));
    tasks.spawn(lifecycle::stage_end_loop(
        store.clone(),
        player_name.clone(),
        store.subscribe(),
    ));
    tasks.spawn(lifecycle::hit_loop(
        store.clone(),
        player_name.clone(),
        store.subscribe(),
    ));
    tasks.spawn(lifecycle::respawn_loop(
        store.clone(),
        player_name.clone(),
        config.clone(),
        store.subscribe(),
    ));
    tasks.spawn(input::sample(key_events, config.control, input.clone()));
    tasks.spawn(input::reset_fire_each_tick(store.subscribe(), input.clone()));

    let task = tokio::spawn(run(store, player_name, tasks, shutdown_rx));
    SessionHandle {
        shutdown: shutdown_tx,
        task,
        input,
    }
}

async fn run(
    store: Arc<Store>,
    player_name: String,
    mut tasks: JoinSet<()>,
    mut shutdown: watch::Receiver<bool>,
) {
    let guard = Teardown {
        store,
        player_name: player_name.clone(),
    };

    tokio::select! {
        // Children run forever, so any completion means the store closed or
        // a child panicked; either way the whole group comes down
        result = tasks.join_next() => {
            if let Some(Err(e)) = result {
                if e.is_panic() {
                    warn!(player = %player_name, error = %e, "session task panicked");
                }
            }
        }
        _ = shutdown.changed() => {
            info!(player = %player_name, "session shutdown requested");
        }
    }

    tasks.shutdown().await;
    drop(guard);
}

/// Deactivates the player's tank and deregisters the player exactly once,
/// whichever way the session task exits
struct Teardown {
    store: Arc<Store>,
    player_name: String,
}

impl Drop for Teardown {
    fn drop(&mut self) {
        if let Some(tank) = self.store.player_tank(&self.player_name) {
            self.store.dispatch(Action::DeactivateTank {
                tank_id: tank.tank_id,
            });
        }
        self.store.dispatch(Action::RemovePlayer {
            player_name: self.player_name.clone(),
        });
        info!(player = %self.player_name, "player deregistered");
    }
}
