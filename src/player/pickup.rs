//! Power-up pickup watcher

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::store::{Action, Store};

/// Margin applied to the power-up rectangle before the overlap test;
/// compensates for sub-cell alignment tolerance
const PICKUP_MARGIN: f32 = -0.5;

/// Test the player's tank against all active power-ups after every tick and
/// dispatch at most one pickup per post-tick signal.
pub async fn pickup_loop(
    store: Arc<Store>,
    player_name: String,
    mut actions: broadcast::Receiver<Action>,
) {
    loop {
        match actions.recv().await {
            Ok(Action::AfterTick) => check_pickup(&store, &player_name),
            Ok(_) => {}
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(player = %player_name, skipped, "pickup watcher lagged, actions dropped");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

fn check_pickup(store: &Store, player_name: &str) {
    let Some(tank) = store.player_tank(player_name) else {
        return;
    };
    let tank_rect = tank.rect();

    // First overlap in list order wins
    let power_up = store
        .power_ups()
        .into_iter()
        .find(|p| p.rect().inflate(PICKUP_MARGIN).overlaps(&tank_rect));

    if let Some(power_up) = power_up {
        let Some(player) = store.player(player_name) else {
            return;
        };
        debug!(player = %player_name, kind = ?power_up.kind, "power-up picked");
        store.dispatch(Action::PickPowerUp {
            tank,
            power_up,
            player,
        });
    }
}
