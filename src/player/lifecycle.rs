//! Per-player lifecycle: stage boundaries, hit response, respawn
//!
//! Each watcher is a forever loop over a filtered action subscription. Every
//! snapshot read can be stale by the time the derived dispatch lands, so a
//! missing tank anywhere here is a silent no-op, never an error.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::config::PlayerConfig;
use crate::game::{KillMethod, KillRecord, Side, TankId, TankRecord};
use crate::store::{Action, HitPayload, Store};
use crate::util::time::frame;

/// Invulnerability window for a tank spawned at stage start
const STAGE_START_HELMET_MS: u64 = frame(135);
/// Longer window for a mid-stage respawn
const RESPAWN_HELMET_MS: u64 = frame(180);
/// Human fire is non-lethal; it freezes the target instead
const HUMAN_FROZEN_TIMEOUT_MS: u64 = 1000;

/// Spawn the player's tank at each stage start, restoring a tank carried
/// over from the previous stage when there is one.
pub async fn stage_start_loop(
    store: Arc<Store>,
    player_name: String,
    config: PlayerConfig,
    mut actions: broadcast::Receiver<Action>,
) {
    loop {
        match actions.recv().await {
            Ok(Action::StartStage) => stage_start(&store, &player_name, &config),
            Ok(_) => {}
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(player = %player_name, skipped, "stage-start watcher lagged, actions dropped");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

fn stage_start(store: &Store, player_name: &str, config: &PlayerConfig) {
    let Some(player) = store.player(player_name) else {
        return;
    };

    // Out of lives and nothing carried over: spectator for this stage
    if player.reserved_tank.is_none() && player.lives == 0 {
        debug!(player = %player_name, "no lives and no reserved tank, sitting out");
        return;
    }

    // A reserved tank re-enters without costing a life
    if player.reserved_tank.is_none() {
        store.dispatch(Action::DecrementPlayerLife {
            player_name: player_name.to_string(),
        });
    }
    store.dispatch(Action::SetReservedTank {
        player_name: player_name.to_string(),
        reserved_tank: None,
    });

    let prototype = player
        .reserved_tank
        .unwrap_or_else(|| TankRecord::basic(Side::Human, config.color));
    let tank_id = TankId::next();
    let tank = prototype.spawned_at(tank_id, config.spawn_pos, STAGE_START_HELMET_MS);

    info!(player = %player_name, tank = %tank_id, "stage start, tank spawned");
    store.dispatch(Action::AddTank(tank));
    store.dispatch(Action::ActivatePlayer {
        player_name: player_name.to_string(),
        tank_id,
    });
}

/// Carry the player's live tank across the stage boundary.
pub async fn stage_end_loop(
    store: Arc<Store>,
    player_name: String,
    mut actions: broadcast::Receiver<Action>,
) {
    loop {
        match actions.recv().await {
            Ok(Action::BeforeEndStage) => before_end_stage(&store, &player_name),
            Ok(_) => {}
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(player = %player_name, skipped, "stage-end watcher lagged, actions dropped");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

fn before_end_stage(store: &Store, player_name: &str) {
    if let Some(tank) = store.player_tank(player_name) {
        info!(player = %player_name, tank = %tank.tank_id, "stage end, tank reserved");
        store.dispatch(Action::SetReservedTank {
            player_name: player_name.to_string(),
            reserved_tank: Some(tank.clone()),
        });
        store.dispatch(Action::DeactivateTank {
            tank_id: tank.tank_id,
        });
    }
}

/// React to HIT signals aimed at this player's tank.
pub async fn hit_loop(
    store: Arc<Store>,
    player_name: String,
    mut actions: broadcast::Receiver<Action>,
) {
    loop {
        match actions.recv().await {
            Ok(Action::Hit(hit)) if hit.target_player.player_name == player_name => {
                handle_hit(&store, &player_name, &hit);
            }
            Ok(_) => {}
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(player = %player_name, skipped, "hit watcher lagged, actions dropped");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

fn handle_hit(store: &Store, player_name: &str, hit: &HitPayload) {
    // The HIT may have raced a deactivation; the tank being gone is fine
    let Some(tank) = store.player_tank(player_name) else {
        return;
    };
    debug_assert_eq!(tank.hp, 1, "a live human tank always has hp 1");

    if hit.source_player.side == Side::Human {
        // Friendly fire never kills, it freezes; a second hit refreshes
        // the timer
        debug!(player = %player_name, tank = %tank.tank_id, "frozen by friendly fire");
        store.dispatch(Action::SetFrozenTimeout {
            tank_id: tank.tank_id,
            frozen_timeout_ms: HUMAN_FROZEN_TIMEOUT_MS,
        });
        return;
    }

    info!(
        player = %player_name,
        tank = %tank.tank_id,
        source = %hit.source_player.player_name,
        "tank destroyed"
    );
    store.dispatch(Action::Kill(KillRecord {
        method: KillMethod::Bullet,
        source_player: hit.source_player.player_name.clone(),
        source_tank: hit.source_tank.tank_id,
        target_player: player_name.to_string(),
        target_tank: tank.tank_id,
    }));
    store.dispatch(Action::DeactivateTank {
        tank_id: tank.tank_id,
    });
    store.dispatch(Action::SpawnExplosion { tank: tank.clone() });
    store.dispatch(Action::ReqAddPlayerTank {
        player_name: player_name.to_string(),
    });
}

/// Answer respawn requests while the player still has lives; once they run
/// out the player stays eliminated for the rest of the stage.
pub async fn respawn_loop(
    store: Arc<Store>,
    player_name: String,
    config: PlayerConfig,
    mut actions: broadcast::Receiver<Action>,
) {
    loop {
        match actions.recv().await {
            Ok(Action::ReqAddPlayerTank {
                player_name: requested,
            }) if requested == player_name => respawn(&store, &player_name, &config),
            Ok(_) => {}
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(player = %player_name, skipped, "respawn watcher lagged, actions dropped");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

fn respawn(store: &Store, player_name: &str, config: &PlayerConfig) {
    let Some(player) = store.player(player_name) else {
        return;
    };
    if player.lives == 0 {
        info!(player = %player_name, "out of lives, eliminated");
        return;
    }

    store.dispatch(Action::DecrementPlayerLife {
        player_name: player_name.to_string(),
    });

    let tank_id = TankId::next();
    let tank = TankRecord::basic(Side::Human, config.color).spawned_at(
        tank_id,
        config.spawn_pos,
        RESPAWN_HELMET_MS,
    );
    info!(
        player = %player_name,
        tank = %tank_id,
        lives_left = player.lives - 1,
        "respawned"
    );
    store.dispatch(Action::AddTank(tank));
    store.dispatch(Action::ActivatePlayer {
        player_name: player_name.to_string(),
        tank_id,
    });
}
