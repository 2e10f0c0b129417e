//! Shared game-state store: snapshot reads and serialized action dispatch
//!
//! All mutation flows through [`Store::dispatch`] as discrete actions; the
//! write lock serializes concurrent dispatches, and every applied action is
//! echoed on a broadcast channel so coordinators can wait for matching
//! actions. Snapshot reads clone, so a snapshot may be stale by the time a
//! derived dispatch lands; callers must tolerate that.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::broadcast;

use crate::game::{KillRecord, PlayerRecord, PowerUp, TankId, TankRecord};

/// Capacity of the action echo channel; slow subscribers lag rather than
/// block dispatch
const ACTION_CHANNEL_CAPACITY: usize = 256;

/// Payload of a HIT signal
#[derive(Debug, Clone)]
pub struct HitPayload {
    pub source_player: PlayerRecord,
    pub source_tank: TankRecord,
    pub target_player: PlayerRecord,
    pub target_tank: TankRecord,
}

/// Actions applied to the store, plus the game-loop signals that travel the
/// same bus but leave the state untouched
#[derive(Debug, Clone)]
pub enum Action {
    AddPlayer(PlayerRecord),
    RemovePlayer {
        player_name: String,
    },
    ActivatePlayer {
        player_name: String,
        tank_id: TankId,
    },
    AddTank(TankRecord),
    DeactivateTank {
        tank_id: TankId,
    },
    DecrementPlayerLife {
        player_name: String,
    },
    SetReservedTank {
        player_name: String,
        reserved_tank: Option<TankRecord>,
    },
    AddPowerUp(PowerUp),
    PickPowerUp {
        tank: TankRecord,
        power_up: PowerUp,
        player: PlayerRecord,
    },
    Kill(KillRecord),
    SetFrozenTimeout {
        tank_id: TankId,
        frozen_timeout_ms: u64,
    },
    /// Respawn request for a player whose tank was destroyed
    ReqAddPlayerTank {
        player_name: String,
    },
    /// Explosion effect request, consumed by the renderer
    SpawnExplosion {
        tank: TankRecord,
    },
    // Game-loop signals
    Tick,
    AfterTick,
    StartStage,
    BeforeEndStage,
    Hit(HitPayload),
}

/// Everything the reducer owns
#[derive(Debug, Default)]
pub struct State {
    pub players: HashMap<String, PlayerRecord>,
    pub tanks: HashMap<TankId, TankRecord>,
    pub power_ups: Vec<PowerUp>,
    pub kills: Vec<KillRecord>,
}

/// The shared mutable game-state store
pub struct Store {
    state: RwLock<State>,
    actions: broadcast::Sender<Action>,
}

impl Store {
    pub fn new() -> Arc<Self> {
        let (actions, _) = broadcast::channel(ACTION_CHANNEL_CAPACITY);
        Arc::new(Self {
            state: RwLock::new(State::default()),
            actions,
        })
    }

    /// Apply an action under the write lock, then echo it to subscribers
    pub fn dispatch(&self, action: Action) {
        {
            let mut state = self.state.write();
            reduce(&mut state, &action);
        }
        // no subscribers is fine
        let _ = self.actions.send(action);
    }

    /// Subscribe to the stream of applied actions. Receivers filter for the
    /// actions they care about.
    pub fn subscribe(&self) -> broadcast::Receiver<Action> {
        self.actions.subscribe()
    }

    pub fn player(&self, player_name: &str) -> Option<PlayerRecord> {
        self.state.read().players.get(player_name).cloned()
    }

    /// The tank currently bound to the player, if it is still active
    pub fn player_tank(&self, player_name: &str) -> Option<TankRecord> {
        let state = self.state.read();
        let player = state.players.get(player_name)?;
        let tank = state.tanks.get(&player.active_tank_id?)?;
        tank.active.then(|| tank.clone())
    }

    pub fn tank(&self, tank_id: TankId) -> Option<TankRecord> {
        self.state.read().tanks.get(&tank_id).cloned()
    }

    pub fn power_ups(&self) -> Vec<PowerUp> {
        self.state.read().power_ups.clone()
    }

    pub fn kills(&self) -> Vec<KillRecord> {
        self.state.read().kills.clone()
    }
}

/// Single-threaded action application; lookups of entities that are already
/// gone are silent no-ops
fn reduce(state: &mut State, action: &Action) {
    match action {
        Action::AddPlayer(player) => {
            state
                .players
                .insert(player.player_name.clone(), player.clone());
        }
        Action::RemovePlayer { player_name } => {
            state.players.remove(player_name);
        }
        Action::ActivatePlayer {
            player_name,
            tank_id,
        } => {
            if let Some(player) = state.players.get_mut(player_name) {
                player.active_tank_id = Some(*tank_id);
            }
        }
        Action::AddTank(tank) => {
            state.tanks.insert(tank.tank_id, tank.clone());
        }
        Action::DeactivateTank { tank_id } => {
            // no removal; terminal cleanup belongs to the stage sweeper
            if let Some(tank) = state.tanks.get_mut(tank_id) {
                tank.active = false;
            }
        }
        Action::DecrementPlayerLife { player_name } => {
            if let Some(player) = state.players.get_mut(player_name) {
                player.lives = player.lives.saturating_sub(1);
            }
        }
        Action::SetReservedTank {
            player_name,
            reserved_tank,
        } => {
            if let Some(player) = state.players.get_mut(player_name) {
                player.reserved_tank = reserved_tank.clone();
            }
        }
        Action::AddPowerUp(power_up) => {
            state.power_ups.push(power_up.clone());
        }
        Action::PickPowerUp { power_up, .. } => {
            state
                .power_ups
                .retain(|p| p.power_up_id != power_up.power_up_id);
        }
        Action::Kill(record) => {
            state.kills.push(record.clone());
        }
        Action::SetFrozenTimeout {
            tank_id,
            frozen_timeout_ms,
        } => {
            if let Some(tank) = state.tanks.get_mut(tank_id) {
                tank.frozen_timeout_ms = *frozen_timeout_ms;
            }
        }
        // Requests and loop signals carry no state of their own
        Action::ReqAddPlayerTank { .. }
        | Action::SpawnExplosion { .. }
        | Action::Tick
        | Action::AfterTick
        | Action::StartStage
        | Action::BeforeEndStage
        | Action::Hit(_) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{Pos, PowerUpKind, Side, TankColor};

    fn spawn_tank(store: &Store) -> TankRecord {
        let tank = TankRecord::basic(Side::Human, TankColor::Yellow).spawned_at(
            TankId::next(),
            Pos { x: 0.0, y: 0.0 },
            0,
        );
        store.dispatch(Action::AddTank(tank.clone()));
        tank
    }

    #[test]
    fn lives_saturate_at_zero() {
        let store = Store::new();
        store.dispatch(Action::AddPlayer(PlayerRecord::new("p1", 1, Side::Human)));

        store.dispatch(Action::DecrementPlayerLife {
            player_name: "p1".into(),
        });
        store.dispatch(Action::DecrementPlayerLife {
            player_name: "p1".into(),
        });

        assert_eq!(store.player("p1").unwrap().lives, 0);
    }

    #[test]
    fn deactivating_a_missing_tank_is_a_no_op() {
        let store = Store::new();
        store.dispatch(Action::DeactivateTank {
            tank_id: TankId::next(),
        });
    }

    #[test]
    fn player_tank_requires_an_active_binding() {
        let store = Store::new();
        store.dispatch(Action::AddPlayer(PlayerRecord::new("p1", 3, Side::Human)));
        assert!(store.player_tank("p1").is_none());

        let tank = spawn_tank(&store);
        store.dispatch(Action::ActivatePlayer {
            player_name: "p1".into(),
            tank_id: tank.tank_id,
        });
        assert_eq!(store.player_tank("p1").unwrap().tank_id, tank.tank_id);

        store.dispatch(Action::DeactivateTank {
            tank_id: tank.tank_id,
        });
        assert!(store.player_tank("p1").is_none());
    }

    #[test]
    fn picking_a_power_up_removes_it() {
        let store = Store::new();
        let power_up = PowerUp::new(PowerUpKind::Star, 0.0, 0.0);
        store.dispatch(Action::AddPowerUp(power_up.clone()));
        store.dispatch(Action::AddPowerUp(PowerUp::new(PowerUpKind::Helmet, 32.0, 0.0)));

        let tank = spawn_tank(&store);
        store.dispatch(Action::PickPowerUp {
            tank,
            power_up,
            player: PlayerRecord::new("p1", 3, Side::Human),
        });

        let remaining = store.power_ups();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].kind, PowerUpKind::Helmet);
    }

    #[test]
    fn repeated_freeze_refreshes_the_timeout() {
        let store = Store::new();
        let tank = spawn_tank(&store);

        store.dispatch(Action::SetFrozenTimeout {
            tank_id: tank.tank_id,
            frozen_timeout_ms: 400,
        });
        store.dispatch(Action::SetFrozenTimeout {
            tank_id: tank.tank_id,
            frozen_timeout_ms: 1000,
        });

        assert_eq!(store.tank(tank.tank_id).unwrap().frozen_timeout_ms, 1000);
    }
}
