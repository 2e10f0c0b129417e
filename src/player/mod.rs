//! Per-player coordination: session task group, lifecycle, input wiring

pub mod lifecycle;
pub mod pickup;
pub mod session;

pub use session::SessionHandle;

use dashmap::DashMap;

/// Running sessions keyed by player name
pub struct SessionRegistry {
    sessions: DashMap<String, SessionHandle>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }

    pub fn insert(&self, player_name: String, handle: SessionHandle) {
        self.sessions.insert(player_name, handle);
    }

    pub fn remove(&self, player_name: &str) -> Option<SessionHandle> {
        self.sessions.remove(player_name).map(|(_, h)| h)
    }

    pub fn active_sessions(&self) -> usize {
        self.sessions.len()
    }

    /// Shut down every session and wait for each teardown to finish
    pub async fn shutdown_all(&self) {
        let names: Vec<String> = self.sessions.iter().map(|e| e.key().clone()).collect();
        for name in names {
            if let Some((_, handle)) = self.sessions.remove(&name) {
                handle.shutdown();
                handle.join().await;
            }
        }
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PlayerConfig;
    use crate::game::{Pos, TankColor};
    use crate::input::{ControlMap, InputHub};
    use crate::store::Store;

    #[tokio::test]
    async fn shutdown_all_drains_the_registry() {
        let store = Store::new();
        let hub = InputHub::new();
        let registry = SessionRegistry::new();

        let config = PlayerConfig {
            color: TankColor::Yellow,
            spawn_pos: Pos { x: 0.0, y: 0.0 },
            control: ControlMap::wasd(),
        };
        let handle = session::spawn(store.clone(), &hub, "p1".to_string(), 3, config);
        registry.insert("p1".to_string(), handle);
        assert_eq!(registry.active_sessions(), 1);

        registry.shutdown_all().await;
        assert_eq!(registry.active_sessions(), 0);
        assert!(store.player("p1").is_none());
    }
}
