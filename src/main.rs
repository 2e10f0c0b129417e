//! Tank Arena Server - per-player control and lifecycle coordination
//!
//! Wires the shared store, the input hub, the tick driver, and one local
//! human player session, then runs until a shutdown signal arrives and tears
//! the sessions down.

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tank_arena_server::config::{Config, PlayerConfig};
use tank_arena_server::game::{Pos, TankColor, TickDriver};
use tank_arena_server::input::InputHub;
use tank_arena_server::player::{session, SessionRegistry};
use tank_arena_server::store::Store;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;
    init_tracing(&config.log_level);

    info!("Starting Tank Arena Server");
    info!(tick_rate = config.tick_rate, "simulation configured");

    let store = Store::new();
    let hub = InputHub::new();
    let registry = Arc::new(SessionRegistry::new());

    let player_config = PlayerConfig {
        color: TankColor::Yellow,
        spawn_pos: Pos { x: 64.0, y: 192.0 },
        control: config.player_one_controls.clone(),
    };
    let handle = session::spawn(
        store.clone(),
        &hub,
        "player-1".to_string(),
        config.starting_lives,
        player_config,
    );
    registry.insert("player-1".to_string(), handle);

    let driver = TickDriver::new(store.clone(), config.tick_rate);
    let driver_task = tokio::spawn(driver.run());

    shutdown_signal().await;

    info!("shutting down sessions");
    driver_task.abort();
    registry.shutdown_all().await;

    info!("Server shutdown complete");
    Ok(())
}

/// Initialize tracing/logging
fn init_tracing(log_level: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        }
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        }
    }
}
