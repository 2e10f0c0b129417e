//! Per-player control and lifecycle coordination for a tick-driven tank
//! arcade game.
//!
//! Each human player is driven by a [`player::session`] task group that
//! samples device input, resolves per-tick movement and fire intents, and
//! walks the tank through its lifecycle (spawn, hit response, respawn,
//! stage carry-over) against the shared [`store::Store`].

pub mod config;
pub mod game;
pub mod input;
pub mod player;
pub mod store;
pub mod util;
