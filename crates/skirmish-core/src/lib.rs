//! Skirmish - a hex-grid turn-based tactics engine
//!
//! This crate provides the core game logic for Skirmish, including:
//! - Offset hex coordinates and neighbor math
//! - Board representation with terrain, tiles and units
//! - The per-turn phase machine with full rule enforcement
//! - Turn order with initiative, elimination and victory
//! - AI players driven by a step machine
//!
//! # Architecture
//!
//! The engine is single-threaded and does no I/O. Every change of state goes
//! through `GameSession::apply_action` and comes back as a list of
//! `GameEvent`s for presentation layers to consume. It can be compiled to:
//! - Native Rust, hosted by `skirmish-runner`
//! - WebAssembly for browser front ends
//!
//! # Modules
//!
//! - [`hex`]: Offset coordinates and the six neighbor directions
//! - [`board`]: Terrain, tiles, units and movement range
//! - [`combat`]: Damage formula
//! - [`game`]: Phase state machine
//! - [`turn`]: Initiative and victory
//! - [`bot`]: AI players
//! - [`scenario`]: Map sources and game setup

pub mod actions;
pub mod board;
pub mod bot;
pub mod combat;
pub mod config;
pub mod game;
pub mod hex;
pub mod player;
pub mod scenario;
pub mod turn;
pub mod unit;
#[cfg(feature = "wasm")]
pub mod wasm;

// Re-export commonly used types
pub use actions::{GameAction, GameEvent, TurnEndReason};
pub use board::{Board, Terrain, Tile, IMPASSABLE};
pub use bot::{AiProfile, Bot, BotDifficulty, BotStep, Intent, RangePreference};
pub use combat::compute_damage;
pub use config::GameConfig;
pub use game::{GameError, GamePhase, GameSession};
pub use hex::{Direction, GridPosition};
pub use player::{PlayerId, PlayerKind, PlayerRecord, TeamId, TeamRecord};
pub use scenario::{Controller, MapSource, PlayerSetup, Scenario, SetupError, TerrainGrid, UnitPlacement};
pub use turn::{GameOutcome, InitiativePolicy, Side, TurnOrder};
pub use unit::{Unit, UnitId, UnitStats};
