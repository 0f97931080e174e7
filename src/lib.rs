// Allow unwrap and unreadable literals in tests (test code is not production)
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::unreadable_literal))]
//! Formica: a deterministic rules engine for the ants colony game.
//!
//! Colonies of ants gather food, reproduce and fight on a wraparound grid.
//! Every colony is played by an external agent over a line protocol, and
//! the engine keeps one fog of war per player.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │   Runner (agents, batch, replay)    │
//! ├─────────────────────────────────────┤
//! │   Protocol (render / bot client)    │
//! ├─────────────────────────────────────┤
//! │   Game state machine                │
//! │   world · vision · combat · food    │
//! └─────────────────────────────────────┘
//! ```
//!
//! The same seeds and the same orders always produce the same game.

pub mod error;
pub mod game;
pub mod protocol;
pub mod replay;
pub mod runner;

pub use error::{ConsistencyError, GameError, MapFormatError};

// Re-export key game types at crate root for convenience
pub use game::{
    AttackStrategy, Direction, FoodStrategy, GameOptions, GameState, Loc, MapData, Phase, PlayerId,
    parse_map,
};
pub use replay::ReplaySummary;
pub use runner::{GameResult, GameRunner, RunnerConfig};
