//! Line protocol between the engine and agents.
//!
//! The engine side renders per-player views of the game. The agent side
//! parses them back into a [`BotWorld`] and produces order lines.
//!
//! ```text
//! engine                               agent
//!   | setup block + "ready"        -->   |
//!   |                              <--   | "go"
//!   | turn changes + "go"          -->   |
//!   |                              <--   | "o <row> <col> <dir>" lines, "go"
//! ```

mod client;
mod render;

pub use client::{Bot, BotDriver, BotSettings, BotWorld, ProtocolError, SeenAnt};
pub use render::{render_changes, render_map, render_setup, render_state};

/// Terminates the setup block.
pub const READY: &str = "ready";

/// Terminates a turn block.
pub const GO: &str = "go";

/// Terminates an agent's order block.
pub const END_ORDERS: &str = "go";
