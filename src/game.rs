//! Game layer for Formica.
//!
//! Implements the rules on a toroidal grid:
//! - Map parsing and the content grid
//! - Entity registry for ants and food
//! - Per-player fog of war, updated incrementally
//! - Order validation, simultaneous movement and collisions
//! - Pluggable combat and food placement strategies
//! - Exact fractional scoring with per-turn commit

mod combat;
mod entities;
mod food;
mod fraction;
mod invariants;
mod map;
mod movement;
mod options;
mod orders;
mod player;
mod state;
mod torus;
mod vision;
mod world;

pub use combat::{
    AttackStrategy, Award, CombatOutcome, resolve_closest, resolve_combat, resolve_damage, resolve_power,
    resolve_support,
};
pub use entities::{Ant, AntId, Food, FoodId};
pub use food::{FoodAccumulator, FoodSpawner, FoodStrategy, access_map};
pub use fraction::Fraction;
pub use invariants::{InvariantViolation, assert_invariants, check_invariants};
pub use map::{
    CONFLICT_CHAR, Cell, FOOD_CHAR, Grid, LAND_CHAR, MapData, PLAYER_CHARS, UNSEEN_CHAR, WATER_CHAR, parse_map,
};
pub use movement::{MovementOutcome, resolve_moves};
pub use options::{FoodSettings, GameOptions, Param};
pub use orders::{Order, OrderRejection, OrderReport, RejectedOrder, process_orders};
pub use player::{Perspective, Player, PlayerId};
pub use state::{GameState, GameStats, Phase, TurnSummary};
pub use torus::{Direction, Loc, Offset, Torus, order_string};
pub use vision::{Vision, VisionOffsets};
pub use world::{AntOrigin, Collision, World};
