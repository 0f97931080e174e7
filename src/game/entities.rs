//! Ant and food records.
//!
//! Records are never deleted: the registry keeps every ant and every food
//! item ever created so that a replay can be produced at the end of the game.

use crate::game::PlayerId;
use crate::game::torus::{Direction, Loc};

/// Creation-order index of an ant in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AntId(pub usize);

/// Creation-order index of a food item in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FoodId(pub usize);

/// An ant, alive or dead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ant {
    /// Registry index.
    pub id: AntId,
    /// Current location (location of death for dead ants).
    pub loc: Loc,
    /// Where the ant was spawned.
    pub initial_loc: Loc,
    /// Owning player.
    pub owner: PlayerId,
    /// Turn the ant was created.
    pub spawn_turn: u32,
    /// Turn the ant died.
    pub die_turn: Option<u32>,
    /// One entry per executed turn; `None` means the ant stayed.
    pub orders: Vec<Option<Direction>>,
    /// Cleared when the ant is killed.
    pub alive: bool,
}

impl Ant {
    pub(crate) fn new(id: AntId, loc: Loc, owner: PlayerId, spawn_turn: u32) -> Self {
        Self {
            id,
            loc,
            initial_loc: loc,
            owner,
            spawn_turn,
            die_turn: None,
            orders: Vec::new(),
            alive: true,
        }
    }

    /// Direction executed on the most recent turn, if the ant has moved at all.
    #[must_use]
    pub fn last_order(&self) -> Option<Option<Direction>> {
        self.orders.last().copied()
    }
}

/// A food item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Food {
    /// Registry index.
    pub id: FoodId,
    /// Cell the food occupies.
    pub loc: Loc,
    /// Turn the food appeared.
    pub start_turn: u32,
    /// Turn the food was consumed or destroyed.
    pub end_turn: Option<u32>,
    /// The ant this food turned into, if any.
    pub ant: Option<AntId>,
}

impl Food {
    pub(crate) const fn new(id: FoodId, loc: Loc, start_turn: u32) -> Self {
        Self {
            id,
            loc,
            start_turn,
            end_turn: None,
            ant: None,
        }
    }
}
