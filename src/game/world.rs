//! Entity registry: the only code that mutates the content grid.
//!
//! A cell holding `Food` always has exactly one live food record and a cell
//! holding `Ant(p)` always has exactly one live ant of player `p`. Every
//! public mutator keeps that true or fails with a [`ConsistencyError`]
//! before touching anything.

use std::borrow::Cow;
use std::collections::BTreeMap;

use crate::error::ConsistencyError;
use crate::game::PlayerId;
use crate::game::entities::{Ant, AntId, Food, FoodId};
use crate::game::map::{Cell, Grid};
use crate::game::torus::{Direction, Loc, Offset, Torus};

/// Where a new ant comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AntOrigin {
    /// A food item that was already removed from the grid.
    Food(FoodId),
    /// A bare location; a dummy food is created and consumed there so that
    /// every ant in the replay has a food origin.
    Loc(Loc),
}

/// Ants that ended the movement phase on the same cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collision {
    /// The contested cell.
    pub loc: Loc,
    /// Every ant that moved or stayed there, in registry order.
    pub ants: Vec<AntId>,
}

/// All ants and food, plus the grid they live on.
#[derive(Debug, Clone)]
pub struct World {
    grid: Grid,
    ants: Vec<Ant>,
    foods: Vec<Food>,
    current_ants: BTreeMap<Loc, AntId>,
    current_food: BTreeMap<Loc, FoodId>,
    killed: Vec<AntId>,
    turn: u32,
    offsets: BTreeMap<u32, Vec<Offset>>,
}

impl World {
    /// An empty world on the given terrain, with neighbourhoods for the given
    /// radii cached up front.
    #[must_use]
    pub fn new(terrain: Grid, radii: &[u32]) -> Self {
        let torus = terrain.torus();
        let offsets = radii
            .iter()
            .map(|&r2| (r2, torus.offsets_within(r2)))
            .collect();
        Self {
            grid: terrain,
            ants: Vec::new(),
            foods: Vec::new(),
            current_ants: BTreeMap::new(),
            current_food: BTreeMap::new(),
            killed: Vec::new(),
            turn: 0,
            offsets,
        }
    }

    /// Grid geometry.
    #[must_use]
    pub const fn torus(&self) -> Torus {
        self.grid.torus()
    }

    /// The content grid.
    #[must_use]
    pub const fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Turn stamped on new records.
    #[must_use]
    pub const fn turn(&self) -> u32 {
        self.turn
    }

    pub(crate) fn set_turn(&mut self, turn: u32) {
        self.turn = turn;
    }

    /// Every ant ever created.
    #[must_use]
    pub fn ants(&self) -> &[Ant] {
        &self.ants
    }

    /// Every food item ever created.
    #[must_use]
    pub fn foods(&self) -> &[Food] {
        &self.foods
    }

    /// Look up an ant record.
    #[must_use]
    pub fn ant(&self, id: AntId) -> &Ant {
        &self.ants[id.0]
    }

    /// Look up a food record.
    #[must_use]
    pub fn food(&self, id: FoodId) -> &Food {
        &self.foods[id.0]
    }

    /// Live ants in row-major order of their cell.
    pub fn live_ants(&self) -> impl Iterator<Item = &Ant> + '_ {
        self.current_ants.values().map(|&id| &self.ants[id.0])
    }

    /// Number of live ants.
    #[must_use]
    pub fn live_ant_count(&self) -> usize {
        self.current_ants.len()
    }

    /// Live ant on `loc`, if any.
    #[must_use]
    pub fn ant_at(&self, loc: Loc) -> Option<&Ant> {
        self.current_ants.get(&loc).map(|&id| &self.ants[id.0])
    }

    /// Live food in row-major order of their cell.
    pub fn live_food(&self) -> impl Iterator<Item = &Food> + '_ {
        self.current_food.values().map(|&id| &self.foods[id.0])
    }

    /// Number of food items on the grid.
    #[must_use]
    pub fn live_food_count(&self) -> usize {
        self.current_food.len()
    }

    /// Ants killed since the last [`clear_killed`](Self::clear_killed).
    #[must_use]
    pub fn killed(&self) -> &[AntId] {
        &self.killed
    }

    pub(crate) fn clear_killed(&mut self) {
        self.killed.clear();
    }

    /// Offsets of every cell within `radius2`, origin excluded.
    #[must_use]
    pub fn neighbours(&self, radius2: u32) -> Cow<'_, [Offset]> {
        match self.offsets.get(&radius2) {
            Some(offsets) => Cow::Borrowed(offsets.as_slice()),
            None => Cow::Owned(self.torus().offsets_within(radius2)),
        }
    }

    /// Live ants at `0 < distance <= radius2` from `loc`, optionally
    /// skipping one owner.
    #[must_use]
    pub fn nearby_ants(&self, loc: Loc, radius2: u32, exclude: Option<PlayerId>) -> Vec<AntId> {
        let torus = self.torus();
        self.neighbours(radius2)
            .iter()
            .filter_map(|&offset| {
                let n_loc = torus.offset(loc, offset);
                match self.grid.get(n_loc) {
                    Cell::Ant(owner) if Some(owner) != exclude => self.current_ants.get(&n_loc).copied(),
                    _ => None,
                }
            })
            .collect()
    }

    /// Live ants of one player, row-major.
    #[must_use]
    pub fn player_ants(&self, player: PlayerId) -> Vec<AntId> {
        self.live_ants()
            .filter(|ant| ant.owner == player)
            .map(|ant| ant.id)
            .collect()
    }

    /// Put a food item on a land cell.
    ///
    /// # Errors
    ///
    /// Fails if the cell is not land.
    pub fn add_food(&mut self, loc: Loc) -> Result<FoodId, ConsistencyError> {
        if self.grid.get(loc) != Cell::Land {
            return Err(ConsistencyError::FoodOnOccupiedCell(loc));
        }
        let id = FoodId(self.foods.len());
        self.grid.place(loc, Cell::Food);
        self.foods.push(Food::new(id, loc, self.turn));
        self.current_food.insert(loc, id);
        Ok(id)
    }

    /// Take a food item off the grid, stamping its end turn.
    ///
    /// # Errors
    ///
    /// Fails if no food is recorded at `loc`.
    pub fn remove_food(&mut self, loc: Loc) -> Result<FoodId, ConsistencyError> {
        let id = self
            .current_food
            .remove(&loc)
            .ok_or(ConsistencyError::FoodNotFound(loc))?;
        self.grid.place(loc, Cell::Land);
        self.foods[id.0].end_turn = Some(self.turn);
        Ok(id)
    }

    /// Create an ant. Scoring is left to the caller.
    ///
    /// # Errors
    ///
    /// Fails if the target cell is not land.
    pub fn add_ant(&mut self, origin: AntOrigin, owner: PlayerId) -> Result<AntId, ConsistencyError> {
        let food = match origin {
            AntOrigin::Food(food) => food,
            AntOrigin::Loc(loc) => {
                self.add_food(loc)?;
                self.remove_food(loc)?
            }
        };
        let loc = self.foods[food.0].loc;
        if self.grid.get(loc) != Cell::Land {
            return Err(ConsistencyError::AntOnOccupiedCell(loc));
        }
        let id = AntId(self.ants.len());
        self.ants.push(Ant::new(id, loc, owner, self.turn));
        self.grid.place(loc, Cell::Ant(owner));
        self.current_ants.insert(loc, id);
        self.foods[food.0].ant = Some(id);
        Ok(id)
    }

    /// Kill an ant, recording it in this turn's killed list.
    ///
    /// With `ignore_if_absent` an ant that is no longer in the live index
    /// (a collision casualty) is still marked dead.
    ///
    /// # Errors
    ///
    /// Fails if the ant is not in the live index and `ignore_if_absent` is
    /// false.
    pub fn kill_ant(&mut self, id: AntId, ignore_if_absent: bool) -> Result<(), ConsistencyError> {
        let loc = self.ants[id.0].loc;
        let indexed = self.current_ants.get(&loc) == Some(&id);
        if !indexed && !ignore_if_absent {
            return Err(ConsistencyError::AntNotFound(loc));
        }
        if indexed {
            self.current_ants.remove(&loc);
            self.grid.place(loc, Cell::Land);
        }
        let ant = &mut self.ants[id.0];
        if ant.alive {
            ant.alive = false;
            ant.die_turn = Some(self.turn);
            self.killed.push(id);
        }
        Ok(())
    }

    /// Move every live ant at once.
    ///
    /// Ants without an entry in `orders` stay put. Each ant records the
    /// direction it executed. Cells reached by more than one ant are
    /// returned as collisions; those ants are dropped from the live index
    /// but not yet marked dead.
    pub(crate) fn move_ants(&mut self, orders: &BTreeMap<Loc, Direction>) -> Vec<Collision> {
        let torus = self.torus();
        let movers: Vec<AntId> = self.current_ants.values().copied().collect();
        for &id in &movers {
            let loc = self.ants[id.0].loc;
            self.grid.place(loc, Cell::Land);
        }

        let mut next: BTreeMap<Loc, Vec<AntId>> = BTreeMap::new();
        for &id in &movers {
            let ant = &mut self.ants[id.0];
            let order = orders.get(&ant.loc).copied();
            if let Some(direction) = order {
                ant.loc = torus.destination(ant.loc, direction);
            }
            ant.orders.push(order);
            next.entry(ant.loc).or_default().push(id);
        }

        self.current_ants.clear();
        let mut collisions = Vec::new();
        for (loc, mut ids) in next {
            if ids.len() == 1 {
                let id = ids[0];
                self.grid.place(loc, Cell::Ant(self.ants[id.0].owner));
                self.current_ants.insert(loc, id);
            } else {
                ids.sort_unstable();
                collisions.push(Collision { loc, ants: ids });
            }
        }
        collisions
    }
}
