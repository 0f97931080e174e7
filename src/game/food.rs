//! Food placement strategies and the fractional food accumulator.

use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::str::FromStr;

use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::error::{ConsistencyError, MapFormatError};
use crate::game::fraction::Fraction;
use crate::game::map::{Cell, Grid};
use crate::game::torus::{Direction, Loc, Offset, Torus};
use crate::game::world::World;

/// Attempts per placement before a random pick gives up.
const PLACEMENT_TRIES: usize = 10;

/// How new food is introduced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FoodStrategy {
    /// No food beyond what the map starts with.
    None,
    /// Uniformly random land cells.
    Random,
    /// Random cells inside each player's starting region.
    Sections,
    /// Sets of cells related by the translation between starting positions.
    #[default]
    Symmetric,
}

impl FoodStrategy {
    /// All strategies.
    pub const ALL: [FoodStrategy; 4] = [Self::None, Self::Random, Self::Sections, Self::Symmetric];

    /// Lowercase name used in options and on the command line.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Random => "random",
            Self::Sections => "sections",
            Self::Symmetric => "symmetric",
        }
    }
}

impl fmt::Display for FoodStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FoodStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|strategy| strategy.name() == s)
            .ok_or_else(|| format!("unknown food strategy: {s}"))
    }
}

/// Carries the fractional part of the per-turn food rate between turns.
///
/// Each turn adds `rate·N/turn` food items; whole rounds of `N` items are
/// spawned and the remainder is kept exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FoodAccumulator {
    extra: Fraction,
    per_turn: Fraction,
    players: i128,
}

impl FoodAccumulator {
    /// Accumulator for `food_rate` items per player every `food_turn` turns.
    ///
    /// # Panics
    ///
    /// Panics if `food_turn` is zero.
    #[must_use]
    pub fn new(food_rate: u32, food_turn: u32, num_players: usize) -> Self {
        let players = i128::try_from(num_players).unwrap_or(i128::MAX);
        Self {
            extra: Fraction::ZERO,
            per_turn: Fraction::new(i128::from(food_rate) * players, i128::from(food_turn)),
            players,
        }
    }

    /// Food added per turn, in items.
    #[must_use]
    pub const fn per_turn(&self) -> Fraction {
        self.per_turn
    }

    /// Carried remainder, in items, always in `0..N`.
    #[must_use]
    pub const fn extra(&self) -> Fraction {
        self.extra
    }

    /// Add one turn of food and take out the whole rounds.
    pub fn advance(&mut self) -> u32 {
        self.extra += self.per_turn;
        let rounds = (self.extra.numer() / (self.extra.denom() * self.players)).max(0);
        self.extra -= Fraction::from_int(rounds * self.players);
        u32::try_from(rounds).unwrap_or(u32::MAX)
    }
}

/// A list of food sets handed out round-robin, reshuffled every cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
struct FoodCycle {
    sets: Vec<Vec<Loc>>,
    next: usize,
}

impl FoodCycle {
    const fn new(sets: Vec<Vec<Loc>>) -> Self {
        Self { sets, next: 0 }
    }

    fn take<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<&[Loc]> {
        if self.sets.is_empty() {
            return None;
        }
        if self.next == 0 {
            self.sets.shuffle(rng);
        }
        let idx = self.next;
        self.next = (self.next + 1) % self.sets.len();
        Some(&self.sets[idx])
    }
}

/// Places food according to a [`FoodStrategy`].
#[derive(Debug, Clone)]
pub struct FoodSpawner {
    strategy: FoodStrategy,
    num_players: usize,
    /// Cells each player reaches strictly first, for `sections`.
    access: Vec<Vec<Loc>>,
    /// All symmetric sets, for `symmetric`.
    symmetric: FoodCycle,
    /// Symmetric sets near the starting ants, for the opening food.
    visible: FoodCycle,
    /// Food owed to cells that were blocked when their set came up.
    pending: BTreeMap<Loc, u32>,
}

impl FoodSpawner {
    /// Prepare the spawner from the starting grid.
    ///
    /// `starts` holds every player's starting ants, row-major.
    ///
    /// # Errors
    ///
    /// Returns [`MapFormatError::Asymmetric`] if the strategy is symmetric
    /// and the map does not repeat under the start translation.
    pub fn new(
        strategy: FoodStrategy,
        grid: &Grid,
        starts: &[Vec<Loc>],
        viewradius2: u32,
    ) -> Result<Self, MapFormatError> {
        let num_players = starts.len();
        let access = if strategy == FoodStrategy::Sections {
            access_map(grid, num_players)
        } else {
            Vec::new()
        };
        let symmetric = if strategy == FoodStrategy::Symmetric {
            symmetric_sets(grid, starts, None)?
        } else {
            Vec::new()
        };
        let visible = if strategy == FoodStrategy::None {
            Vec::new()
        } else {
            symmetric_sets(grid, starts, Some(viewradius2))?
        };
        Ok(Self {
            strategy,
            num_players,
            access,
            symmetric: FoodCycle::new(symmetric),
            visible: FoodCycle::new(visible),
            pending: BTreeMap::new(),
        })
    }

    /// Active strategy.
    #[must_use]
    pub const fn strategy(&self) -> FoodStrategy {
        self.strategy
    }

    /// Food still owed, per cell.
    #[must_use]
    pub fn pending(&self) -> &BTreeMap<Loc, u32> {
        &self.pending
    }

    /// Opening food: `food_visible` rounds near the starting ants, then the
    /// strategy fills the map up to `land_area / food_start` items.
    ///
    /// # Errors
    ///
    /// Propagates [`ConsistencyError`] from the registry.
    pub fn start<R: Rng + ?Sized>(
        &mut self,
        world: &mut World,
        rng: &mut R,
        food_visible: u32,
        food_start: u32,
    ) -> Result<usize, ConsistencyError> {
        if self.strategy == FoodStrategy::None {
            return Ok(0);
        }
        let land_area = world.grid().land_area();
        let per_player = land_area / food_start.max(1) as usize / self.num_players.max(1);
        let rounds = u32::try_from(per_player)
            .unwrap_or(u32::MAX)
            .saturating_sub(food_visible);
        let mut placed = 0;
        for _ in 0..food_visible {
            if let Some(set) = self.visible.take(rng) {
                for &loc in set {
                    *self.pending.entry(loc).or_insert(0) += 1;
                }
            }
        }
        placed += self.place_pending(world)?;
        placed += self.spawn(world, rng, rounds)?;
        Ok(placed)
    }

    /// Place `rounds` rounds of food (one item per player per round).
    ///
    /// # Errors
    ///
    /// Propagates [`ConsistencyError`] from the registry.
    pub fn spawn<R: Rng + ?Sized>(
        &mut self,
        world: &mut World,
        rng: &mut R,
        rounds: u32,
    ) -> Result<usize, ConsistencyError> {
        match self.strategy {
            FoodStrategy::None => Ok(0),
            FoodStrategy::Random => spawn_random(world, rng, rounds as usize * self.num_players),
            FoodStrategy::Sections => self.spawn_sections(world, rng, rounds),
            FoodStrategy::Symmetric => {
                for _ in 0..rounds {
                    if let Some(set) = self.symmetric.take(rng) {
                        for &loc in set {
                            *self.pending.entry(loc).or_insert(0) += 1;
                        }
                    }
                }
                self.place_pending(world)
            }
        }
    }

    fn spawn_sections<R: Rng + ?Sized>(
        &self,
        world: &mut World,
        rng: &mut R,
        rounds: u32,
    ) -> Result<usize, ConsistencyError> {
        let mut placed = 0;
        for _ in 0..rounds {
            for region in &self.access {
                if region.is_empty() {
                    continue;
                }
                for _ in 0..PLACEMENT_TRIES {
                    let Some(&loc) = region.choose(rng) else {
                        break;
                    };
                    if world.grid().get(loc) == Cell::Land {
                        world.add_food(loc)?;
                        placed += 1;
                        break;
                    }
                }
            }
        }
        Ok(placed)
    }

    /// Place one item on every pending cell that is free.
    fn place_pending(&mut self, world: &mut World) -> Result<usize, ConsistencyError> {
        let mut placed = 0;
        let free: Vec<Loc> = self
            .pending
            .keys()
            .copied()
            .filter(|&loc| world.grid().get(loc) == Cell::Land)
            .collect();
        for loc in free {
            world.add_food(loc)?;
            placed += 1;
            if let Some(count) = self.pending.get_mut(&loc) {
                *count -= 1;
                if *count == 0 {
                    self.pending.remove(&loc);
                }
            }
        }
        Ok(placed)
    }
}

fn spawn_random<R: Rng + ?Sized>(
    world: &mut World,
    rng: &mut R,
    amount: usize,
) -> Result<usize, ConsistencyError> {
    let torus = world.torus();
    let mut placed = 0;
    for _ in 0..amount {
        for _ in 0..PLACEMENT_TRIES {
            let loc = Loc::new(rng.gen_range(0..torus.rows()), rng.gen_range(0..torus.cols()));
            if world.grid().get(loc) == Cell::Land {
                world.add_food(loc)?;
                placed += 1;
                break;
            }
        }
    }
    Ok(placed)
}

/// Cells each player can reach strictly before every other player.
///
/// Multi-source breadth-first search from every ant on the grid, walking
/// the four compass directions with water as walls. A cell reached at the
/// same distance from several players belongs to nobody.
#[must_use]
pub fn access_map(grid: &Grid, num_players: usize) -> Vec<Vec<Loc>> {
    let torus = grid.torus();
    let mut distance: Vec<Option<u32>> = vec![None; torus.area()];
    let mut owners: Vec<u32> = vec![0; torus.area()];
    let mut queue = VecDeque::new();

    for (loc, cell) in grid.iter() {
        if let Cell::Ant(owner) = cell {
            let idx = torus.index(loc);
            distance[idx] = Some(0);
            owners[idx] |= 1 << owner;
            queue.push_back(loc);
        }
    }

    while let Some(current) = queue.pop_front() {
        let c_idx = torus.index(current);
        let Some(c_dist) = distance[c_idx] else {
            continue;
        };
        for direction in Direction::ALL {
            let next = torus.destination(current, direction);
            if grid.get(next) == Cell::Water {
                continue;
            }
            let n_idx = torus.index(next);
            match distance[n_idx] {
                None => {
                    distance[n_idx] = Some(c_dist + 1);
                    owners[n_idx] |= owners[c_idx];
                    queue.push_back(next);
                }
                Some(n_dist) if n_dist == c_dist + 1 => owners[n_idx] |= owners[c_idx],
                Some(_) => {}
            }
        }
    }

    let mut regions = vec![Vec::new(); num_players];
    for (idx, &mask) in owners.iter().enumerate() {
        if mask.count_ones() == 1 {
            let player = mask.trailing_zeros() as usize;
            if let Some(region) = regions.get_mut(player) {
                region.push(torus.loc(idx));
            }
        }
    }
    regions
}

/// The translation between the first ant of player 0 and of player 1.
///
/// A single-player map uses the point mirrored through the origin as the
/// second start.
#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
fn start_translation(torus: Torus, starts: &[Vec<Loc>]) -> Offset {
    let Some(&first) = starts.first().and_then(|ants| ants.first()) else {
        return Offset::ORIGIN;
    };
    let second = starts
        .get(1)
        .and_then(|ants| ants.first().copied())
        .unwrap_or_else(|| {
            torus.offset(
                Loc::new(0, 0),
                Offset::new(-(first.row as i32), -(first.col as i32)),
            )
        });
    Offset::new(
        first.row as i32 - second.row as i32,
        first.col as i32 - second.col as i32,
    )
}

/// Partition the map into sets `{c + n·t | n < N}` for the start
/// translation `t`, dropping sets that touch water.
///
/// With `near_starts = Some(r2)` only cells within `r2` of a starting ant are
/// used and a set that would reuse a cell is skipped. Otherwise reuse means
/// the map is not symmetric.
fn symmetric_sets(
    grid: &Grid,
    starts: &[Vec<Loc>],
    near_starts: Option<u32>,
) -> Result<Vec<Vec<Loc>>, MapFormatError> {
    let torus = grid.torus();
    let num_players = i32::try_from(starts.len()).unwrap_or(i32::MAX);
    let translation = start_translation(torus, starts);
    let start_ants: Vec<Loc> = starts.iter().flatten().copied().collect();
    let mut visited = vec![false; torus.area()];
    let mut sets = Vec::new();

    'cells: for loc in torus.locs() {
        if visited[torus.index(loc)] {
            continue;
        }
        if let Some(radius2) = near_starts {
            if !start_ants.iter().any(|&ant| torus.distance(ant, loc) <= radius2) {
                continue;
            }
        }
        let mut set = Vec::with_capacity(starts.len());
        for n in 0..num_players {
            let member = torus.offset(
                loc,
                Offset::new(n * translation.d_row, n * translation.d_col),
            );
            let idx = torus.index(member);
            if visited[idx] {
                if near_starts.is_some() {
                    continue 'cells;
                }
                return Err(MapFormatError::Asymmetric);
            }
            visited[idx] = true;
            set.push(member);
        }
        if set.iter().all(|&member| grid.get(member) != Cell::Water) {
            sets.push(set);
        }
    }
    Ok(sets)
}
