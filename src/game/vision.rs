//! Per-player fog of war.
//!
//! Each player has a grid of see-counts: the number of that player's ants
//! whose view covers the cell. A moving ant only touches the cells that
//! enter or leave its view, so an update costs O(ants · perimeter) instead
//! of O(ants · area of view).

use std::collections::BTreeSet;

use crate::game::PlayerId;
use crate::game::map::{Cell, Grid};
use crate::game::torus::{Direction, Loc, Offset, Torus};
use crate::game::world::World;

/// Offset tables for one movement direction, relative to the ant's new cell.
#[derive(Debug, Clone, PartialEq, Eq)]
struct StepOffsets {
    /// View from the cell the ant came from.
    previous: Vec<Offset>,
    /// Cells newly covered after the step.
    entering: Vec<Offset>,
    /// Cells no longer covered after the step.
    leaving: Vec<Offset>,
}

/// Precomputed view shapes for one view radius.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisionOffsets {
    full: Vec<Offset>,
    steps: [StepOffsets; 4],
}

impl VisionOffsets {
    /// Build the tables for `viewradius2` on `torus`.
    #[must_use]
    pub fn new(torus: Torus, viewradius2: u32) -> Self {
        let full: BTreeSet<Offset> = std::iter::once(Offset::ORIGIN)
            .chain(torus.offsets_within(viewradius2))
            .collect();
        let steps = Direction::ALL.map(|direction| {
            let back = -direction.offset();
            let previous: BTreeSet<Offset> =
                full.iter().map(|&o| torus.normalize(o + back)).collect();
            StepOffsets {
                entering: full.difference(&previous).copied().collect(),
                leaving: previous.difference(&full).copied().collect(),
                previous: previous.into_iter().collect(),
            }
        });
        Self {
            full: full.into_iter().collect(),
            steps,
        }
    }

    /// Every cell an ant sees, origin included.
    #[must_use]
    pub fn full(&self) -> &[Offset] {
        &self.full
    }
}

/// See-counts and reveal state for every player.
#[derive(Debug, Clone)]
pub struct Vision {
    torus: Torus,
    offsets: VisionOffsets,
    counts: Vec<Vec<u32>>,
    revealed: Vec<Vec<bool>>,
    revealed_water: Vec<Vec<Loc>>,
    /// Cells that went from unseen to seen during the current update.
    candidates: Vec<Vec<usize>>,
}

impl Vision {
    /// Blank vision (nothing seen) for `num_players`.
    #[must_use]
    pub fn new(torus: Torus, viewradius2: u32, num_players: usize) -> Self {
        let area = torus.area();
        Self {
            torus,
            offsets: VisionOffsets::new(torus, viewradius2),
            counts: vec![vec![0; area]; num_players],
            revealed: vec![vec![false; area]; num_players],
            revealed_water: vec![Vec::new(); num_players],
            candidates: vec![Vec::new(); num_players],
        }
    }

    /// See-count grid of one player, row-major.
    #[must_use]
    pub fn counts(&self, player: PlayerId) -> &[u32] {
        &self.counts[usize::from(player)]
    }

    /// Whether any of the player's ants sees `loc`.
    #[must_use]
    #[inline]
    pub fn is_visible(&self, player: PlayerId, loc: Loc) -> bool {
        self.counts[usize::from(player)][self.torus.index(loc)] > 0
    }

    /// Whether the player has ever seen `loc`.
    #[must_use]
    pub fn is_revealed(&self, player: PlayerId, loc: Loc) -> bool {
        self.revealed[usize::from(player)][self.torus.index(loc)]
    }

    /// Water first seen in the latest update, row-major.
    #[must_use]
    pub fn revealed_water(&self, player: PlayerId) -> &[Loc] {
        &self.revealed_water[usize::from(player)]
    }

    pub(crate) fn clear_revealed_water(&mut self) {
        for water in &mut self.revealed_water {
            water.clear();
        }
    }

    /// Apply this turn's births, moves and deaths to the see-counts.
    pub fn update(&mut self, world: &World) {
        let Self {
            torus,
            offsets,
            counts,
            candidates,
            ..
        } = self;
        let mut apply = |player: PlayerId, loc: Loc, shape: &[Offset], add: bool| {
            let player = usize::from(player);
            let counts = &mut counts[player];
            for &offset in shape {
                let idx = torus.index(torus.offset(loc, offset));
                if add {
                    if counts[idx] == 0 {
                        candidates[player].push(idx);
                    }
                    counts[idx] += 1;
                } else {
                    debug_assert!(counts[idx] > 0, "vision count underflow");
                    counts[idx] = counts[idx].saturating_sub(1);
                }
            }
        };

        for ant in world.live_ants() {
            match ant.last_order() {
                None => apply(ant.owner, ant.loc, &offsets.full, true),
                Some(Some(direction)) => {
                    let step = &offsets.steps[direction.index()];
                    apply(ant.owner, ant.loc, &step.entering, true);
                    apply(ant.owner, ant.loc, &step.leaving, false);
                }
                Some(None) => {}
            }
        }
        for &id in world.killed() {
            let ant = world.ant(id);
            let previous = match ant.last_order() {
                Some(Some(direction)) => &offsets.steps[direction.index()].previous,
                _ => &offsets.full,
            };
            apply(ant.owner, ant.loc, previous, false);
        }
    }

    /// Mark newly seen cells as revealed and collect newly seen water.
    ///
    /// Only cells that are still visible after the whole update count, so a
    /// cell covered and uncovered within one turn stays unrevealed.
    pub fn reveal(&mut self, grid: &Grid) {
        for player in 0..self.counts.len() {
            let candidates = std::mem::take(&mut self.candidates[player]);
            let mut water = Vec::new();
            for idx in candidates {
                if self.counts[player][idx] > 0 && !self.revealed[player][idx] {
                    self.revealed[player][idx] = true;
                    let loc = self.torus.loc(idx);
                    if grid.get(loc) == Cell::Water {
                        water.push(loc);
                    }
                }
            }
            water.sort_unstable();
            self.revealed_water[player] = water;
        }
    }

    /// See-counts computed from scratch from the live ants.
    #[must_use]
    pub fn recompute(&self, world: &World) -> Vec<Vec<u32>> {
        let mut counts = vec![vec![0u32; self.torus.area()]; self.counts.len()];
        for ant in world.live_ants() {
            for &offset in &self.offsets.full {
                let idx = self.torus.index(self.torus.offset(ant.loc, offset));
                counts[usize::from(ant.owner)][idx] += 1;
            }
        }
        counts
    }

    /// Whether the incremental counts match a full recompute.
    #[must_use]
    pub fn matches_recompute(&self, world: &World) -> bool {
        self.recompute(world) == self.counts
    }
}
