//! Game invariants - sanity checks that detect bugs.
//!
//! None of these can be triggered by player input. They run after every
//! resolved turn in debug builds.

use std::collections::BTreeSet;

use crate::game::map::Cell;
use crate::game::player::Player;
use crate::game::state::GameState;
use crate::game::torus::Loc;
use crate::game::vision::Vision;
use crate::game::world::World;

/// Invariant violation error.
#[derive(Debug, Clone)]
pub struct InvariantViolation {
    /// Description of the violated invariant.
    pub message: String,
}

impl std::fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Invariant violation: {}", self.message)
    }
}

impl std::error::Error for InvariantViolation {}

fn violation(message: String) -> InvariantViolation {
    InvariantViolation { message }
}

/// Grid cells and entity records agree.
#[must_use]
pub(crate) fn check_world(world: &World) -> Vec<InvariantViolation> {
    let mut violations = Vec::new();

    let mut ant_cells = 0;
    for (loc, cell) in world.grid().iter() {
        match cell {
            Cell::Ant(owner) => {
                ant_cells += 1;
                match world.ant_at(loc) {
                    Some(ant) if ant.owner == owner && ant.alive => {}
                    Some(ant) => violations.push(violation(format!(
                        "cell {loc} shows player {owner} but holds ant {:?} of player {} (alive: {})",
                        ant.id, ant.owner, ant.alive
                    ))),
                    None => violations.push(violation(format!("cell {loc} shows an ant with no record"))),
                }
            }
            Cell::Food | Cell::Land | Cell::Water => {
                if world.ant_at(loc).is_some() {
                    violations.push(violation(format!("ant recorded at {loc} but cell is {cell:?}")));
                }
            }
        }
    }
    if ant_cells != world.live_ant_count() {
        violations.push(violation(format!(
            "{ant_cells} ant cells but {} live ants",
            world.live_ant_count()
        )));
    }

    let food_cells: BTreeSet<Loc> = world
        .grid()
        .iter()
        .filter(|&(_, cell)| cell == Cell::Food)
        .map(|(loc, _)| loc)
        .collect();
    let live_food: BTreeSet<Loc> = world.live_food().map(|food| food.loc).collect();
    if food_cells != live_food {
        violations.push(violation(format!(
            "{} food cells but {} live food records",
            food_cells.len(),
            live_food.len()
        )));
    }

    let dead = world.ants().iter().filter(|ant| !ant.alive).count();
    if world.live_ant_count() != world.ants().len() - dead {
        violations.push(violation(format!(
            "{} live ants, {} created, {dead} killed",
            world.live_ant_count(),
            world.ants().len()
        )));
    }

    violations
}

/// Incremental see-counts agree with a full recompute.
#[must_use]
pub(crate) fn check_vision(vision: &Vision, world: &World) -> Vec<InvariantViolation> {
    if vision.matches_recompute(world) {
        Vec::new()
    } else {
        vec![violation("vision counts diverged from recompute".to_string())]
    }
}

/// Committed scores never go down.
#[must_use]
pub(crate) fn check_scores(players: &[Player]) -> Vec<InvariantViolation> {
    players
        .iter()
        .filter(|player| player.history.windows(2).any(|pair| pair[1] < pair[0]))
        .map(|player| violation(format!("player {} score history decreases", player.id)))
        .collect()
}

/// Check all game invariants.
///
/// Returns a list of violations found, or empty if all invariants hold.
#[must_use]
pub fn check_invariants(state: &GameState) -> Vec<InvariantViolation> {
    let mut violations = check_world(state.world());
    violations.extend(check_vision(state.vision(), state.world()));
    violations.extend(check_scores(state.players()));
    if !state.accumulator_in_range() {
        violations.push(violation(format!(
            "food remainder {} outside 0..{}",
            state.food_accumulator().extra(),
            state.num_players()
        )));
    }
    violations
}

/// Assert all game invariants hold, panicking if any are violated.
///
/// Only active in debug builds. No-op in release builds.
///
/// # Panics
///
/// Panics with detailed message if any invariant is violated.
#[cfg(debug_assertions)]
pub fn assert_invariants(state: &GameState) {
    let violations = check_invariants(state);
    if !violations.is_empty() {
        let messages: Vec<_> = violations.iter().map(|v| v.message.as_str()).collect();
        panic!("Game invariant violations:\n  - {}", messages.join("\n  - "));
    }
}

/// No-op in release builds.
#[cfg(not(debug_assertions))]
pub fn assert_invariants(_state: &GameState) {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::fraction::Fraction;
    use crate::game::map::Grid;
    use crate::game::options::GameOptions;
    use crate::game::torus::{Direction, Torus};
    use crate::game::world::AntOrigin;
    use std::collections::BTreeMap;

    fn world_with_pair() -> World {
        let mut world = World::new(Grid::new(Torus::new(6, 6).unwrap()), &[4]);
        world.add_ant(AntOrigin::Loc(Loc::new(2, 2)), 0).unwrap();
        world.add_ant(AntOrigin::Loc(Loc::new(2, 4)), 1).unwrap();
        world.add_food(Loc::new(4, 4)).unwrap();
        world
    }

    #[test]
    fn test_valid_game_passes() {
        let text = "rows 4\ncols 8\nm a.......\nm ........\nm ....b...\nm ........\n";
        let mut game = GameState::from_map_text(text, GameOptions::default()).unwrap();
        game.start_game().unwrap();
        assert!(check_invariants(&game).is_empty());
    }

    #[test]
    fn test_valid_world_passes() {
        assert!(check_world(&world_with_pair()).is_empty());
    }

    #[test]
    fn test_unkilled_collision_detected() {
        let mut world = world_with_pair();
        let orders = BTreeMap::from([
            (Loc::new(2, 2), Direction::East),
            (Loc::new(2, 4), Direction::West),
        ]);
        // Colliders leave the index but stay alive until the movement phase
        // kills them.
        let collisions = world.move_ants(&orders);
        assert_eq!(collisions.len(), 1);
        let violations = check_world(&world);
        assert!(!violations.is_empty());
        assert!(violations[0].message.contains("killed"));
    }

    #[test]
    fn test_stale_vision_detected() {
        let world = world_with_pair();
        let vision = Vision::new(world.torus(), 4, 2);
        let violations = check_vision(&vision, &world);
        assert_eq!(violations.len(), 1);
    }

    #[test]
    fn test_decreasing_history_detected() {
        let mut player = Player::new(0, 2);
        player.history.push(Fraction::from_int(3));
        player.history.push(Fraction::from_int(2));
        let violations = check_scores(&[player]);
        assert!(violations[0].message.contains("decreases"));
    }
}
