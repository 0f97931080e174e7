//! Engine-side rendering.
//!
//! Every non-empty block ends with a newline. Foreign player ids are always
//! rewritten into the viewer's numbering, so global ids never reach an
//! agent.

// Allow format! with push_str for readability
#![allow(clippy::format_push_string)]

use crate::error::GameError;
use crate::game::{Cell, GameState, Loc, PLAYER_CHARS, PlayerId, UNSEEN_CHAR};

/// A transient object in a turn block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Change {
    Ant(Loc, PlayerId),
    Food(Loc),
    Dead(Loc, PlayerId),
}

impl Change {
    const fn loc(self) -> Loc {
        match self {
            Self::Ant(loc, _) | Self::Food(loc) | Self::Dead(loc, _) => loc,
        }
    }

    fn line(self) -> String {
        match self {
            Self::Ant(loc, owner) => format!("a {} {} {owner}", loc.row, loc.col),
            Self::Food(loc) => format!("f {} {}", loc.row, loc.col),
            Self::Dead(loc, owner) => format!("d {} {} {owner}", loc.row, loc.col),
        }
    }
}

/// Live ants, then food, then ants killed this turn, each group sorted.
fn state_changes(game: &GameState) -> Vec<Change> {
    let world = game.world();
    let mut ants: Vec<Change> = world
        .live_ants()
        .map(|ant| Change::Ant(ant.loc, ant.owner))
        .collect();
    ants.sort_unstable();
    let mut food: Vec<Change> = world.live_food().map(|food| Change::Food(food.loc)).collect();
    food.sort_unstable();
    let mut dead: Vec<Change> = world
        .killed()
        .iter()
        .map(|&id| {
            let ant = world.ant(id);
            Change::Dead(ant.loc, ant.owner)
        })
        .collect();
    dead.sort_unstable();

    ants.extend(food);
    ants.extend(dead);
    ants
}

fn join_lines(lines: impl IntoIterator<Item = String>) -> String {
    let mut output = String::new();
    for line in lines {
        output.push_str(&line);
        output.push('\n');
    }
    output
}

/// The setup block sent before turn 1.
///
/// The operator view (`player = None`) also carries the food parameters
/// and the full map.
#[must_use]
pub fn render_setup(game: &GameState, player: Option<PlayerId>) -> String {
    let options = game.options();
    let torus = game.world().torus();
    let mut output = String::new();
    output.push_str("turn 0\n");
    output.push_str(&format!("loadtime {}\n", options.loadtime));
    output.push_str(&format!("turntime {}\n", options.turntime));
    output.push_str(&format!("rows {}\n", torus.rows()));
    output.push_str(&format!("cols {}\n", torus.cols()));
    output.push_str(&format!("turns {}\n", options.turns));
    output.push_str(&format!("viewradius2 {}\n", options.viewradius2));
    output.push_str(&format!("attackradius2 {}\n", options.attackradius2));
    output.push_str(&format!("spawnradius2 {}\n", options.spawnradius2));
    output.push_str(&format!("player_seed {}\n", options.player_seed));
    if player.is_none() {
        let food = game.food_settings();
        output.push_str(&format!("food_rate {}\n", food.rate));
        output.push_str(&format!("food_turn {}\n", food.turn));
        output.push_str(&format!("food_start {}\n", food.start));
        for row in render_map(game, None) {
            output.push_str(&format!("m {row}\n"));
        }
    }
    output
}

/// What `player` learns this turn: newly revealed water, then every
/// visible ant, food and corpse, plus the player's own corpses anywhere.
///
/// Owners seen for the first time get the next free slot in the player's
/// numbering.
///
/// # Errors
///
/// Fails for an unknown player.
pub fn render_changes(game: &mut GameState, player: PlayerId) -> Result<String, GameError> {
    game.player(player)?;
    let vision = game.vision();
    let mut lines: Vec<String> = vision
        .revealed_water(player)
        .iter()
        .map(|loc| format!("w {} {}", loc.row, loc.col))
        .collect();
    let visible: Vec<Change> = state_changes(game)
        .into_iter()
        .filter(|&change| {
            vision.is_visible(player, change.loc()) || matches!(change, Change::Dead(_, owner) if owner == player)
        })
        .collect();

    let perspective = game.perspective_mut(player)?;
    lines.extend(visible.into_iter().map(|change| {
        match change {
            Change::Ant(loc, owner) => Change::Ant(loc, perspective.resolve(owner)),
            Change::Dead(loc, owner) => Change::Dead(loc, perspective.resolve(owner)),
            food @ Change::Food(_) => food,
        }
        .line()
    }));
    Ok(join_lines(lines))
}

/// Every ant, food item and corpse with global ids, for streaming
/// playback.
#[must_use]
pub fn render_state(game: &GameState) -> String {
    join_lines(state_changes(game).into_iter().map(Change::line))
}

/// Map rows as seen by `player`, or the full map with global ids for
/// `None` and for a player with no live ants.
///
/// Cells the player cannot see render as `?`.
#[must_use]
pub fn render_map(game: &GameState, player: Option<PlayerId>) -> Vec<String> {
    let world = game.world();
    let grid = world.grid();
    let Some(player) = player.filter(|&player| world.live_ants().any(|ant| ant.owner == player)) else {
        return grid.render_rows();
    };
    let vision = game.vision();
    let perspective = game.player(player).ok().map(|p| &p.perspective);
    let cols = grid.torus().cols();
    let mut rows = Vec::with_capacity(grid.torus().rows());
    let mut row = String::with_capacity(cols);
    for (loc, cell) in grid.iter() {
        let ch = if !vision.is_visible(player, loc) {
            UNSEEN_CHAR
        } else if let Cell::Ant(owner) = cell {
            perspective
                .and_then(|perspective| perspective.get(owner))
                .and_then(|local| PLAYER_CHARS.get(usize::from(local)))
                .map_or(UNSEEN_CHAR, |&c| char::from(c))
        } else {
            cell.render()
        };
        row.push(ch);
        if loc.col + 1 == cols {
            rows.push(std::mem::take(&mut row));
        }
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{AttackStrategy, FoodStrategy, GameOptions, Param};

    fn options(viewradius2: u32) -> GameOptions {
        GameOptions {
            attack: AttackStrategy::Damage,
            food: FoodStrategy::None,
            viewradius2,
            attackradius2: 1,
            food_rate: Param::Fixed(0),
            food_turn: Param::Fixed(10),
            food_start: Param::Fixed(100),
            food_visible: Param::Fixed(0),
            ..GameOptions::default()
        }
    }

    fn game(text: &str, viewradius2: u32) -> GameState {
        let mut game = GameState::from_map_text(text, options(viewradius2)).unwrap();
        game.start_game().unwrap();
        game
    }

    #[test]
    fn test_setup_player_view_hides_food_and_map() {
        let game = game("rows 2\ncols 2\nm a.\nm .b\n", 4);
        let setup = render_setup(&game, Some(0));
        assert!(setup.starts_with("turn 0\nloadtime 3000\nturntime 1000\nrows 2\ncols 2\n"));
        assert!(setup.ends_with("player_seed 0\n"));
        assert!(!setup.contains("food_rate"));
        assert!(!setup.contains("\nm "));
    }

    #[test]
    fn test_setup_operator_view() {
        let game = game("rows 2\ncols 2\nm a%\nm .b\n", 4);
        let setup = render_setup(&game, None);
        assert!(setup.contains("food_rate 0\nfood_turn 10\nfood_start 100\n"));
        assert!(setup.ends_with("m a%\nm .b\n"));
    }

    #[test]
    fn test_first_changes_include_water() {
        let mut game = game("rows 3\ncols 3\nm a%.\nm ...\nm ...\n", 1);
        let changes = render_changes(&mut game, 0).unwrap();
        assert_eq!(changes, "w 0 1\na 0 0 0\n");
    }

    #[test]
    fn test_foreign_ids_use_private_numbering() {
        // Letters a, c, b become players 0, 1, 2 in order of appearance.
        let text = "rows 1\ncols 9\nm a.c.b....\n";
        let mut game = game(text, 4);
        let changes = render_changes(&mut game, 1).unwrap();
        assert_eq!(changes, "a 0 0 1\na 0 2 0\na 0 4 2\n");
        // Player 2 only sees player 1, which becomes its first opponent.
        let changes = render_changes(&mut game, 2).unwrap();
        assert_eq!(changes, "a 0 2 1\na 0 4 0\n");
    }

    #[test]
    fn test_own_dead_ant_reported_out_of_sight() {
        // Both ants step into the same cell and die. The player's own corpse
        // is reported with nothing left to see it; the enemy corpse is not.
        let text = "rows 1\ncols 12\nm a.b.........\n";
        let mut game = game(text, 1);
        game.begin_turn().unwrap();
        game.submit_orders(0, ["o 0 0 e"]).unwrap();
        game.submit_orders(1, ["o 0 2 w"]).unwrap();
        game.finish_turn().unwrap();
        assert_eq!(game.world().live_ant_count(), 0);
        let changes = render_changes(&mut game, 0).unwrap();
        assert_eq!(changes, "d 0 1 0\n");
    }

    #[test]
    fn test_render_state_is_global() {
        let game = game("rows 2\ncols 3\nm b.*\nm ..a\n", 1);
        assert_eq!(render_state(&game), "a 0 0 0\na 1 2 1\nf 0 2\n");
    }

    #[test]
    fn test_render_map_fog() {
        let game = game("rows 2\ncols 4\nm a.%.\nm ....\n", 1);
        assert_eq!(render_map(&game, Some(0)), vec!["a.?.", ".???"]);
        assert_eq!(render_map(&game, None), vec!["a.%.", "...."]);
    }

    #[test]
    fn test_render_map_without_ants_is_unfogged() {
        let mut game = game("rows 2\ncols 4\nm ab%.\nm ....\n", 1);
        game.begin_turn().unwrap();
        game.finish_turn().unwrap();
        assert_eq!(game.world().live_ant_count(), 0);
        assert_eq!(render_map(&game, Some(0)), vec!["..%.", "...."]);
        assert_eq!(render_map(&game, Some(1)), render_map(&game, None));
    }
}
