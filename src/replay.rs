//! Replay summary.
//!
//! Games are deterministic, but external viewers do not run the engine, so
//! the summary carries the whole food and ant timeline:
//! - every food item, with the turn it appeared and disappeared
//! - for food that became an ant, the ant's lifetime, owner and orders
//! - per-turn score history and the end-of-game bonus
//!
//! Scores are rounded down. Lifetimes still running when the summary is
//! taken end at `turn + 1`.

use std::fs::File;
use std::io::{self, BufReader, BufWriter};
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::game::{GameState, PlayerId, order_string};

/// Format revision written into every summary.
pub const REPLAY_REVISION: u32 = 2;

/// Error type for replay operations.
#[derive(Debug, Error)]
pub enum ReplayError {
    /// Reading or writing the file failed.
    #[error("replay i/o error: {0}")]
    Io(#[from] io::Error),
    /// The file is not a valid summary.
    #[error("replay format error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Map section of a summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayMap {
    /// Grid height.
    pub rows: usize,
    /// Grid width.
    pub cols: usize,
    /// Rendered terrain rows.
    pub data: Vec<String>,
}

/// One food record on the timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReplayEntry {
    /// `[row, col, start, spawn, death, owner, orders]` for food that
    /// became an ant.
    Ant(usize, usize, u32, u32, u32, PlayerId, String),
    /// `[row, col, start, end]` for food that never became an ant.
    Food(usize, usize, u32, u32),
}

/// Everything an external viewer needs to show a finished game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplaySummary {
    /// Always [`REPLAY_REVISION`].
    pub revision: u32,
    /// Number of players.
    pub players: usize,
    /// Setup time budget echo.
    pub loadtime: u32,
    /// Turn time budget echo.
    pub turntime: u32,
    /// Maximum number of turns.
    pub turns: u32,
    /// Squared view radius.
    pub viewradius2: u32,
    /// Squared attack radius.
    pub attackradius2: u32,
    /// Squared spawn radius.
    pub spawnradius2: u32,
    /// Engine seed.
    pub engine_seed: u64,
    /// Seed forwarded to agents.
    pub player_seed: u64,
    /// Sampled food rate.
    pub food_rate: u32,
    /// Sampled food period.
    pub food_turn: u32,
    /// Sampled opening food density.
    pub food_start: u32,
    /// Terrain.
    pub map: ReplayMap,
    /// Food and ant timeline, in food creation order.
    pub ants: Vec<ReplayEntry>,
    /// Committed score history per player.
    pub scores: Vec<Vec<i64>>,
    /// End-of-game bonus per player.
    pub bonus: Vec<i64>,
}

impl ReplaySummary {
    /// Summarize a game in its current state.
    #[must_use]
    pub fn from_game(game: &GameState) -> Self {
        let options = game.options();
        let food = game.food_settings();
        let world = game.world();
        let torus = world.torus();
        let open_end = game.turn() + 1;

        let ants = world
            .foods()
            .iter()
            .map(|record| {
                let (row, col) = (record.loc.row, record.loc.col);
                match (record.end_turn, record.ant) {
                    (None, _) => ReplayEntry::Food(row, col, record.start_turn, open_end),
                    (Some(end), None) => ReplayEntry::Food(row, col, record.start_turn, end),
                    (Some(_), Some(id)) => {
                        let ant = world.ant(id);
                        ReplayEntry::Ant(
                            row,
                            col,
                            record.start_turn,
                            ant.spawn_turn,
                            ant.die_turn.unwrap_or(open_end),
                            ant.owner,
                            order_string(&ant.orders),
                        )
                    }
                }
            })
            .collect();

        Self {
            revision: REPLAY_REVISION,
            players: game.num_players(),
            loadtime: options.loadtime,
            turntime: options.turntime,
            turns: options.turns,
            viewradius2: options.viewradius2,
            attackradius2: options.attackradius2,
            spawnradius2: options.spawnradius2,
            engine_seed: options.engine_seed,
            player_seed: options.player_seed,
            food_rate: food.rate,
            food_turn: food.turn,
            food_start: food.start,
            map: ReplayMap {
                rows: torus.rows(),
                cols: torus.cols(),
                data: game.terrain().render_rows(),
            },
            ants,
            scores: game
                .players()
                .iter()
                .map(|player| player.history.iter().map(|score| score.floor_i64()).collect())
                .collect(),
            bonus: game.players().iter().map(|player| player.bonus.floor_i64()).collect(),
        }
    }

    /// Serialize to JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, ReplayError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a valid summary.
    pub fn from_json(text: &str) -> Result<Self, ReplayError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Save the summary to a file.
    ///
    /// # Errors
    ///
    /// Returns an error if file operations fail.
    pub fn save(&self, path: &Path) -> Result<(), ReplayError> {
        let file = File::create(path)?;
        serde_json::to_writer(BufWriter::new(file), self)?;
        Ok(())
    }

    /// Load a summary from a file.
    ///
    /// # Errors
    ///
    /// Returns an error if file operations fail or format is invalid.
    pub fn load(path: &Path) -> Result<Self, ReplayError> {
        let file = File::open(path)?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{AttackStrategy, FoodStrategy, GameOptions, Param};

    fn finished_game() -> GameState {
        let text = "rows 3\ncols 5\nm a*...\nm ..%..\nm ....b\n";
        let options = GameOptions {
            attack: AttackStrategy::Damage,
            food: FoodStrategy::None,
            attackradius2: 1,
            food_rate: Param::Fixed(0),
            food_turn: Param::Fixed(10),
            food_start: Param::Fixed(100),
            food_visible: Param::Fixed(0),
            turns: 5,
            ..GameOptions::default()
        };
        let mut game = GameState::from_map_text(text, options).unwrap();
        game.start_game().unwrap();
        game.begin_turn().unwrap();
        game.submit_orders(1, ["o 2 4 w"]).unwrap();
        game.finish_turn().unwrap();
        game.finish_game().unwrap();
        game
    }

    #[test]
    fn test_summary_timeline() {
        let summary = ReplaySummary::from_game(&finished_game());
        assert_eq!(summary.revision, 2);
        assert_eq!(summary.players, 2);
        assert_eq!(summary.map.data, vec![".....", "..%..", "....."]);
        // Two dummy foods under the starting ants, then the map food that
        // player 0 ate on turn 1.
        assert_eq!(
            summary.ants,
            vec![
                ReplayEntry::Ant(0, 0, 0, 0, 2, 0, "-".to_string()),
                ReplayEntry::Ant(2, 4, 0, 0, 2, 1, "w".to_string()),
                ReplayEntry::Ant(0, 1, 0, 1, 2, 0, String::new()),
            ]
        );
        assert_eq!(summary.scores, vec![vec![1, 2], vec![1, 1]]);
    }

    #[test]
    fn test_untagged_entries_json() {
        let json = r#"[[1, 2, 0, 7], [3, 4, 0, 1, 9, 1, "nn-e"]]"#;
        let entries: Vec<ReplayEntry> = serde_json::from_str(json).unwrap();
        assert_eq!(entries[0], ReplayEntry::Food(1, 2, 0, 7));
        assert_eq!(entries[1], ReplayEntry::Ant(3, 4, 0, 1, 9, 1, "nn-e".to_string()));
    }

    #[test]
    fn test_save_load_roundtrip() {
        let summary = ReplaySummary::from_game(&finished_game());
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("game.replay");
        summary.save(&path).unwrap();
        assert_eq!(ReplaySummary::load(&path).unwrap(), summary);
    }

    #[test]
    fn test_load_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.replay");
        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(ReplaySummary::load(&path), Err(ReplayError::Json(_))));
    }
}
