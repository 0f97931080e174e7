//! Multi-turn integration tests for game mechanics.
//!
//! These tests drive whole games through the public API and check the
//! scenarios the rules pin down exactly, plus determinism and conservation
//! over longer runs.
//!
//! Run with: cargo test --release game_integration

#![allow(missing_docs)]
#![allow(clippy::unwrap_used)]

use formica::game::{
    AttackStrategy, Cell, FoodStrategy, Fraction, GameOptions, GameState, Grid, Loc, Param,
    OrderRejection, Torus, check_invariants, parse_map, process_orders,
};
use formica::protocol::render_changes;
use formica::runner::{Agent, AgentError, BotAgent, GameRunner, GreedyBot, RunnerConfig};
use formica::{MapFormatError, ReplaySummary};

const MIRROR: &str = "rows 4\ncols 8\nm a.......\nm ........\nm ....b...\nm ........\n";

fn quiet_options() -> GameOptions {
    GameOptions {
        attack: AttackStrategy::Damage,
        food: FoodStrategy::None,
        food_rate: Param::Fixed(0),
        food_turn: Param::Fixed(10),
        food_start: Param::Fixed(100),
        food_visible: Param::Fixed(0),
        ..GameOptions::default()
    }
}

fn duel_map() -> String {
    let mut text = String::from("rows 10\ncols 10\n");
    for row in 0..10 {
        if row == 5 {
            text.push_str("m ...a...b..\n");
        } else {
            text.push_str("m ..........\n");
        }
    }
    text
}

#[test]
fn test_head_on_collision_splits_the_point() {
    let options = GameOptions {
        attackradius2: 1,
        ..quiet_options()
    };
    let mut game = GameState::from_map_text(&duel_map(), options).unwrap();
    game.start_game().unwrap();

    game.begin_turn().unwrap();
    game.submit_orders(0, ["o 5 3 e"]).unwrap();
    game.submit_orders(1, ["o 5 7 w"]).unwrap();
    game.finish_turn().unwrap();
    assert_eq!(game.world().live_ant_count(), 2);
    let before: Vec<Fraction> = game.players().iter().map(|p| p.score).collect();

    game.begin_turn().unwrap();
    game.submit_orders(0, ["o 5 4 e"]).unwrap();
    game.submit_orders(1, ["o 5 6 w"]).unwrap();
    game.finish_turn().unwrap();

    assert_eq!(game.world().live_ant_count(), 0);
    for (player, before) in game.players().iter().zip(before) {
        assert_eq!(player.score - before, Fraction::new(1, 2));
        assert_eq!(player.committed_score(), Fraction::new(3, 2));
    }
    assert!(game.game_over());
}

#[test]
fn test_single_ant_harvests_adjacent_food() {
    let mut game = GameState::from_map_text("rows 3\ncols 3\nm a*.\nm ...\nm ...\n", quiet_options()).unwrap();
    game.start_game().unwrap();
    assert_eq!(game.scores(), vec![1]);

    game.begin_turn().unwrap();
    let summary = game.finish_turn().unwrap();

    assert_eq!(summary.spawned, 1);
    let ant = game.world().ant_at(Loc::new(0, 1)).unwrap();
    assert_eq!(ant.owner, 0);
    assert_eq!(game.world().grid().get(Loc::new(0, 1)), Cell::Ant(0));
    assert_eq!(game.scores(), vec![2]);
    // A lone player with nothing left to eat is done.
    assert!(game.game_over());
}

#[test]
fn test_order_for_foreign_ant_is_invalid() {
    let torus = Torus::new(3, 3).unwrap();
    let mut grid = Grid::new(torus);
    grid.place(Loc::new(0, 0), Cell::Ant(1));

    let report = process_orders(&grid, 0, ["o 0 0 n"]);
    assert!(report.accepted.is_empty());
    assert_eq!(report.invalid.len(), 1);
    assert_eq!(report.invalid[0].reason, OrderRejection::NotPlayerAnt);
    assert_eq!(report.invalid[0].reason.reason(), "not player ant");
}

#[test]
fn test_row_width_error_names_the_row() {
    let err = parse_map("rows 3\ncols 3\nm a..\nm ....\nm ..b\n").unwrap_err();
    assert_eq!(
        err,
        MapFormatError::RowWidth {
            row: 1,
            expected: 3,
            actual: 4,
        }
    );
    assert!(err.to_string().contains("row 1"));
}

fn greedy_game(seed: u64) -> ReplaySummary {
    let options = GameOptions {
        engine_seed: seed,
        food: FoodStrategy::Symmetric,
        attack: AttackStrategy::Power,
        viewradius2: 9,
        attackradius2: 2,
        turns: 40,
        ..GameOptions::default()
    };
    let game = GameState::from_map_text(MIRROR, options).unwrap();
    let agents: Vec<Box<dyn Agent>> = vec![
        Box::new(BotAgent::new("greedy", GreedyBot)),
        Box::new(BotAgent::new("greedy", GreedyBot)),
    ];
    GameRunner::new(game, agents, RunnerConfig::default())
        .unwrap()
        .run()
        .unwrap()
        .replay
}

#[test]
fn test_same_seed_same_game() {
    let first = greedy_game(17);
    let second = greedy_game(17);
    assert_eq!(first, second);
    assert_eq!(first.to_json().unwrap(), second.to_json().unwrap());
}

#[test]
fn test_conservation_every_turn() {
    let options = GameOptions {
        engine_seed: 3,
        food: FoodStrategy::Random,
        attack: AttackStrategy::Support,
        viewradius2: 9,
        attackradius2: 2,
        turns: 60,
        ..GameOptions::default()
    };
    let game = GameState::from_map_text(MIRROR, options).unwrap();
    let agents: Vec<Box<dyn Agent>> = vec![
        Box::new(BotAgent::new("greedy", GreedyBot)),
        Box::new(BotAgent::new("greedy", GreedyBot)),
    ];
    let mut runner = GameRunner::new(game, agents, RunnerConfig::default()).unwrap();
    while runner.step().unwrap().is_some() {
        let game = runner.game();
        let world = game.world();
        let dead = world.ants().iter().filter(|ant| !ant.alive).count();
        assert_eq!(world.live_ant_count(), world.ants().len() - dead);
        assert!(game.vision().matches_recompute(world));
        assert!(check_invariants(game).is_empty());
    }
}

/// Plays hold until `fail_on`, then stops answering.
struct QuitsAfter {
    turns: u32,
    fail_on: u32,
}

impl Agent for QuitsAfter {
    fn name(&self) -> &str {
        "quits"
    }

    fn start(&mut self, _setup: &str) -> Result<(), AgentError> {
        Ok(())
    }

    fn turn(&mut self, _changes: &str) -> Result<Vec<String>, AgentError> {
        self.turns += 1;
        if self.turns >= self.fail_on {
            return Err(AgentError::Closed);
        }
        Ok(Vec::new())
    }
}

#[test]
fn test_evicted_score_never_changes() {
    // Player 1 sits next to food but quits on turn 3; its score must stay
    // at the value committed before the eviction.
    let text = "rows 3\ncols 12\nm a....*b*....\nm ............\nm ............\n";
    let game = GameState::from_map_text(text, GameOptions { turns: 6, ..quiet_options() }).unwrap();
    let agents: Vec<Box<dyn Agent>> = vec![
        Box::new(BotAgent::hold()),
        Box::new(QuitsAfter { turns: 0, fail_on: 3 }),
    ];
    let mut runner = GameRunner::new(game, agents, RunnerConfig::default()).unwrap();
    let mut frozen = None;
    while runner.step().unwrap().is_some() {
        let player = &runner.game().players()[1];
        if runner.evicted().contains(&1) {
            let score = *frozen.get_or_insert(player.score);
            assert_eq!(player.score, score);
            assert_eq!(player.committed_score(), score);
        }
    }
    assert_eq!(runner.evicted(), &[1]);
    assert!(frozen.is_some());
}

#[test]
fn test_changes_never_leak_global_ids() {
    // Three players; player 2 only ever sees player 1, which must show up
    // as its first opponent.
    let text = "rows 1\ncols 16\nm a.....c...b.....\n";
    let options = GameOptions {
        viewradius2: 16,
        ..quiet_options()
    };
    let mut game = GameState::from_map_text(text, options).unwrap();
    game.start_game().unwrap();
    let changes = render_changes(&mut game, 2).unwrap();
    assert_eq!(changes, "a 0 6 1\na 0 10 0\n");
}
