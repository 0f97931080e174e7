#![no_main]

//! Order pipeline fuzzer.
//!
//! Feeds arbitrary order text for both players into a real game for a few
//! turns. Every line must be classified exactly once and the game invariants
//! must survive whatever is accepted.

use arbitrary::Arbitrary;
use formica::game::{AttackStrategy, FoodStrategy, GameOptions, GameState, check_invariants};
use libfuzzer_sys::fuzz_target;

const MIRROR: &str = "rows 4\ncols 8\nm aa......\nm ...%....\nm ....bb..\nm .......%\n";

/// Structured input for turn fuzzing.
#[derive(Arbitrary, Debug)]
struct OrdersInput {
    seed: u64,
    attack: u8,
    /// Order text per turn, for both players.
    turns: Vec<[String; 2]>,
}

fuzz_target!(|input: OrdersInput| {
    let options = GameOptions {
        engine_seed: input.seed,
        attack: AttackStrategy::ALL[usize::from(input.attack) % AttackStrategy::ALL.len()],
        food: FoodStrategy::Symmetric,
        viewradius2: 9,
        attackradius2: 2,
        ..GameOptions::default()
    };
    let mut game = GameState::from_map_text(MIRROR, options).unwrap();
    game.start_game().unwrap();

    for orders in input.turns.iter().take(20) {
        if game.game_over() {
            break;
        }
        game.begin_turn().unwrap();
        for (player, text) in (0u8..).zip(orders) {
            if !game.is_alive(player) {
                continue;
            }
            let report = game.submit_orders(player, text.lines()).unwrap();
            let lines = text.lines().filter(|line| {
                let line = line.trim();
                !line.is_empty() && !line.starts_with('#')
            }).count();
            assert_eq!(report.accepted.len() + report.ignored.len() + report.invalid.len(), lines);
        }
        game.finish_turn().unwrap();
        assert!(check_invariants(&game).is_empty());
    }
});
