//! Benchmarks for running complete games.
//!
//! The vision update and the combat strategies are the hot path; both are
//! exercised by full games with greedy agents.

#![allow(missing_docs)]
#![allow(clippy::unwrap_used)]

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use formica::game::{AttackStrategy, FoodStrategy, GameOptions, GameState, MapData, parse_map};
use formica::runner::{Agent, BotAgent, GameRunner, GreedyBot, RunnerConfig, run_batch};

/// A 2-player 32x32 map, symmetric under a half-board translation.
fn arena() -> MapData {
    let mut text = String::from("rows 32\ncols 32\nplayers 2\n");
    for row in 0..32 {
        let mut line: Vec<char> = vec!['.'; 32];
        for col in [5, 21] {
            if row % 8 == 3 {
                line[col] = '%';
            }
        }
        if row == 2 {
            line[2] = 'a';
            line[3] = 'a';
        }
        if row == 18 {
            line[18] = 'b';
            line[19] = 'b';
        }
        text.push_str("m ");
        text.extend(line);
        text.push('\n');
    }
    parse_map(&text).unwrap()
}

fn options(attack: AttackStrategy) -> GameOptions {
    GameOptions {
        engine_seed: 42,
        attack,
        food: FoodStrategy::Symmetric,
        turns: 200,
        ..GameOptions::default()
    }
}

fn greedy_game(map: &MapData, attack: AttackStrategy) -> GameRunner {
    let game = GameState::new(map, options(attack)).unwrap();
    let agents: Vec<Box<dyn Agent>> = vec![
        Box::new(BotAgent::new("greedy", GreedyBot)),
        Box::new(BotAgent::new("greedy", GreedyBot)),
    ];
    GameRunner::new(game, agents, RunnerConfig::default()).unwrap()
}

fn bench_single_game(c: &mut Criterion) {
    let map = arena();
    let mut group = c.benchmark_group("greedy_game_2p");
    for attack in AttackStrategy::ALL {
        group.bench_with_input(BenchmarkId::from_parameter(attack), &attack, |b, &attack| {
            b.iter(|| black_box(greedy_game(&map, attack).run()));
        });
    }
    group.finish();
}

fn bench_hold_batch(c: &mut Criterion) {
    // Hold agents: engine cost only, no agent-side parsing
    let map = arena();
    let options = options(AttackStrategy::Power);

    c.bench_function("10_hold_games_parallel", |b| {
        b.iter(|| black_box(run_batch(&map, &options, black_box(0), 10, |_| {})));
    });
}

criterion_group!(benches, bench_single_game, bench_hold_batch);
criterion_main!(benches);
