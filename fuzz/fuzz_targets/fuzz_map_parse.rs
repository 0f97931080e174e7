#![no_main]

//! Map parser fuzzer.
//!
//! Any text either fails with a `MapFormatError` or yields a map whose
//! terrain renders back to the declared dimensions. Parsed maps are also
//! turned into games to shake out the food spawner setup.

use formica::game::{FoodStrategy, GameOptions, GameState, parse_map};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|text: &str| {
    let Ok(map) = parse_map(text) else {
        return;
    };
    let rows = map.terrain().render_rows();
    assert_eq!(rows.len(), map.torus.rows());
    assert!(rows.iter().all(|row| row.chars().count() == map.torus.cols()));

    // Keep the board small enough for the per-cell setup work.
    if map.torus.area() > 4096 {
        return;
    }
    for food in FoodStrategy::ALL {
        let options = GameOptions {
            food,
            ..GameOptions::default()
        };
        if let Ok(mut game) = GameState::new(&map, options) {
            game.start_game().unwrap();
        }
    }
});
