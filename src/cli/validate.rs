//! Map validation command implementation.

use super::{CliError, load_map};
use formica::{FoodStrategy, GameOptions, GameState};
use std::path::Path;

/// Execute the validate command.
///
/// # Errors
///
/// Returns an error if the map file cannot be read or is invalid.
pub(crate) fn execute(map_path: &Path) -> Result<(), CliError> {
    println!("Validating: {}", map_path.display());
    println!();

    let map = load_map(map_path)?;
    let terrain = map.terrain();

    println!("Summary:");
    println!("  Size:         {} rows x {} cols", map.torus.rows(), map.torus.cols());
    println!("  Players:      {}", map.num_players());
    println!("  Land cells:   {}", terrain.land_area());
    println!("  Water cells:  {}", map.water.len());
    println!("  Food:         {}", map.food.len());
    for (player, ants) in map.ants.iter().enumerate() {
        println!("  Player {player} ants: {}", ants.len());
    }
    if let Some(declared) = map.declared_players.filter(|&d| d != map.num_players()) {
        println!("  Warning: header declares {declared} players");
    }

    println!();
    println!("Food strategies:");
    for strategy in FoodStrategy::ALL {
        let options = GameOptions {
            food: strategy,
            ..GameOptions::default()
        };
        match GameState::new(&map, options) {
            Ok(_) => println!("  {:<10} ok", strategy.name()),
            Err(e) => println!("  {:<10} {e}", strategy.name()),
        }
    }

    println!();
    println!("Validation successful!");

    Ok(())
}
