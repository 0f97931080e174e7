//! Game configuration.
//!
//! Food parameters may be given as a range; a range is sampled once at
//! game creation from the engine RNG so that the whole game stays a pure
//! function of `engine_seed`.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::GameError;
use crate::game::combat::AttackStrategy;
use crate::game::food::FoodStrategy;

/// A fixed value or a half-open range `lo..hi` to sample from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Param {
    /// Always this value.
    Fixed(u32),
    /// Uniform in `lo..hi`; `lo` when the range is empty.
    Between(u32, u32),
}

impl Param {
    /// Draw the value.
    pub fn sample<R: Rng + ?Sized>(self, rng: &mut R) -> u32 {
        match self {
            Self::Fixed(value) => value,
            Self::Between(lo, hi) if hi > lo => rng.gen_range(lo..hi),
            Self::Between(lo, _) => lo,
        }
    }
}

impl From<u32> for Param {
    fn from(value: u32) -> Self {
        Self::Fixed(value)
    }
}

/// Everything that configures a single game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameOptions {
    /// Maximum number of turns.
    pub turns: u32,
    /// Milliseconds an agent gets to start up. Reported, never enforced.
    pub loadtime: u32,
    /// Milliseconds an agent gets per turn. Reported, never enforced.
    pub turntime: u32,
    /// Squared view radius.
    pub viewradius2: u32,
    /// Squared attack radius.
    pub attackradius2: u32,
    /// Squared spawn radius.
    pub spawnradius2: u32,
    /// Seed for all engine randomness.
    pub engine_seed: u64,
    /// Seed forwarded to agents.
    pub player_seed: u64,
    /// Food items per player per `food_turn` turns.
    pub food_rate: Param,
    /// Turns over which `food_rate` is spread.
    pub food_turn: Param,
    /// Land cells per item of opening food.
    pub food_start: Param,
    /// Rounds of opening food placed near the starting ants.
    pub food_visible: Param,
    /// Combat rule.
    pub attack: AttackStrategy,
    /// Food placement rule.
    pub food: FoodStrategy,
    /// Fold the end-of-game bonus into the final score.
    pub add_bonus: bool,
}

impl Default for GameOptions {
    fn default() -> Self {
        Self {
            turns: 1000,
            loadtime: 3000,
            turntime: 1000,
            viewradius2: 55,
            attackradius2: 5,
            spawnradius2: 1,
            engine_seed: 0,
            player_seed: 0,
            food_rate: Param::Between(2, 8),
            food_turn: Param::Between(12, 30),
            food_start: Param::Between(75, 175),
            food_visible: Param::Between(1, 3),
            attack: AttackStrategy::default(),
            food: FoodStrategy::default(),
            add_bonus: false,
        }
    }
}

/// Food parameters after sampling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoodSettings {
    /// Food items per player per `turn` turns.
    pub rate: u32,
    /// Turns over which `rate` is spread.
    pub turn: u32,
    /// Land cells per item of opening food.
    pub start: u32,
    /// Rounds of opening food near the starting ants.
    pub visible: u32,
}

impl GameOptions {
    /// Sample the food parameters, in a fixed order.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidOption`] if `food_turn` or `food_start`
    /// comes out as zero.
    pub fn sample_food<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<FoodSettings, GameError> {
        let settings = FoodSettings {
            rate: self.food_rate.sample(rng),
            turn: self.food_turn.sample(rng),
            start: self.food_start.sample(rng),
            visible: self.food_visible.sample(rng),
        };
        if settings.turn == 0 {
            return Err(GameError::InvalidOption("food_turn"));
        }
        if settings.start == 0 {
            return Err(GameError::InvalidOption("food_start"));
        }
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_defaults_match_local_engine() {
        let options = GameOptions::default();
        assert_eq!(options.viewradius2, 55);
        assert_eq!(options.attackradius2, 5);
        assert_eq!(options.spawnradius2, 1);
        assert_eq!(options.attack, AttackStrategy::Power);
        assert_eq!(options.food, FoodStrategy::Symmetric);
    }

    #[test]
    fn test_sampling_is_in_range_and_seeded() {
        let options = GameOptions::default();
        let a = options.sample_food(&mut ChaCha8Rng::seed_from_u64(3)).unwrap();
        let b = options.sample_food(&mut ChaCha8Rng::seed_from_u64(3)).unwrap();
        assert_eq!(a, b);
        assert!((2..8).contains(&a.rate));
        assert!((12..30).contains(&a.turn));
        assert!((75..175).contains(&a.start));
        assert!((1..3).contains(&a.visible));
    }

    #[test]
    fn test_zero_food_turn_rejected() {
        let options = GameOptions {
            food_turn: Param::Fixed(0),
            ..GameOptions::default()
        };
        let err = options.sample_food(&mut ChaCha8Rng::seed_from_u64(0)).unwrap_err();
        assert_eq!(err, GameError::InvalidOption("food_turn"));
    }

    #[test]
    fn test_options_json() {
        let json = r#"{"turns": 50, "food_rate": 4, "food_turn": [10, 20], "attack": "damage"}"#;
        let options: GameOptions = serde_json::from_str(json).unwrap();
        assert_eq!(options.turns, 50);
        assert_eq!(options.food_rate, Param::Fixed(4));
        assert_eq!(options.food_turn, Param::Between(10, 20));
        assert_eq!(options.attack, AttackStrategy::Damage);
        assert_eq!(options.viewradius2, 55);
    }
}
