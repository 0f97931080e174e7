//! Game state management.
//!
//! A game moves through [`Phase`]s:
//!
//! ```text
//! NotStarted --start_game--> Idle --begin_turn--> Move --finish_moves--> Resolve
//!                             ^                                            |
//!                             +----------------resolve_turn----------------+
//! Idle --finish_game--> Finished
//! ```
//!
//! Orders are only accepted during `Move`. Stopping between `finish_moves`
//! and `resolve_turn` is part of the contract: step-through tools inspect
//! the board after movement but before combat.

use std::collections::BTreeMap;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::error::GameError;
use crate::game::combat::{Award, resolve_combat};
use crate::game::entities::FoodId;
use crate::game::food::{FoodAccumulator, FoodSpawner};
use crate::game::fraction::Fraction;
use crate::game::invariants::assert_invariants;
use crate::game::map::{Grid, MapData, parse_map};
use crate::game::movement::{MovementOutcome, resolve_moves};
use crate::game::options::{FoodSettings, GameOptions};
use crate::game::orders::{OrderReport, process_orders};
use crate::game::player::{Perspective, Player, PlayerId};
use crate::game::torus::{Direction, Loc};
use crate::game::vision::Vision;
use crate::game::world::{AntOrigin, World};

/// Where the game is in its turn cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    /// Created, opening food not placed yet.
    NotStarted,
    /// Between turns.
    Idle,
    /// Collecting orders.
    Move,
    /// Ants have moved; combat, spawning and food are pending.
    Resolve,
    /// Game over, bonus computed.
    Finished,
}

/// Counts from one resolve phase, for logging and step-through tools.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TurnSummary {
    /// Turn that was resolved.
    pub turn: u32,
    /// Ants killed in combat.
    pub combat_kills: usize,
    /// Ants spawned from food.
    pub spawned: usize,
    /// Food items placed.
    pub food_placed: usize,
}

/// Live ant counts per player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameStats {
    /// Entry `p` is the number of live ants of player `p`.
    pub ant_count: Vec<usize>,
}

/// Complete game state.
#[derive(Debug, Clone)]
pub struct GameState {
    options: GameOptions,
    food: FoodSettings,
    terrain: Grid,
    world: World,
    vision: Vision,
    players: Vec<Player>,
    spawner: FoodSpawner,
    accumulator: FoodAccumulator,
    rng: ChaCha8Rng,
    phase: Phase,
    turn: u32,
    orders: Vec<BTreeMap<Loc, Direction>>,
    was_alive: Vec<bool>,
}

impl GameState {
    /// Create a game from a parsed map.
    ///
    /// Starting ants are created (one point each) and the initial vision is
    /// computed. Opening food is placed by [`start_game`](Self::start_game).
    ///
    /// # Errors
    ///
    /// Fails if an option is unusable or the map cannot support the food
    /// strategy.
    pub fn new(map: &MapData, options: GameOptions) -> Result<Self, GameError> {
        let mut rng = ChaCha8Rng::seed_from_u64(options.engine_seed);
        let food = options.sample_food(&mut rng)?;
        let num_players = map.num_players();
        let terrain = map.terrain();
        let mut world = World::new(
            terrain.clone(),
            &[options.viewradius2, options.attackradius2, options.spawnradius2],
        );
        let mut players: Vec<Player> = (0..num_players)
            .filter_map(|id| PlayerId::try_from(id).ok())
            .map(|id| Player::new(id, num_players))
            .collect();
        for (player, ants) in players.iter_mut().zip(&map.ants) {
            for &loc in ants {
                world.add_ant(AntOrigin::Loc(loc), player.id)?;
                player.score += Fraction::ONE;
            }
            player.start_history();
        }
        for &loc in &map.food {
            world.add_food(loc)?;
        }
        let spawner = FoodSpawner::new(options.food, world.grid(), &map.ants, options.viewradius2)?;

        let mut game = Self {
            accumulator: FoodAccumulator::new(food.rate, food.turn, num_players),
            vision: Vision::new(map.torus, options.viewradius2, num_players),
            options,
            food,
            terrain,
            world,
            players,
            spawner,
            rng,
            phase: Phase::NotStarted,
            turn: 0,
            orders: vec![BTreeMap::new(); num_players],
            was_alive: vec![false; num_players],
        };
        game.update_vision();
        tracing::debug!(
            players = num_players,
            rows = map.torus.rows(),
            cols = map.torus.cols(),
            food_rate = food.rate,
            food_turn = food.turn,
            "game created"
        );
        Ok(game)
    }

    /// Parse a map and create a game from it.
    ///
    /// # Errors
    ///
    /// Fails on a malformed map or unusable options.
    pub fn from_map_text(text: &str, options: GameOptions) -> Result<Self, GameError> {
        let map = parse_map(text)?;
        Self::new(&map, options)
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    /// Current turn (0 before the first [`begin_turn`](Self::begin_turn)).
    #[must_use]
    pub const fn turn(&self) -> u32 {
        self.turn
    }

    /// Options the game was created with.
    #[must_use]
    pub const fn options(&self) -> &GameOptions {
        &self.options
    }

    /// Sampled food parameters.
    #[must_use]
    pub const fn food_settings(&self) -> FoodSettings {
        self.food
    }

    /// Water and land only, as loaded.
    #[must_use]
    pub const fn terrain(&self) -> &Grid {
        &self.terrain
    }

    /// Ants, food and the content grid.
    #[must_use]
    pub const fn world(&self) -> &World {
        &self.world
    }

    /// Every player's fog of war.
    #[must_use]
    pub const fn vision(&self) -> &Vision {
        &self.vision
    }

    /// Carried food remainder.
    #[must_use]
    pub const fn food_accumulator(&self) -> &FoodAccumulator {
        &self.accumulator
    }

    /// Food owed to blocked cells.
    #[must_use]
    pub fn pending_food(&self) -> &BTreeMap<Loc, u32> {
        self.spawner.pending()
    }

    /// Number of players.
    #[must_use]
    pub fn num_players(&self) -> usize {
        self.players.len()
    }

    /// All players.
    #[must_use]
    pub fn players(&self) -> &[Player] {
        &self.players
    }

    /// Look up a player.
    ///
    /// # Errors
    ///
    /// Fails for ids outside `0..num_players`.
    pub fn player(&self, id: PlayerId) -> Result<&Player, GameError> {
        self.players
            .get(usize::from(id))
            .ok_or(GameError::UnknownPlayer(id))
    }

    pub(crate) fn perspective_mut(&mut self, id: PlayerId) -> Result<&mut Perspective, GameError> {
        self.players
            .get_mut(usize::from(id))
            .map(|player| &mut player.perspective)
            .ok_or(GameError::UnknownPlayer(id))
    }

    fn expect_phase(&self, operation: &'static str, expected: Phase) -> Result<(), GameError> {
        if self.phase == expected {
            Ok(())
        } else {
            Err(GameError::Phase {
                operation,
                expected,
                actual: self.phase,
            })
        }
    }

    fn add_ant(&mut self, origin: AntOrigin, owner: PlayerId) -> Result<(), GameError> {
        self.world.add_ant(origin, owner)?;
        self.players[usize::from(owner)].score += Fraction::ONE;
        Ok(())
    }

    fn apply_awards(&mut self, awards: &[Award]) {
        for award in awards {
            if let Some(player) = self.players.get_mut(usize::from(award.player)) {
                player.score += award.points;
            }
        }
    }

    /// Place the opening food.
    ///
    /// # Errors
    ///
    /// Fails outside [`Phase::NotStarted`].
    pub fn start_game(&mut self) -> Result<(), GameError> {
        self.expect_phase("start_game", Phase::NotStarted)?;
        let placed = self.spawner.start(
            &mut self.world,
            &mut self.rng,
            self.food.visible,
            self.food.start,
        )?;
        self.phase = Phase::Idle;
        tracing::info!(
            players = self.players.len(),
            food = placed,
            attack = %self.options.attack,
            strategy = %self.options.food,
            "game started"
        );
        Ok(())
    }

    /// Advance the turn counter and clear last turn's transient state.
    ///
    /// # Errors
    ///
    /// Fails outside [`Phase::Idle`].
    pub fn begin_turn(&mut self) -> Result<(), GameError> {
        self.expect_phase("begin_turn", Phase::Idle)?;
        self.turn += 1;
        self.world.set_turn(self.turn);
        self.world.clear_killed();
        self.vision.clear_revealed_water();
        for player in &mut self.players {
            player.removed_food.clear();
        }
        for orders in &mut self.orders {
            orders.clear();
        }
        self.phase = Phase::Move;
        Ok(())
    }

    /// Validate and record one player's orders for this turn.
    ///
    /// A later call for the same player replaces the earlier orders. Orders
    /// from players that are no longer alive are dropped.
    ///
    /// # Errors
    ///
    /// Fails outside [`Phase::Move`] or for an unknown player.
    pub fn submit_orders<'a, I>(&mut self, player: PlayerId, lines: I) -> Result<OrderReport, GameError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        self.expect_phase("submit_orders", Phase::Move)?;
        self.player(player)?;
        if !self.is_alive(player) {
            tracing::debug!(player, "dropping orders from dead player");
            return Ok(OrderReport::default());
        }
        let report = process_orders(self.world.grid(), player, lines);
        self.orders[usize::from(player)] = report
            .accepted
            .iter()
            .map(|order| (order.loc, order.direction))
            .collect();
        tracing::debug!(
            player,
            turn = self.turn,
            accepted = report.accepted.len(),
            ignored = report.ignored.len(),
            invalid = report.invalid.len(),
            "orders processed"
        );
        Ok(report)
    }

    /// Move all ants and resolve collisions.
    ///
    /// # Errors
    ///
    /// Fails outside [`Phase::Move`].
    pub fn finish_moves(&mut self) -> Result<MovementOutcome, GameError> {
        self.expect_phase("finish_moves", Phase::Move)?;
        self.was_alive = (0..self.players.len())
            .filter_map(|id| PlayerId::try_from(id).ok())
            .map(|id| self.is_alive(id))
            .collect();
        let orders: BTreeMap<Loc, Direction> = self
            .orders
            .iter()
            .flat_map(|orders| orders.iter().map(|(&loc, &direction)| (loc, direction)))
            .collect();
        let outcome = resolve_moves(&mut self.world, &orders, self.options.attackradius2)?;
        self.apply_awards(&outcome.awards);
        self.phase = Phase::Resolve;
        Ok(outcome)
    }

    /// Combat, spawning, food, scoring and vision for the current turn.
    ///
    /// # Errors
    ///
    /// Fails outside [`Phase::Resolve`].
    pub fn resolve_turn(&mut self) -> Result<TurnSummary, GameError> {
        self.expect_phase("resolve_turn", Phase::Resolve)?;

        let combat = resolve_combat(self.options.attack, &self.world, self.options.attackradius2);
        for &id in &combat.killed {
            self.world.kill_ant(id, false)?;
        }
        self.apply_awards(&combat.awards);

        let spawned = self.spawn_ants()?;
        let rounds = self.accumulator.advance();
        let food_placed = self.spawner.spawn(&mut self.world, &mut self.rng, rounds)?;

        for (player, &alive) in self.players.iter_mut().zip(&self.was_alive) {
            if alive {
                player.commit();
            } else {
                player.rollback();
            }
        }

        self.update_vision();
        self.phase = Phase::Idle;

        let summary = TurnSummary {
            turn: self.turn,
            combat_kills: combat.killed.len(),
            spawned,
            food_placed,
        };
        tracing::debug!(
            turn = summary.turn,
            combat_kills = summary.combat_kills,
            spawned = summary.spawned,
            food = summary.food_placed,
            live_ants = self.world.live_ant_count(),
            "turn resolved"
        );
        assert_invariants(self);
        Ok(summary)
    }

    /// Both halves of a turn: [`finish_moves`](Self::finish_moves) then
    /// [`resolve_turn`](Self::resolve_turn).
    ///
    /// # Errors
    ///
    /// Fails outside [`Phase::Move`].
    pub fn finish_turn(&mut self) -> Result<TurnSummary, GameError> {
        self.finish_moves()?;
        self.resolve_turn()
    }

    /// Turn food into ants.
    ///
    /// Food with ants of exactly one player within `spawnradius2` becomes an
    /// ant of that player; food with several players nearby is destroyed.
    fn spawn_ants(&mut self) -> Result<usize, GameError> {
        let radius2 = self.options.spawnradius2;
        let mut claims: Vec<(FoodId, PlayerId)> = Vec::new();
        let mut contested: Vec<Loc> = Vec::new();
        for food in self.world.live_food() {
            let mut owners: Vec<PlayerId> = self
                .world
                .nearby_ants(food.loc, radius2, None)
                .into_iter()
                .map(|id| self.world.ant(id).owner)
                .collect();
            owners.sort_unstable();
            owners.dedup();
            match owners.as_slice() {
                [] => {}
                [owner] => claims.push((food.id, *owner)),
                _ => contested.push(food.loc),
            }
        }
        for loc in contested {
            self.world.remove_food(loc)?;
        }
        for &(food, _) in &claims {
            let loc = self.world.food(food).loc;
            self.world.remove_food(loc)?;
        }
        for &(food, owner) in &claims {
            self.add_ant(AntOrigin::Food(food), owner)?;
        }
        Ok(claims.len())
    }

    /// Apply vision deltas, reveal cells, and register what each player sees.
    fn update_vision(&mut self) {
        self.vision.update(&self.world);
        self.vision.reveal(self.world.grid());
        for player in &mut self.players {
            let id = player.id;
            let world = &self.world;
            let vision = &self.vision;

            let mut removed = Vec::new();
            player.seen_food.retain(|&food| {
                let food = world.food(food);
                let gone = food.end_turn.is_some() && vision.is_visible(id, food.loc);
                if gone {
                    removed.push(food.loc);
                }
                !gone
            });
            removed.sort_unstable();
            player.removed_food = removed;

            for ant in world.live_ants() {
                if vision.is_visible(id, ant.loc) {
                    player.perspective.resolve(ant.owner);
                }
            }
            for food in world.live_food() {
                if vision.is_visible(id, food.loc) {
                    player.seen_food.insert(food.id);
                }
            }
        }
    }

    /// Whether the player still takes part: not evicted and owns an ant.
    #[must_use]
    pub fn is_alive(&self, player: PlayerId) -> bool {
        self.players
            .get(usize::from(player))
            .is_some_and(|p| !p.evicted)
            && self.world.live_ants().any(|ant| ant.owner == player)
    }

    /// Players still alive.
    #[must_use]
    pub fn alive_players(&self) -> Vec<PlayerId> {
        self.players
            .iter()
            .map(|player| player.id)
            .filter(|&id| self.is_alive(id))
            .collect()
    }

    /// Number of players still alive.
    #[must_use]
    pub fn remaining_players(&self) -> usize {
        self.alive_players().len()
    }

    /// Multi-player games end with at most one player left; a single-player
    /// game ends when the food runs out.
    #[must_use]
    pub fn game_over(&self) -> bool {
        let n = self.players.len();
        (n > 1 && self.remaining_players() <= 1) || (n == 1 && self.world.live_food_count() == 0)
    }

    /// Remove a player from the game (called by the supervisor).
    ///
    /// Its ants stay on the board but it no longer moves or scores.
    ///
    /// # Errors
    ///
    /// Fails for an unknown player.
    pub fn kill_player(&mut self, player: PlayerId) -> Result<(), GameError> {
        let entry = self
            .players
            .get_mut(usize::from(player))
            .ok_or(GameError::UnknownPlayer(player))?;
        entry.evicted = true;
        self.orders[usize::from(player)].clear();
        tracing::warn!(player, turn = self.turn, "player evicted");
        Ok(())
    }

    /// End the game. A sole survivor gets a bonus for the food it could
    /// still have collected and the enemy ants it could still have killed.
    ///
    /// # Errors
    ///
    /// Fails outside [`Phase::Idle`].
    pub fn finish_game(&mut self) -> Result<(), GameError> {
        self.expect_phase("finish_game", Phase::Idle)?;
        if let [winner] = self.alive_players().as_slice() {
            let winner = *winner;
            let remaining_turns = i128::from(self.options.turns.saturating_sub(self.turn));
            let enemy_ants = self
                .world
                .live_ants()
                .filter(|ant| ant.owner != winner)
                .count();
            let bonus = self.accumulator.per_turn().scale(remaining_turns)
                + self.accumulator.extra()
                + Fraction::from_int(i128::try_from(self.world.live_food_count() + enemy_ants).unwrap_or(0));
            let player = &mut self.players[usize::from(winner)];
            player.bonus = bonus;
            if self.options.add_bonus {
                player.score += bonus;
            }
            tracing::info!(winner, bonus = %bonus, "food bonus awarded");
        }
        self.phase = Phase::Finished;
        tracing::info!(turn = self.turn, scores = ?self.scores(), "game finished");
        Ok(())
    }

    /// Scores rounded down, by global player id.
    #[must_use]
    pub fn scores(&self) -> Vec<i64> {
        self.players.iter().map(|p| p.score.floor_i64()).collect()
    }

    /// Scores in `player`'s private numbering; undiscovered slots are `None`.
    ///
    /// # Errors
    ///
    /// Fails for an unknown player.
    pub fn scores_for(&self, player: PlayerId) -> Result<Vec<Option<i64>>, GameError> {
        Ok(self.player(player)?.perspective.reorder(&self.scores()))
    }

    /// Live ant counts.
    #[must_use]
    pub fn stats(&self) -> GameStats {
        let mut ant_count = vec![0; self.players.len()];
        for ant in self.world.live_ants() {
            ant_count[usize::from(ant.owner)] += 1;
        }
        GameStats { ant_count }
    }

    /// Validate that the food accumulator never holds a full round.
    pub(crate) fn accumulator_in_range(&self) -> bool {
        let extra = self.accumulator.extra();
        let n = i128::try_from(self.players.len()).unwrap_or(i128::MAX);
        extra >= Fraction::ZERO && extra < Fraction::from_int(n)
    }
}
