//! Game runner for Formica games.
//!
//! Drives one [`GameState`] through the line protocol:
//! - setup blocks before turn 1
//! - per-turn visible changes to every live agent
//! - order collection, strict or permissive
//! - eviction of agents that fail to answer
//!
//! Turns can be stepped in halves (movement, then resolution) so a
//! debugger can inspect the board between the two. [`run_batch`] plays many
//! independent games in parallel with rayon.

use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

use rayon::prelude::*;
use thiserror::Error;

use crate::error::GameError;
use crate::game::{
    Direction, GameOptions, GameState, GameStats, Loc, MapData, MovementOutcome, Phase, PlayerId,
    RejectedOrder, TurnSummary,
};
use crate::protocol::{Bot, BotDriver, BotWorld, END_ORDERS, GO, ProtocolError, READY, render_changes, render_setup};
use crate::replay::ReplaySummary;

/// Errors from talking to one agent. Any of these evicts the agent.
#[derive(Debug, Error)]
pub enum AgentError {
    /// The agent process could not be started.
    #[error("failed to start agent {command:?}: {source}")]
    Spawn {
        /// Command line that was run.
        command: String,
        /// Underlying error.
        source: std::io::Error,
    },
    /// Reading or writing the agent's pipes failed.
    #[error("agent i/o error: {0}")]
    Io(#[from] std::io::Error),
    /// The agent closed its output before finishing a block.
    #[error("agent closed its output")]
    Closed,
    /// An in-process agent could not parse the engine's message.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

/// Errors that stop a run.
#[derive(Debug, Error)]
pub enum RunError {
    /// The engine rejected an operation.
    #[error(transparent)]
    Game(#[from] GameError),
    /// Strict mode and a player sent invalid orders.
    #[error("player {player} sent invalid orders: {}", format_rejections(.orders))]
    InvalidOrders {
        /// Offending player.
        player: PlayerId,
        /// The rejected lines with reasons.
        orders: Vec<RejectedOrder>,
    },
    /// One agent per player is required.
    #[error("map has {expected} players but {actual} agents were given")]
    AgentCount {
        /// Players on the map.
        expected: usize,
        /// Agents supplied.
        actual: usize,
    },
}

fn format_rejections(orders: &[RejectedOrder]) -> String {
    orders.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
}

/// Something that plays one seat of a game.
pub trait Agent: Send {
    /// Short label for logs and reports.
    fn name(&self) -> &str;

    /// Deliver the setup block. The answer carries no orders.
    ///
    /// # Errors
    ///
    /// Any failure evicts the agent.
    fn start(&mut self, setup: &str) -> Result<(), AgentError>;

    /// Deliver one turn of changes and collect the order lines.
    ///
    /// # Errors
    ///
    /// Any failure evicts the agent.
    fn turn(&mut self, changes: &str) -> Result<Vec<String>, AgentError>;
}

/// A do-nothing bot: every ant stays put.
#[derive(Debug, Clone, Copy, Default)]
pub struct HoldBot;

impl Bot for HoldBot {
    fn do_turn(&mut self, _world: &mut BotWorld) {}
}

/// Sends each ant along the first free direction towards the nearest food.
#[derive(Debug, Clone, Copy, Default)]
pub struct GreedyBot;

impl Bot for GreedyBot {
    fn do_turn(&mut self, world: &mut BotWorld) {
        let mut targets: Vec<Loc> = Vec::new();
        for ant in world.my_ants().to_vec() {
            let Some(food) = world.closest_food(ant) else {
                continue;
            };
            let directions = world.directions(ant, food);
            let free: Vec<Direction> = directions
                .into_iter()
                .filter(|&direction| !targets.contains(&world.destination(ant, direction)))
                .collect();
            if let Some(direction) = world.passable_direction(ant, &free) {
                targets.push(world.destination(ant, direction));
                world.issue_order(ant, direction);
            }
        }
    }
}

/// Runs a [`Bot`] in-process through the full text protocol.
#[derive(Debug)]
pub struct BotAgent<B> {
    name: String,
    driver: BotDriver<B>,
}

impl<B: Bot> BotAgent<B> {
    /// Wrap a bot under a label.
    pub fn new(name: impl Into<String>, bot: B) -> Self {
        Self {
            name: name.into(),
            driver: BotDriver::new(bot),
        }
    }
}

impl BotAgent<HoldBot> {
    /// The default agent for seats without a command.
    #[must_use]
    pub fn hold() -> Self {
        Self::new("hold", HoldBot)
    }
}

impl<B: Bot + Send> Agent for BotAgent<B> {
    fn name(&self) -> &str {
        &self.name
    }

    fn start(&mut self, setup: &str) -> Result<(), AgentError> {
        self.driver.receive(&format!("{setup}{READY}\n"))?;
        Ok(())
    }

    fn turn(&mut self, changes: &str) -> Result<Vec<String>, AgentError> {
        Ok(self.driver.receive(&format!("{changes}{GO}\n"))?)
    }
}

/// Replays fixed order lines, one list per turn, then falls silent.
#[derive(Debug, Clone, Default)]
pub struct ScriptedAgent {
    turns: Vec<Vec<String>>,
    next: usize,
}

impl ScriptedAgent {
    /// Orders for turns 1, 2, ...
    #[must_use]
    pub fn new<T, L>(turns: T) -> Self
    where
        T: IntoIterator<Item = L>,
        L: IntoIterator,
        L::Item: Into<String>,
    {
        Self {
            turns: turns
                .into_iter()
                .map(|lines| lines.into_iter().map(Into::into).collect())
                .collect(),
            next: 0,
        }
    }
}

impl Agent for ScriptedAgent {
    fn name(&self) -> &str {
        "scripted"
    }

    fn start(&mut self, _setup: &str) -> Result<(), AgentError> {
        Ok(())
    }

    fn turn(&mut self, _changes: &str) -> Result<Vec<String>, AgentError> {
        let orders = self.turns.get(self.next).cloned().unwrap_or_default();
        self.next += 1;
        Ok(orders)
    }
}

/// An external program speaking the protocol on stdin/stdout.
///
/// There are no time limits: a hung process hangs the game.
#[derive(Debug)]
pub struct ProcessAgent {
    command: String,
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

impl ProcessAgent {
    /// Start `command`, split on whitespace.
    ///
    /// # Errors
    ///
    /// Fails if the command is empty or cannot be started.
    pub fn spawn(command: &str) -> Result<Self, AgentError> {
        let spawn_error = |source: std::io::Error| AgentError::Spawn {
            command: command.to_string(),
            source,
        };
        let mut parts = command.split_whitespace();
        let program = parts.next().ok_or_else(|| {
            spawn_error(std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty command"))
        })?;
        let mut child = Command::new(program)
            .args(parts)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .spawn()
            .map_err(spawn_error)?;
        let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
            return Err(spawn_error(std::io::Error::other("missing pipes")));
        };
        Ok(Self {
            command: command.to_string(),
            child,
            stdin,
            stdout: BufReader::new(stdout),
        })
    }

    fn exchange(&mut self, message: &str) -> Result<Vec<String>, AgentError> {
        self.stdin.write_all(message.as_bytes())?;
        self.stdin.flush()?;
        let mut orders = Vec::new();
        let mut line = String::new();
        loop {
            line.clear();
            if self.stdout.read_line(&mut line)? == 0 {
                return Err(AgentError::Closed);
            }
            let trimmed = line.trim();
            if trimmed.eq_ignore_ascii_case(END_ORDERS) {
                return Ok(orders);
            }
            orders.push(trimmed.to_string());
        }
    }
}

impl Agent for ProcessAgent {
    fn name(&self) -> &str {
        &self.command
    }

    fn start(&mut self, setup: &str) -> Result<(), AgentError> {
        self.exchange(&format!("{setup}{READY}\n"))?;
        Ok(())
    }

    fn turn(&mut self, changes: &str) -> Result<Vec<String>, AgentError> {
        self.exchange(&format!("{changes}{GO}\n"))
    }
}

impl Drop for ProcessAgent {
    fn drop(&mut self) {
        if let Err(err) = self.child.kill() {
            tracing::debug!(agent = %self.command, %err, "agent already exited");
        }
        self.child.wait().ok();
    }
}

/// Runner settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunnerConfig {
    /// Abort the game on the first invalid order instead of dropping it.
    pub strict: bool,
}

/// What a half-step did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HalfStep {
    /// Orders were collected and ants moved.
    Moved(MovementOutcome),
    /// Combat, spawning and food were resolved.
    Resolved(TurnSummary),
    /// The game had already ended; the bonus has been applied.
    Finished,
}

/// Final result of a game.
#[derive(Debug, Clone)]
pub struct GameResult {
    /// Engine seed used for this game.
    pub seed: u64,
    /// Turns played.
    pub turns_played: u32,
    /// Final floored scores by global player id.
    pub scores: Vec<i64>,
    /// Sole highest scorer, if there is one.
    pub winner: Option<PlayerId>,
    /// Live ants at the end.
    pub stats: GameStats,
    /// Players evicted for agent failures, in eviction order.
    pub evicted: Vec<PlayerId>,
    /// Full game summary.
    pub replay: ReplaySummary,
}

/// Plays one game with one agent per player.
pub struct GameRunner {
    game: GameState,
    agents: Vec<Box<dyn Agent>>,
    config: RunnerConfig,
    evicted: Vec<PlayerId>,
}

impl std::fmt::Debug for GameRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameRunner")
            .field("turn", &self.game.turn())
            .field("phase", &self.game.phase())
            .field("agents", &self.agents.iter().map(|a| a.name()).collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl GameRunner {
    /// Pair a fresh game with its agents, in player order.
    ///
    /// # Errors
    ///
    /// Fails if the number of agents differs from the number of players.
    pub fn new(game: GameState, agents: Vec<Box<dyn Agent>>, config: RunnerConfig) -> Result<Self, RunError> {
        if agents.len() != game.num_players() {
            return Err(RunError::AgentCount {
                expected: game.num_players(),
                actual: agents.len(),
            });
        }
        Ok(Self {
            game,
            agents,
            config,
            evicted: Vec::new(),
        })
    }

    /// The game being played.
    #[must_use]
    pub const fn game(&self) -> &GameState {
        &self.game
    }

    /// Players evicted so far.
    #[must_use]
    pub fn evicted(&self) -> &[PlayerId] {
        &self.evicted
    }

    fn evict(&mut self, player: PlayerId, err: &AgentError) -> Result<(), RunError> {
        tracing::warn!(player, agent = self.agents[usize::from(player)].name(), %err, "evicting agent");
        self.game.kill_player(player)?;
        self.evicted.push(player);
        Ok(())
    }

    fn seats(&self) -> Vec<PlayerId> {
        (0..self.agents.len())
            .filter_map(|seat| PlayerId::try_from(seat).ok())
            .collect()
    }

    /// Place the opening food and send every agent its setup block.
    ///
    /// # Errors
    ///
    /// Fails if the game was already started.
    pub fn start(&mut self) -> Result<(), RunError> {
        self.game.start_game()?;
        for player in self.seats() {
            let setup = render_setup(&self.game, Some(player));
            if let Err(err) = self.agents[usize::from(player)].start(&setup) {
                self.evict(player, &err)?;
            }
        }
        Ok(())
    }

    /// Whether no more turns will be played.
    #[must_use]
    pub fn is_over(&self) -> bool {
        self.game.game_over() || self.game.turn() >= self.game.options().turns
    }

    /// Advance by half a turn.
    ///
    /// From `Idle`: send changes, collect orders and move. From `Resolve`:
    /// resolve the turn. Once the game is over the bonus is applied and
    /// every later call returns [`HalfStep::Finished`].
    ///
    /// # Errors
    ///
    /// Fails on invalid orders in strict mode or on engine errors.
    pub fn half_step(&mut self) -> Result<HalfStep, RunError> {
        match self.game.phase() {
            Phase::NotStarted => {
                self.start()?;
                self.half_step()
            }
            Phase::Resolve => Ok(HalfStep::Resolved(self.game.resolve_turn()?)),
            Phase::Finished => Ok(HalfStep::Finished),
            Phase::Idle if self.is_over() => {
                self.game.finish_game()?;
                Ok(HalfStep::Finished)
            }
            Phase::Idle | Phase::Move => self.collect_and_move(),
        }
    }

    fn collect_and_move(&mut self) -> Result<HalfStep, RunError> {
        let alive: Vec<PlayerId> = self
            .seats()
            .into_iter()
            .filter(|&player| self.game.is_alive(player))
            .collect();
        let mut messages = Vec::with_capacity(alive.len());
        for &player in &alive {
            messages.push((player, render_changes(&mut self.game, player)?));
        }

        let mut answers = Vec::with_capacity(messages.len());
        for (player, changes) in messages {
            match self.agents[usize::from(player)].turn(&changes) {
                Ok(orders) => answers.push((player, orders)),
                Err(err) => self.evict(player, &err)?,
            }
        }

        if self.game.phase() == Phase::Idle {
            self.game.begin_turn()?;
        }
        for (player, orders) in answers {
            let report = self.game.submit_orders(player, orders.iter().map(String::as_str))?;
            for ignored in &report.ignored {
                tracing::debug!(player, order = %ignored, "ignored order");
            }
            if !report.invalid.is_empty() {
                if self.config.strict {
                    return Err(RunError::InvalidOrders {
                        player,
                        orders: report.invalid,
                    });
                }
                for invalid in &report.invalid {
                    tracing::warn!(player, order = %invalid, "dropping invalid order");
                }
            }
        }
        Ok(HalfStep::Moved(self.game.finish_moves()?))
    }

    /// Play one full turn. Returns `None` once the game is finished.
    ///
    /// # Errors
    ///
    /// See [`half_step`](Self::half_step).
    pub fn step(&mut self) -> Result<Option<TurnSummary>, RunError> {
        loop {
            match self.half_step()? {
                HalfStep::Moved(_) => {}
                HalfStep::Resolved(summary) => return Ok(Some(summary)),
                HalfStep::Finished => return Ok(None),
            }
        }
    }

    /// Play to the end.
    ///
    /// # Errors
    ///
    /// See [`half_step`](Self::half_step).
    pub fn run(mut self) -> Result<GameResult, RunError> {
        while self.step()?.is_some() {}
        Ok(self.into_result())
    }

    fn into_result(self) -> GameResult {
        let scores = self.game.scores();
        let best = scores.iter().copied().max();
        let mut leaders = scores
            .iter()
            .enumerate()
            .filter(|&(_, &score)| Some(score) == best)
            .map(|(player, _)| player);
        let winner = match (leaders.next(), leaders.next()) {
            (Some(player), None) => PlayerId::try_from(player).ok(),
            _ => None,
        };
        GameResult {
            seed: self.game.options().engine_seed,
            turns_played: self.game.turn(),
            winner,
            stats: self.game.stats(),
            evicted: self.evicted,
            replay: ReplaySummary::from_game(&self.game),
            scores,
        }
    }
}

/// Aggregate over a batch of games.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchStats {
    /// Games completed.
    pub games_played: u64,
    /// Games that failed to run.
    pub failures: u64,
    /// Outright wins per player.
    pub wins: Vec<u64>,
    /// Games without a sole winner.
    pub draws: u64,
    /// Sum of final scores per player.
    pub total_scores: Vec<i64>,
    /// Sum of turns played.
    pub total_turns: u64,
}

impl BatchStats {
    /// Empty statistics for `num_players`.
    #[must_use]
    pub fn new(num_players: usize) -> Self {
        Self {
            wins: vec![0; num_players],
            total_scores: vec![0; num_players],
            ..Self::default()
        }
    }

    /// Fold in one game.
    pub fn add_result(&mut self, result: &GameResult) {
        self.games_played += 1;
        self.total_turns += u64::from(result.turns_played);
        match result.winner {
            Some(winner) => {
                if let Some(wins) = self.wins.get_mut(usize::from(winner)) {
                    *wins += 1;
                }
            }
            None => self.draws += 1,
        }
        for (total, score) in self.total_scores.iter_mut().zip(&result.scores) {
            *total += score;
        }
    }

    /// Combine two partial aggregates.
    pub fn merge(&mut self, other: &Self) {
        self.games_played += other.games_played;
        self.failures += other.failures;
        self.draws += other.draws;
        self.total_turns += other.total_turns;
        for (a, b) in self.wins.iter_mut().zip(&other.wins) {
            *a += b;
        }
        for (a, b) in self.total_scores.iter_mut().zip(&other.total_scores) {
            *a += b;
        }
    }

    /// Mean final score per player.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn mean_scores(&self) -> Vec<f64> {
        let games = self.games_played.max(1) as f64;
        self.total_scores.iter().map(|&total| total as f64 / games).collect()
    }
}

/// Play one game with hold agents in every seat.
///
/// # Errors
///
/// Fails if the game cannot be created or run.
pub fn run_hold_game(map: &MapData, options: GameOptions) -> Result<GameResult, RunError> {
    let game = GameState::new(map, options)?;
    let agents: Vec<Box<dyn Agent>> = (0..game.num_players())
        .map(|_| Box::new(BotAgent::hold()) as Box<dyn Agent>)
        .collect();
    GameRunner::new(game, agents, RunnerConfig::default())?.run()
}

/// Play `games` hold-agent games on one map with engine seeds
/// `base_seed, base_seed + 1, ...` in parallel.
///
/// Every game owns its state and RNG, so the result does not depend on the
/// thread count. `on_game` is called after each game from worker threads.
pub fn run_batch<F>(map: &MapData, options: &GameOptions, base_seed: u64, games: u64, on_game: F) -> BatchStats
where
    F: Fn(&Result<GameResult, RunError>) + Sync,
{
    let num_players = map.num_players();
    (0..games)
        .into_par_iter()
        .fold(
            || BatchStats::new(num_players),
            |mut stats, i| {
                let options = GameOptions {
                    engine_seed: base_seed.wrapping_add(i),
                    ..options.clone()
                };
                let result = run_hold_game(map, options);
                on_game(&result);
                match &result {
                    Ok(result) => stats.add_result(result),
                    Err(err) => {
                        tracing::warn!(game = i, %err, "batch game failed");
                        stats.failures += 1;
                    }
                }
                stats
            },
        )
        .reduce(
            || BatchStats::new(num_players),
            |mut a, b| {
                a.merge(&b);
                a
            },
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{AttackStrategy, FoodStrategy, Param, parse_map};

    const DUEL: &str = "rows 1\ncols 12\nm a.b.........\n";

    fn quiet_options(turns: u32) -> GameOptions {
        GameOptions {
            attack: AttackStrategy::Damage,
            food: FoodStrategy::None,
            attackradius2: 1,
            food_rate: Param::Fixed(0),
            food_turn: Param::Fixed(10),
            food_start: Param::Fixed(100),
            food_visible: Param::Fixed(0),
            turns,
            ..GameOptions::default()
        }
    }

    fn runner(agents: Vec<Box<dyn Agent>>, config: RunnerConfig) -> GameRunner {
        let game = GameState::from_map_text(DUEL, quiet_options(5)).unwrap();
        GameRunner::new(game, agents, config).unwrap()
    }

    struct FailingAgent;

    impl Agent for FailingAgent {
        fn name(&self) -> &str {
            "failing"
        }

        fn start(&mut self, _setup: &str) -> Result<(), AgentError> {
            Ok(())
        }

        fn turn(&mut self, _changes: &str) -> Result<Vec<String>, AgentError> {
            Err(AgentError::Closed)
        }
    }

    #[test]
    fn test_agent_count_checked() {
        let game = GameState::from_map_text(DUEL, quiet_options(5)).unwrap();
        let err = GameRunner::new(game, vec![Box::new(BotAgent::hold())], RunnerConfig::default()).unwrap_err();
        assert!(matches!(err, RunError::AgentCount { expected: 2, actual: 1 }));
    }

    #[test]
    fn test_hold_game_runs_to_turn_limit() {
        let map = parse_map(DUEL).unwrap();
        let result = run_hold_game(&map, quiet_options(5)).unwrap();
        assert_eq!(result.turns_played, 5);
        assert_eq!(result.scores, vec![1, 1]);
        assert_eq!(result.winner, None);
        assert_eq!(result.replay.scores[0].len(), 6);
    }

    #[test]
    fn test_half_steps_alternate() {
        let agents: Vec<Box<dyn Agent>> = vec![
            Box::new(ScriptedAgent::new([vec!["o 0 0 e"]])),
            Box::new(BotAgent::hold()),
        ];
        let mut runner = runner(agents, RunnerConfig::default());
        assert!(matches!(runner.half_step().unwrap(), HalfStep::Moved(_)));
        assert_eq!(runner.game().phase(), Phase::Resolve);
        assert!(runner.game().world().ant_at(Loc::new(0, 1)).is_some());
        assert!(matches!(runner.half_step().unwrap(), HalfStep::Resolved(summary) if summary.turn == 1));
        // Adjacent ants now trade under damage combat.
        assert_eq!(runner.game().world().live_ant_count(), 0);
        assert!(matches!(runner.half_step().unwrap(), HalfStep::Finished));
    }

    #[test]
    fn test_strict_mode_rejects_invalid_orders() {
        let agents: Vec<Box<dyn Agent>> = vec![
            Box::new(ScriptedAgent::new([vec!["o 0 5 e"]])),
            Box::new(BotAgent::hold()),
        ];
        let mut runner = runner(agents, RunnerConfig { strict: true });
        let err = runner.step().unwrap_err();
        assert!(matches!(err, RunError::InvalidOrders { player: 0, .. }));
    }

    #[test]
    fn test_permissive_mode_drops_invalid_orders() {
        let agents: Vec<Box<dyn Agent>> = vec![
            Box::new(ScriptedAgent::new([vec!["o 0 5 e", "jump"]])),
            Box::new(BotAgent::hold()),
        ];
        let mut runner = runner(agents, RunnerConfig::default());
        assert!(runner.step().unwrap().is_some());
        assert_eq!(runner.game().world().live_ant_count(), 2);
    }

    #[test]
    fn test_failing_agent_is_evicted() {
        let agents: Vec<Box<dyn Agent>> = vec![Box::new(FailingAgent), Box::new(BotAgent::hold())];
        let result = runner(agents, RunnerConfig::default()).run().unwrap();
        assert_eq!(result.evicted, vec![0]);
        assert_eq!(result.turns_played, 1);
        // The evicted player keeps its starting point, so nobody wins outright.
        assert_eq!(result.scores, vec![1, 1]);
        assert_eq!(result.winner, None);
    }

    #[test]
    fn test_batch_is_thread_independent() {
        let text = "rows 4\ncols 8\nm a.......\nm ........\nm ....b...\nm ........\n";
        let map = parse_map(text).unwrap();
        let options = GameOptions {
            turns: 10,
            ..GameOptions::default()
        };
        let parallel = run_batch(&map, &options, 7, 4, |_| {});
        let mut sequential = BatchStats::new(2);
        for i in 0..4 {
            let options = GameOptions {
                engine_seed: 7 + i,
                ..options.clone()
            };
            sequential.add_result(&run_hold_game(&map, options).unwrap());
        }
        assert_eq!(parallel, sequential);
        assert_eq!(parallel.games_played, 4);
    }
}
