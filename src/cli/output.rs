//! Output formatting utilities for CLI.

// Allow format! with push_str for readability
#![allow(clippy::format_push_string)]

use formica::runner::{BatchStats, GameResult};
use serde::Serialize;

/// JSON-serializable game result.
#[derive(Debug, Serialize)]
pub(super) struct JsonGameResult {
    /// Engine seed used.
    pub(super) seed: u64,
    /// Winner player ID (null if draw).
    pub(super) winner: Option<u8>,
    /// Total turns played.
    pub(super) turns_played: u32,
    /// Per-player results.
    pub(super) players: Vec<JsonPlayerResult>,
}

/// JSON-serializable player result.
#[derive(Debug, Serialize)]
pub(super) struct JsonPlayerResult {
    /// Player ID.
    pub(super) id: u8,
    /// Agent label.
    pub(super) agent: String,
    /// Final score.
    pub(super) score: i64,
    /// Live ants at the end.
    pub(super) ants: usize,
    /// Whether the agent was evicted.
    pub(super) evicted: bool,
}

impl JsonGameResult {
    /// Create from a GameResult.
    pub(super) fn from_game_result(result: &GameResult, agent_names: &[String]) -> Self {
        Self {
            seed: result.seed,
            winner: result.winner,
            turns_played: result.turns_played,
            players: result
                .scores
                .iter()
                .enumerate()
                .map(|(i, &score)| {
                    let id = u8::try_from(i).unwrap_or(u8::MAX);
                    JsonPlayerResult {
                        id,
                        agent: agent_names.get(i).cloned().unwrap_or_default(),
                        score,
                        ants: result.stats.ant_count.get(i).copied().unwrap_or(0),
                        evicted: result.evicted.contains(&id),
                    }
                })
                .collect(),
        }
    }
}

/// Format a game result as human-readable text.
pub(super) fn format_text(result: &GameResult, agent_names: &[String]) -> String {
    let mut output = String::new();

    output.push_str(&format!("Game Result (seed: {})\n", result.seed));
    if let Some(winner) = result.winner {
        let name = agent_names.get(usize::from(winner)).map_or("unknown", String::as_str);
        output.push_str(&format!("  Winner: Player {winner} ({name})\n"));
    } else {
        output.push_str("  Winner: Draw\n");
    }
    output.push_str(&format!("  Turns: {}\n\n", result.turns_played));

    for (i, score) in result.scores.iter().enumerate() {
        let name = agent_names.get(i).map_or("unknown", String::as_str);
        let ants = result.stats.ant_count.get(i).copied().unwrap_or(0);
        output.push_str(&format!("  Player {i}: {score} points, {ants} ants ({name})"));
        if u8::try_from(i).is_ok_and(|id| result.evicted.contains(&id)) {
            output.push_str(" [evicted]");
        }
        output.push('\n');
    }

    output
}

/// JSON-serializable batch result.
#[derive(Debug, Serialize)]
pub(super) struct JsonBatchResult {
    /// Games that finished.
    pub(super) games_played: u64,
    /// Games that failed to run.
    pub(super) failures: u64,
    /// Games without a sole winner.
    pub(super) draws: u64,
    /// Mean turns per game.
    pub(super) mean_turns: f64,
    /// Wins per player.
    pub(super) wins: Vec<u64>,
    /// Mean final score per player.
    pub(super) mean_scores: Vec<f64>,
    /// Wall-clock time in seconds.
    pub(super) elapsed_secs: f64,
}

impl JsonBatchResult {
    #[allow(clippy::cast_precision_loss)]
    pub(super) fn from_stats(stats: &BatchStats, elapsed_secs: f64) -> Self {
        Self {
            games_played: stats.games_played,
            failures: stats.failures,
            draws: stats.draws,
            mean_turns: stats.total_turns as f64 / stats.games_played.max(1) as f64,
            wins: stats.wins.clone(),
            mean_scores: stats.mean_scores(),
            elapsed_secs,
        }
    }
}

/// Format batch statistics as human-readable text.
#[allow(clippy::cast_precision_loss)]
pub(super) fn format_batch_text(stats: &BatchStats, elapsed_secs: f64) -> String {
    let mut output = String::new();
    let games = stats.games_played.max(1) as f64;

    output.push_str(&format!(
        "Batch Results ({} games, {} failed, {elapsed_secs:.2}s)\n",
        stats.games_played, stats.failures
    ));
    output.push_str(&format!("  Mean turns: {:.1}\n", stats.total_turns as f64 / games));
    output.push_str(&format!("  Draws: {} ({:.1}%)\n\n", stats.draws, stats.draws as f64 * 100.0 / games));

    for (i, (wins, mean)) in stats.wins.iter().zip(stats.mean_scores()).enumerate() {
        output.push_str(&format!(
            "  Player {i}: {wins} wins ({:.1}%), mean score {mean:.2}\n",
            *wins as f64 * 100.0 / games
        ));
    }

    output
}
