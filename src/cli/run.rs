//! Run command implementation.

use super::output::{JsonGameResult, format_text};
use super::{CliError, OutputFormat, load_map};
use formica::runner::{Agent, BotAgent, GameRunner, GreedyBot, HoldBot, ProcessAgent, RunnerConfig};
use formica::{GameOptions, GameState};
use std::path::PathBuf;

/// Arguments of the run command.
#[derive(Debug)]
pub(crate) struct RunArgs {
    pub(crate) map: PathBuf,
    pub(crate) agents: Vec<String>,
    pub(crate) options: GameOptions,
    pub(crate) strict: bool,
    pub(crate) replay: Option<PathBuf>,
    pub(crate) format: OutputFormat,
}

/// Build the agent for one seat. `hold` and `greedy` are built-in bots,
/// anything else is a command line.
fn make_agent(name: &str) -> Result<Box<dyn Agent>, CliError> {
    Ok(match name {
        "hold" => Box::new(BotAgent::new("hold", HoldBot)),
        "greedy" => Box::new(BotAgent::new("greedy", GreedyBot)),
        command => Box::new(ProcessAgent::spawn(command)?),
    })
}

/// Execute the run command.
///
/// # Errors
///
/// Returns an error if the map cannot be loaded or the game fails to run.
pub(crate) fn execute(args: RunArgs) -> Result<(), CliError> {
    let map = load_map(&args.map)?;
    let num_players = map.num_players();
    if args.agents.len() > num_players {
        return Err(CliError::new(format!(
            "{} agents given but the map has {num_players} players",
            args.agents.len()
        )));
    }

    let mut agent_names = Vec::with_capacity(num_players);
    let mut agents = Vec::with_capacity(num_players);
    for seat in 0..num_players {
        let name = args.agents.get(seat).map_or("hold", String::as_str);
        agents.push(make_agent(name)?);
        agent_names.push(name.to_string());
    }

    let seed = args.options.engine_seed;
    tracing::info!(seed, players = num_players, map = %args.map.display(), "starting game");

    let game = GameState::new(&map, args.options)?;
    let runner = GameRunner::new(game, agents, RunnerConfig { strict: args.strict })?;
    let result = runner.run()?;

    if let Some(path) = &args.replay {
        result.replay.save(path)?;
        tracing::info!(path = %path.display(), "replay saved");
    }

    match args.format {
        OutputFormat::Text => {
            print!("{}", format_text(&result, &agent_names));
        }
        OutputFormat::Json => {
            let json_result = JsonGameResult::from_game_result(&result, &agent_names);
            println!("{}", serde_json::to_string_pretty(&json_result)?);
        }
    }

    Ok(())
}
