//! Formica CLI - Command-line interface for running Formica games.

// Allow print in the CLI binary
#![allow(clippy::print_stdout, clippy::print_stderr)]

mod cli;

use clap::{Args as ClapArgs, Parser, Subcommand};
use formica::{AttackStrategy, FoodStrategy, GameOptions};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Formica - A deterministic rules engine for the ants colony game
#[derive(Parser, Debug)]
#[command(name = "formica")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Log engine decisions at debug level (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Rules shared by `run` and `batch`.
#[derive(ClapArgs, Debug)]
struct RuleArgs {
    /// Maximum turns
    #[arg(short, long, default_value = "1000")]
    turns: u32,

    /// Combat rule: power, closest, support or damage
    #[arg(long, default_value = "power")]
    attack: AttackStrategy,

    /// Food placement rule: none, random, sections or symmetric
    #[arg(long, default_value = "symmetric")]
    food: FoodStrategy,

    /// Squared view radius
    #[arg(long, default_value = "55")]
    viewradius2: u32,

    /// Squared attack radius
    #[arg(long, default_value = "5")]
    attackradius2: u32,

    /// Squared spawn radius
    #[arg(long, default_value = "1")]
    spawnradius2: u32,

    /// Seed forwarded to agents
    #[arg(long, default_value = "0")]
    player_seed: u64,

    /// Add the end-of-game bonus to the final scores
    #[arg(long)]
    add_bonus: bool,
}

impl RuleArgs {
    fn options(&self, engine_seed: u64) -> GameOptions {
        GameOptions {
            turns: self.turns,
            viewradius2: self.viewradius2,
            attackradius2: self.attackradius2,
            spawnradius2: self.spawnradius2,
            engine_seed,
            player_seed: self.player_seed,
            attack: self.attack,
            food: self.food,
            add_bonus: self.add_bonus,
            ..GameOptions::default()
        }
    }
}

/// Available commands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a single game
    Run {
        /// Map file
        #[arg(required = true)]
        map: PathBuf,

        /// Agent for the next seat: hold, greedy or a command line.
        /// Seats without an agent hold.
        #[arg(short, long = "agent")]
        agents: Vec<String>,

        /// Engine seed (default: random)
        #[arg(short = 's', long)]
        engine_seed: Option<u64>,

        #[command(flatten)]
        rules: RuleArgs,

        /// Abort on the first invalid order instead of dropping it
        #[arg(long)]
        strict: bool,

        /// Save the replay summary to file
        #[arg(long)]
        replay: Option<PathBuf>,

        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: cli::OutputFormat,
    },

    /// Run many hold-agent games in parallel and aggregate statistics
    Batch {
        /// Map file
        #[arg(required = true)]
        map: PathBuf,

        /// Number of games to run
        #[arg(short, long, default_value = "100")]
        games: u64,

        /// Starting engine seed (increments for each game)
        #[arg(short, long)]
        seed: Option<u64>,

        /// Parallel threads (default: CPU count)
        #[arg(short = 'j', long)]
        threads: Option<usize>,

        #[command(flatten)]
        rules: RuleArgs,

        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: cli::OutputFormat,

        /// Show progress bar
        #[arg(short, long)]
        progress: bool,
    },

    /// Parse a map file and print a summary
    Validate {
        /// Map file
        #[arg(required = true)]
        map: PathBuf,
    },
}

fn init_logging(verbose: bool) {
    let filter = if std::env::var_os("RUST_LOG").is_some() {
        EnvFilter::from_default_env()
    } else if verbose {
        EnvFilter::new("formica=debug")
    } else {
        EnvFilter::new("formica=warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    let result = match args.command {
        Commands::Run {
            map,
            agents,
            engine_seed,
            rules,
            strict,
            replay,
            format,
        } => cli::run::execute(cli::run::RunArgs {
            map,
            agents,
            options: rules.options(cli::resolve_seed(engine_seed)),
            strict,
            replay,
            format,
        }),

        Commands::Batch {
            map,
            games,
            seed,
            threads,
            rules,
            format,
            progress,
        } => {
            let options = rules.options(0);
            cli::batch::execute(&map, games, cli::resolve_seed(seed), threads, &options, format, progress)
        }

        Commands::Validate { map } => cli::validate::execute(&map),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
