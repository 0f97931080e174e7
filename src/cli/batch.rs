//! Batch command implementation.

use super::output::{JsonBatchResult, format_batch_text};
use super::{CliError, OutputFormat, load_map};
use formica::GameOptions;
use formica::runner::run_batch;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::Instant;

/// Execute the batch command.
///
/// # Errors
///
/// Returns an error if the map cannot be loaded or the progress bar
/// template is rejected.
pub(crate) fn execute(
    map: &Path,
    games: u64,
    seed: u64,
    threads: Option<usize>,
    options: &GameOptions,
    format: OutputFormat,
    progress: bool,
) -> Result<(), CliError> {
    let map = load_map(map)?;

    // Set thread pool size if specified
    if let Some(num_threads) = threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .build_global()
            .ok(); // Ignore error if already initialized
    }

    let pb = if progress {
        let pb = ProgressBar::new(games);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} games ({per_sec})")
                .map_err(|e| CliError::new(format!("Invalid progress template: {e}")))?
                .progress_chars("=>-"),
        );
        Some(pb)
    } else {
        None
    };

    let start = Instant::now();
    let stats = run_batch(&map, options, seed, games, |_| {
        if let Some(pb) = &pb {
            pb.inc(1);
        }
    });
    let elapsed = start.elapsed().as_secs_f64();

    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    match format {
        OutputFormat::Text => {
            print!("{}", format_batch_text(&stats, elapsed));
        }
        OutputFormat::Json => {
            let json_result = JsonBatchResult::from_stats(&stats, elapsed);
            println!("{}", serde_json::to_string_pretty(&json_result)?);
        }
    }

    Ok(())
}
