//! CLI command implementations for Formica.

pub(crate) mod batch;
pub(crate) mod run;
pub(crate) mod validate;

mod output;

use clap::ValueEnum;
use std::error::Error;
use std::fmt;
use std::fs;
use std::path::Path;

use formica::MapData;

/// Output format for the `run` and `batch` commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// Machine-readable JSON output.
    Json,
}

/// CLI error type.
#[derive(Debug)]
pub(crate) struct CliError {
    message: String,
}

impl CliError {
    /// Create a new CLI error.
    pub(crate) fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Error for CliError {}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        Self::new(e.to_string())
    }
}

impl From<formica::GameError> for CliError {
    fn from(e: formica::GameError) -> Self {
        Self::new(e.to_string())
    }
}

impl From<formica::MapFormatError> for CliError {
    fn from(e: formica::MapFormatError) -> Self {
        Self::new(e.to_string())
    }
}

impl From<formica::runner::RunError> for CliError {
    fn from(e: formica::runner::RunError) -> Self {
        Self::new(e.to_string())
    }
}

impl From<formica::runner::AgentError> for CliError {
    fn from(e: formica::runner::AgentError) -> Self {
        Self::new(e.to_string())
    }
}

impl From<formica::replay::ReplayError> for CliError {
    fn from(e: formica::replay::ReplayError) -> Self {
        Self::new(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::new(format!("JSON serialization failed: {e}"))
    }
}

/// Read and parse a map file.
pub(crate) fn load_map(path: &Path) -> Result<MapData, CliError> {
    let text = fs::read_to_string(path)
        .map_err(|e| CliError::new(format!("Failed to read {}: {e}", path.display())))?;
    Ok(formica::parse_map(&text)?)
}

/// Engine seed from the flag, or from the clock.
pub(crate) fn resolve_seed(seed: Option<u64>) -> u64 {
    seed.unwrap_or_else(|| {
        use std::time::{SystemTime, UNIX_EPOCH};
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() ^ u64::from(d.subsec_nanos()))
            .unwrap_or(42)
    })
}
