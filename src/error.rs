//! Error types for the rules engine.
//!
//! Map format and consistency errors are fatal: the first means the input
//! was rejected at load time, the second means the engine itself has a bug.
//! Order problems are not errors at this level; they are collected into an
//! [`OrderReport`](crate::game::OrderReport) and it is up to the runner to
//! decide how strict to be.

use thiserror::Error;

use crate::game::{Loc, Phase, PlayerId};

/// A map file could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MapFormatError {
    /// A map row had the wrong number of characters.
    #[error("incorrect number of cols in row {row}: got {actual}, expected {expected}")]
    RowWidth {
        /// Zero-based index of the offending row.
        row: usize,
        /// Width declared by the `cols` header.
        expected: usize,
        /// Width of the row as given.
        actual: usize,
    },
    /// The number of `m` rows did not match the `rows` header.
    #[error("incorrect number of rows: expected {expected}, got {actual}")]
    RowCount {
        /// Height declared by the `rows` header.
        expected: usize,
        /// Number of rows found.
        actual: usize,
    },
    /// A map row contained a character outside `a-z * % .`.
    #[error("invalid character in map: {ch:?} at row {row}, col {col}")]
    InvalidCharacter {
        /// Zero-based row.
        row: usize,
        /// Zero-based column.
        col: usize,
        /// The rejected character.
        ch: char,
    },
    /// A header line was missing or could not be parsed.
    #[error("bad header line: {line:?}")]
    BadHeader {
        /// The offending line.
        line: String,
    },
    /// A required header never appeared.
    #[error("missing {0} header")]
    MissingHeader(&'static str),
    /// The map has no starting ants.
    #[error("map has no players")]
    NoPlayers,
    /// The map is not symmetric under the translation between the first two
    /// starting positions, so symmetric food placement is impossible.
    #[error("this map does not support symmetric food placement")]
    Asymmetric,
}

/// The grid and the entity index disagree.
///
/// Always a bug in the engine, never caused by player input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConsistencyError {
    /// Food was added onto a cell that is not land.
    #[error("add food error: cell {0} is not land")]
    FoodOnOccupiedCell(Loc),
    /// Food was removed from a cell that has no food record.
    #[error("remove food error: food not found at {0}")]
    FoodNotFound(Loc),
    /// An ant was spawned onto a cell that is not land.
    #[error("add ant error: cell {0} is not land")]
    AntOnOccupiedCell(Loc),
    /// An ant was killed that is not in the live index.
    #[error("kill ant error: ant not found at {0}")]
    AntNotFound(Loc),
}

/// Errors raised by the game state machine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GameError {
    /// The map could not be loaded.
    #[error(transparent)]
    Map(#[from] MapFormatError),
    /// Internal consistency was violated.
    #[error(transparent)]
    Consistency(#[from] ConsistencyError),
    /// A turn operation was called in the wrong phase.
    #[error("{operation} called during {actual:?} phase (expected {expected:?})")]
    Phase {
        /// Name of the rejected operation.
        operation: &'static str,
        /// Phase the operation requires.
        expected: Phase,
        /// Phase the game was in.
        actual: Phase,
    },
    /// A player id outside `0..num_players`.
    #[error("unknown player {0}")]
    UnknownPlayer(PlayerId),
    /// A game option has an unusable value.
    #[error("option {0} must be positive")]
    InvalidOption(&'static str),
}
