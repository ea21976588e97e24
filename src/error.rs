use std::io;
use thiserror::Error;

use crate::grid::Position;

/// Reasons a level grid cannot be played.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MalformedLevel {
    #[error("grid has no rows")]
    Empty,
    #[error("row {row} has {found} cells, expected {expected}")]
    Ragged {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("invalid character {ch:?} at ({x}, {y})")]
    InvalidCharacter { ch: char, x: usize, y: usize },
    #[error("no player start marker")]
    MissingPlayer,
    #[error("multiple player start markers at {first} and {second}")]
    MultiplePlayers { first: Position, second: Position },
}

/// Error type for level catalogue operations.
#[derive(Error, Debug)]
pub enum LevelError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("level {level} is malformed: {source}")]
    Malformed {
        level: usize,
        #[source]
        source: MalformedLevel,
    },
    #[error("level index {index} not found (catalogue has {count} levels)")]
    NotFound { index: usize, count: usize },
}
