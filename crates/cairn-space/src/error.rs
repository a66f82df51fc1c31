//! Error types for grid construction and spatial index operations.

use cairn_core::Position;
use std::io;
use thiserror::Error;

/// Errors arising from grid construction.
#[derive(Debug, Error)]
pub enum GridError {
    /// Attempted to construct a grid with zero cells.
    #[error("grid must have at least one cell")]
    EmptyGrid,
    /// A row has a different number of cells than the first row.
    #[error("row {row} has {found} cells, expected {expected}")]
    RaggedRow {
        /// Zero-based row index.
        row: usize,
        /// Width established by the first row.
        expected: usize,
        /// Width of the offending row.
        found: usize,
    },
    /// A dimension does not fit in an `i32` coordinate.
    #[error("{name} = {value} exceeds maximum {max}")]
    DimensionTooLarge {
        /// Which dimension (`"width"` or `"height"`).
        name: &'static str,
        /// The offending value.
        value: usize,
        /// Largest accepted value.
        max: usize,
    },
    /// A CSV cell could not be parsed as an integer.
    #[error("line {line}, column {column}: cannot parse {text:?} as a cell value")]
    Parse {
        /// One-based line number.
        line: usize,
        /// One-based column number.
        column: usize,
        /// The raw cell text.
        text: String,
    },
    /// The raster file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Contract violations on a spatial index.
///
/// These indicate a broken invariant in the caller, not a runtime
/// condition to recover from.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum IndexError {
    /// The key is already registered.
    #[error("occupant {key} is already registered")]
    DuplicateRegistration {
        /// Debug rendering of the key.
        key: String,
    },
    /// The key is not registered.
    #[error("occupant {key} is not registered")]
    NotFound {
        /// Debug rendering of the key.
        key: String,
    },
    /// An insertion position lies outside the index extent.
    #[error("position {position} is outside the {width}x{height} index extent")]
    OutOfBounds {
        /// The rejected position.
        position: Position,
        /// Index width.
        width: u32,
        /// Index height.
        height: u32,
    },
    /// Bucket side must be at least one cell.
    #[error("bucket size must be at least 1")]
    InvalidBucketSize,
}
