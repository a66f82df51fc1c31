//! Error types for value tables, their persistence, and agent lifecycle.

use cairn_space::IndexError;
use std::io;
use thiserror::Error;

/// Errors from value-table construction, encoding, or storage.
#[derive(Debug, Error)]
pub enum TableError {
    /// A table's shape does not match the shape its consumer requires.
    #[error("table shape {found_rows}x{found_cols} does not match expected {expected_rows}x{expected_cols}")]
    ShapeMismatch {
        /// Rows required.
        expected_rows: usize,
        /// Columns required.
        expected_cols: usize,
        /// Rows present.
        found_rows: usize,
        /// Columns present.
        found_cols: usize,
    },
    /// A table must have at least one row and one column.
    #[error("table must have at least one row and one column")]
    Empty,
    /// An I/O error occurred while reading or writing a table.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// The stream does not start with the expected `b"CAQT"` magic bytes.
    #[error("invalid magic bytes (expected b\"CAQT\")")]
    InvalidMagic,
    /// The format version is not supported by this build.
    #[error("unsupported table format version {found}")]
    UnsupportedVersion {
        /// The version found in the stream.
        found: u8,
    },
    /// The stream ended before the declared payload was read.
    #[error("truncated table: {detail}")]
    Truncated {
        /// What was being read when the stream ended.
        detail: String,
    },
    /// The trailing checksum does not match the payload.
    #[error("checksum mismatch: stored={stored:#018x}, computed={computed:#018x}")]
    ChecksumMismatch {
        /// Checksum read from the stream.
        stored: u64,
        /// Checksum computed over the payload.
        computed: u64,
    },
}

/// Fatal errors raised while initialising or stepping an agent.
///
/// Movement rejections are not errors; they surface as
/// [`MoveResult`](crate::movement::MoveResult) values.
#[derive(Debug, Error)]
pub enum AgentError {
    /// Index contract violation (duplicate registration, missing key).
    #[error(transparent)]
    Index(#[from] IndexError),
    /// Table load, save, or shape failure.
    #[error(transparent)]
    Table(#[from] TableError),
    /// Start or goal lies outside the grid.
    #[error("{what} {position} lies outside the {width}x{height} grid")]
    OutsideGrid {
        /// `"start"` or `"goal"`.
        what: &'static str,
        /// The offending position.
        position: cairn_core::Position,
        /// Grid width.
        width: u32,
        /// Grid height.
        height: u32,
    },
    /// Hyperparameters failed validation.
    #[error("invalid hyperparameter {name} = {value}: must be finite and in [0, 1]")]
    InvalidHyperparameter {
        /// Parameter name.
        name: &'static str,
        /// The rejected value.
        value: f64,
    },
}
