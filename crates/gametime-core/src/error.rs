//! Core error types for gametime-core.
//!
//! Uses `thiserror` for structured, matchable error variants covering
//! failure modes in the IR data model and expression construction.

use crate::id::BlockId;
use crate::op::Op;
use thiserror::Error;

/// Core errors produced by the gametime-core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A function unit was looked up by a name the program does not contain.
    #[error("function unit not found: '{name}'")]
    UnitNotFound { name: String },

    /// A block was added twice to the same function unit.
    #[error("duplicate block: {id}")]
    DuplicateBlock { id: BlockId },

    /// A block ID was referenced that the function unit does not contain.
    #[error("unknown block: {id}")]
    UnknownBlock { id: BlockId },

    /// An operator was applied to the wrong number of parameters.
    #[error("operator {op:?} expects {expected} parameter(s), got {got}")]
    ArityMismatch { op: Op, expected: usize, got: usize },

    /// Filesystem I/O failure while loading configuration.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed configuration file.
    #[error("malformed configuration: {0}")]
    Config(#[from] serde_json::Error),
}
