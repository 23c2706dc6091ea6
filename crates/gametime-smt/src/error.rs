//! Lowering error types.

use gametime_core::Op;
use thiserror::Error;

/// Errors produced while serializing a path to a QF_AUFBV query.
#[derive(Debug, Error)]
pub enum SmtError {
    /// An array variable reached lowering without recorded dimensions.
    #[error("no dimensions recorded for array variable '{name}'")]
    UnknownDimensions { name: String },

    /// The operator has no QF_AUFBV counterpart (it should have been
    /// eliminated during analysis).
    #[error("operator {op:?} cannot be lowered to QF_AUFBV")]
    UnsupportedOp { op: Op },
}
