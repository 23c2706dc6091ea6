//! Analysis error types.
//!
//! Fatal errors abort the path and reach the caller as structured,
//! matchable variants. Warnings (float truncation, zero-padded aggregate
//! coverage) go through `tracing` and never alter the output. Precondition
//! violations -- out-of-range parameter indices, dereferencing a
//! non-pointer, building a temporary pointer from a non-pointer type --
//! are bugs and panic.

use gametime_core::CoreError;
use thiserror::Error;

/// Errors produced while analyzing one path.
#[derive(Debug, Error)]
pub enum AnalyzeError {
    /// Switch instructions must be lowered to if-chains upstream.
    #[error("switch instruction at line {line}; lower switches to if-chains before analysis")]
    SwitchInstruction { line: u32 },

    /// The executor dispatch met an opcode it has no rule for.
    #[error("unknown opcode {opcode} defining '{operand}' at line {line}")]
    UnknownOpcode {
        opcode: String,
        operand: String,
        line: u32,
    },

    /// Structurally malformed IR (missing operand, dangling reference).
    #[error("malformed IR: {reason}")]
    MalformedIr { reason: String },

    /// An immediate operand that is neither a finite float nor an integer.
    #[error("unsupported immediate operand '{name}'")]
    UnsupportedImmediate { name: String },

    /// Aggregate accesses require compile-time-constant offsets.
    #[error("non-constant offset in aggregate access: {offset}")]
    NonConstantOffset { offset: String },

    /// Filesystem failure while writing a sidecar artifact.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Core(#[from] CoreError),
}
