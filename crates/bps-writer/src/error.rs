//! Error types for BPS patch construction and encoding
//!
//! Every failure is reported synchronously to the caller with enough context
//! (hunk names, offending offsets) to diagnose it. Nothing is retried
//! internally; a failed call leaves the writer as it was before the call.

use thiserror::Error;

/// BPS writer error types
#[derive(Error, Debug)]
pub enum BpsError {
    /// A hunk's destination range intersects one that is already queued
    #[error(
        "hunk \"{name}\" [{start}, {end}) overlaps hunk \"{existing}\" [{existing_start}, {existing_end})"
    )]
    Overlap {
        /// Name of the hunk being added
        name: String,
        /// First destination byte of the hunk being added
        start: usize,
        /// Exclusive end of the hunk being added
        end: usize,
        /// Name of the hunk already present
        existing: String,
        /// First destination byte of the existing hunk
        existing_start: usize,
        /// Exclusive end of the existing hunk
        existing_end: usize,
    },

    /// Hunk failed validation at construction
    #[error("invalid hunk \"{name}\": {reason}")]
    InvalidHunk {
        /// Name of the rejected hunk
        name: String,
        /// Why the hunk was rejected
        reason: String,
    },

    /// Declared target length does not cover every queued hunk
    #[error("target length {target_length} is shorter than the queued hunks, which need {required} bytes")]
    TargetTooShort {
        /// Declared target length
        target_length: usize,
        /// Exclusive end of the last queued hunk
        required: usize,
    },

    /// Part of the target is written by no hunk
    #[error("target bytes [{start}, {end}) are not covered by any hunk")]
    UncoveredRange {
        /// First uncovered byte
        start: usize,
        /// Exclusive end of the uncovered bytes
        end: usize,
    },

    /// Target would be longer than the source buffer
    #[error("target length {target_length} exceeds source length {source_length}; growing the target is not supported")]
    UnsupportedTargetGrowth {
        /// Length of the original buffer
        source_length: usize,
        /// Requested target length
        target_length: usize,
    },

    /// Bytes were appended but no block was started to place them
    #[error("{pending} appended bytes have no destination; start a block first")]
    NoOpenBlock {
        /// Number of bytes waiting in the accumulator
        pending: usize,
    },

    /// Writer configuration is unusable
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The writer has already produced its patch
    #[error("writer was already finalized")]
    AlreadyFinalized,

    /// Replaying a hunk would read or write outside a buffer
    #[error("hunk \"{name}\" is out of bounds: {reason}")]
    OutOfBounds {
        /// Name of the offending hunk
        name: String,
        /// Which access failed
        reason: String,
    },

    /// A copy instruction could not be parsed
    #[error("invalid instruction {mnemonic}: {reason}")]
    InvalidInstruction {
        /// Instruction mnemonic as given
        mnemonic: String,
        /// Why parsing failed
        reason: String,
    },

    /// Input ended before a value was fully read
    #[error("truncated data: need {needed} bytes, got {available} bytes")]
    Truncated {
        /// Bytes needed
        needed: usize,
        /// Bytes available
        available: usize,
    },

    /// A variable-length integer does not fit in 64 bits
    #[error("variable-length integer overflows 64 bits")]
    VarintOverflow,

    /// A stored checksum does not match the computed one
    #[error("{field} checksum mismatch: expected {expected:#010x}, got {actual:#010x}")]
    ChecksumMismatch {
        /// Which checksum failed
        field: &'static str,
        /// Checksum stored in the patch
        expected: u32,
        /// Checksum computed from the data
        actual: u32,
    },

    /// Data does not start with the BPS1 magic
    #[error("not a BPS1 patch")]
    InvalidMagic,

    /// I/O error while writing the patch out
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Binary format error from binrw
    #[error("binary format error: {0}")]
    BinaryFormat(#[from] binrw::Error),
}

/// Result type for BPS writer operations
pub type BpsResult<T> = Result<T, BpsError>;

impl BpsError {
    /// Create an invalid hunk error
    pub fn invalid_hunk<N: Into<String>, R: Into<String>>(name: N, reason: R) -> Self {
        Self::InvalidHunk {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Create an out of bounds error
    pub fn out_of_bounds<N: Into<String>, R: Into<String>>(name: N, reason: R) -> Self {
        Self::OutOfBounds {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid instruction error
    pub fn invalid_instruction<M: Into<String>, R: Into<String>>(mnemonic: M, reason: R) -> Self {
        Self::InvalidInstruction {
            mnemonic: mnemonic.into(),
            reason: reason.into(),
        }
    }

    /// Create a truncated data error
    pub fn truncated(needed: usize, available: usize) -> Self {
        Self::Truncated { needed, available }
    }

    /// Check if this error was caused by a bad construction call
    ///
    /// These leave the writer untouched; the caller may fix its input and
    /// repeat the call.
    pub fn is_construction_error(&self) -> bool {
        matches!(
            self,
            Self::Overlap { .. } | Self::InvalidHunk { .. } | Self::NoOpenBlock { .. }
        )
    }

    /// Check if this error indicates corrupt or foreign patch data
    pub fn is_corruption_error(&self) -> bool {
        matches!(
            self,
            Self::ChecksumMismatch { .. }
                | Self::InvalidMagic
                | Self::Truncated { .. }
                | Self::VarintOverflow
        )
    }
}
