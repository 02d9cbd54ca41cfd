//! Queued BPS1 patch writer
//!
#![allow(clippy::cast_possible_truncation)] // Lengths are bounded by in-memory buffers
#![allow(clippy::cast_possible_wrap)] // Relative copy offsets
#![allow(clippy::cast_precision_loss)] // Statistics percentages
#![allow(clippy::doc_markdown)] // Format names don't need backticks
#![allow(clippy::module_name_repetitions)] // Clear naming is preferred
#![allow(clippy::return_self_not_must_use)] // Builder patterns
#![allow(clippy::missing_const_for_fn)] // Accessors
//! This crate builds BPS delta patches against an original buffer. Callers
//! describe the target piece by piece (literal blocks, source reads, source
//! and target copies, blanked ranges) and the writer produces a byte-exact
//! BPS1 patch with CRC32 checksums.
//!
//! # Pipeline
//!
//! - **Construction**: blocks and hunks are queued into a sorted store that
//!   rejects any overlapping destination range
//! - **Match search**: blocks opened with reuse hints are split into literal
//!   runs and source copies by a greedy longest-match scan
//! - **Optimization**: degenerate copies become source reads and contiguous
//!   hunks are merged
//! - **Gap filling**: every uncovered target byte is read from the source or
//!   blanked
//! - **Encoding**: hunks are serialized with relative copy offsets and the
//!   result is replayed to compute the target checksum
//!
//! # Example
//!
//! ```
//! use bps_writer::{BpsWriter, CopyKind};
//!
//! let source = b"hello world, hello patch".to_vec();
//! let mut writer = BpsWriter::new(&source);
//!
//! writer.start_block(0, Some("greeting"), &[])?;
//! writer.append(b"HELLO")?;
//! writer.new_copy_hunk(13, CopyKind::Source, 5, 0, Some("again"))?;
//! writer.queue_blanked_block(19..24)?;
//!
//! let patch = writer.finalize(source.len(), &[])?;
//! assert_eq!(&patch[..4], b"BPS1");
//! # Ok::<(), bps_writer::BpsError>(())
//! ```

#![warn(missing_docs)]

pub mod accumulator;
pub mod blanks;
pub mod config;
pub mod error;
pub mod fill;
pub mod hunk;
pub mod instruction;
pub mod matcher;
pub mod optimizer;
pub mod patch;
pub mod queued_writer;
pub mod stats;
pub mod store;
pub mod varint;
pub mod writer;

pub use blanks::BlankRanges;
pub use config::{DEFAULT_MATCH_THRESHOLD, WriterConfig};
pub use error::{BpsError, BpsResult};
pub use hunk::{CopyKind, Hunk, HunkKind, HunkOp};
pub use instruction::{CopyInstruction, SUPPORTED_MNEMONICS};
pub use patch::{
    BPS_MAGIC, BpsChecksums, BpsTrailer, PatchHeader, apply_hunks, encode_patch, verify_checksums,
};
pub use queued_writer::QueuedWriter;
pub use stats::HunkStats;
pub use store::HunkStore;
pub use writer::BpsWriter;
