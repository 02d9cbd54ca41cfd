//! Block-oriented writer interface
//!
//! Code that emits output block by block (an assembler, a data packer) can
//! target any [`QueuedWriter`] without knowing it is producing a patch.

use crate::error::BpsResult;
use crate::writer::BpsWriter;
use std::ops::Range;

/// Sink that receives bytes in named, positioned blocks
pub trait QueuedWriter {
    /// Append bytes to the open block
    fn append(&mut self, bytes: &[u8]) -> BpsResult<()>;

    /// Close the current block and open a new one at `start`
    ///
    /// `reuse_hints` name source ranges the new block's bytes may already
    /// exist in.
    fn start_new_block(
        &mut self,
        start: usize,
        name: Option<&str>,
        reuse_hints: &[Range<usize>],
    ) -> BpsResult<()>;

    /// Mark a range that should read as blank unless written
    fn queue_blanked_block(&mut self, range: Range<usize>) -> BpsResult<()>;

    /// Name of the block being written
    fn current_block_name(&self) -> Option<&str>;
}

impl QueuedWriter for BpsWriter<'_> {
    fn append(&mut self, bytes: &[u8]) -> BpsResult<()> {
        Self::append(self, bytes)
    }

    fn start_new_block(
        &mut self,
        start: usize,
        name: Option<&str>,
        reuse_hints: &[Range<usize>],
    ) -> BpsResult<()> {
        self.start_block(start, name, reuse_hints)
    }

    fn queue_blanked_block(&mut self, range: Range<usize>) -> BpsResult<()> {
        Self::queue_blanked_block(self, range)
    }

    fn current_block_name(&self) -> Option<&str> {
        Self::current_block_name(self)
    }
}
