//! Pending literal block
//!
//! Callers append raw bytes to an open block before they are committed as
//! hunks. Committing either moves the whole buffer into one self read or,
//! when reuse hints are set, splits it into self reads and source copies.

use crate::error::{BpsError, BpsResult};
use crate::hunk::{self, CopyKind, DEFAULT_SELF_READ_NAME, Hunk};
use crate::matcher::{self, Segment};
use std::ops::Range;
use tracing::debug;

/// Bytes waiting to become hunks
#[derive(Debug, Clone, Default)]
pub struct PendingBlock {
    start: Option<usize>,
    name: Option<String>,
    reuse_hints: Vec<Range<usize>>,
    buffer: Vec<u8>,
}

impl PendingBlock {
    /// Create an empty accumulator with no open block
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a new block; any previous contents must already be committed
    pub fn open(&mut self, start: usize, name: Option<String>, reuse_hints: Vec<Range<usize>>) {
        self.start = Some(start);
        self.name = name;
        self.reuse_hints = reuse_hints;
        self.buffer.clear();
    }

    /// Append bytes to the block
    ///
    /// Refused, with nothing buffered, when the block would end past
    /// `usize::MAX`.
    pub fn append(&mut self, bytes: &[u8]) -> BpsResult<()> {
        if let Some(start) = self.start {
            let name = self.name().unwrap_or(DEFAULT_SELF_READ_NAME);
            let length = self
                .buffer
                .len()
                .checked_add(bytes.len())
                .ok_or_else(|| BpsError::invalid_hunk(name, "range overflows usize"))?;
            hunk::checked_end(name, start, length)?;
        }
        self.buffer.extend_from_slice(bytes);
        Ok(())
    }

    /// Name of the open block, if any
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// True while a block is open
    pub fn is_open(&self) -> bool {
        self.start.is_some()
    }

    /// Number of buffered bytes
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// True when nothing is buffered
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Destination range the buffered bytes will cover
    ///
    /// `None` when nothing is buffered. Buffered bytes without an open block
    /// are an error.
    pub fn extent(&self) -> BpsResult<Option<Range<usize>>> {
        if self.buffer.is_empty() {
            return Ok(None);
        }
        let start = self.start.ok_or(BpsError::NoOpenBlock {
            pending: self.buffer.len(),
        })?;
        let name = self.name().unwrap_or(DEFAULT_SELF_READ_NAME);
        let end = hunk::checked_end(name, start, self.buffer.len())?;
        Ok(Some(start..end))
    }

    /// Turn the buffer into hunks and clear the block
    ///
    /// Nothing changes when the buffer is empty. Bytes buffered without an
    /// open block are an error and stay buffered.
    pub fn take_hunks(&mut self, source: &[u8], match_threshold: usize) -> BpsResult<Vec<Hunk>> {
        let Some(range) = self.extent()? else {
            return Ok(Vec::new());
        };

        let start = range.start;
        let name = self
            .name
            .take()
            .unwrap_or_else(|| DEFAULT_SELF_READ_NAME.to_string());
        let hints = std::mem::take(&mut self.reuse_hints);
        let buffer = std::mem::take(&mut self.buffer);
        self.start = None;

        let hunks = if hints.is_empty() {
            vec![Hunk::self_read(name.clone(), start, buffer)?]
        } else {
            split_into_hunks(&name, start, &buffer, source, &hints, match_threshold)?
        };

        debug!(
            block = %name,
            start,
            length = range.len(),
            hunks = hunks.len(),
            "committed pending block"
        );
        Ok(hunks)
    }
}

fn split_into_hunks(
    name: &str,
    start: usize,
    buffer: &[u8],
    source: &[u8],
    hints: &[Range<usize>],
    match_threshold: usize,
) -> BpsResult<Vec<Hunk>> {
    matcher::split_block(buffer, source, hints, match_threshold)
        .into_iter()
        .enumerate()
        .map(|(index, segment)| match segment {
            Segment::Literal(range) => Hunk::self_read(
                format!("{name}_{index}_self_read"),
                start + range.start,
                buffer[range].to_vec(),
            ),
            Segment::Copy {
                range,
                source_offset,
            } => Hunk::copy(
                format!("{name}_{index}_copy"),
                start + range.start,
                CopyKind::Source,
                range.len(),
                source_offset,
            ),
        })
        .collect()
}
