//! Queued BPS writer
//!
//! [`BpsWriter`] collects hunks against a borrowed source buffer and turns
//! them into a BPS1 patch on [`BpsWriter::finalize`]. Construction calls
//! that fail leave the writer exactly as it was.

use crate::accumulator::PendingBlock;
use crate::blanks::BlankRanges;
use crate::config::WriterConfig;
use crate::error::{BpsError, BpsResult};
use crate::fill;
use crate::hunk::{
    CopyKind, DEFAULT_COPY_NAME, DEFAULT_SELF_READ_NAME, DEFAULT_SOURCE_READ_NAME, Hunk,
};
use crate::optimizer;
use crate::patch;
use crate::stats::HunkStats;
use crate::store::HunkStore;
use std::ops::Range;
use std::path::Path;
use tracing::{debug, info, warn};

/// Builds a BPS1 patch from queued hunks
#[derive(Debug, Clone)]
pub struct BpsWriter<'a> {
    source: &'a [u8],
    config: WriterConfig,
    store: HunkStore,
    pending: PendingBlock,
    blanks: BlankRanges,
    finalized: bool,
}

/// Move the pending block into `store`
///
/// The block's range is checked before the buffer is drained, so an overlap
/// leaves both untouched.
fn commit_pending(
    store: &mut HunkStore,
    pending: &mut PendingBlock,
    source: &[u8],
    match_threshold: usize,
) -> BpsResult<()> {
    let Some(range) = pending.extent()? else {
        return Ok(());
    };
    store.check_insert(
        pending.name().unwrap_or(DEFAULT_SELF_READ_NAME),
        range.start,
        range.len(),
    )?;

    for hunk in pending.take_hunks(source, match_threshold)? {
        store.insert(hunk)?;
    }
    Ok(())
}

impl<'a> BpsWriter<'a> {
    /// Create a writer patching `source` with the default configuration
    pub fn new(source: &'a [u8]) -> Self {
        Self {
            source,
            config: WriterConfig::default(),
            store: HunkStore::new(),
            pending: PendingBlock::new(),
            blanks: BlankRanges::new(),
            finalized: false,
        }
    }

    /// Create a writer with a custom configuration
    pub fn with_config(source: &'a [u8], config: WriterConfig) -> BpsResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            ..Self::new(source)
        })
    }

    /// The source buffer being patched
    pub fn source(&self) -> &'a [u8] {
        self.source
    }

    /// Active configuration
    pub fn config(&self) -> &WriterConfig {
        &self.config
    }

    /// True once a patch has been produced
    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    fn ensure_open(&self) -> BpsResult<()> {
        if self.finalized {
            return Err(BpsError::AlreadyFinalized);
        }
        Ok(())
    }

    fn clamp_hints(&self, hints: &[Range<usize>]) -> Vec<Range<usize>> {
        let len = self.source.len();
        hints
            .iter()
            .filter_map(|hint| {
                let clamped = hint.start.min(len)..hint.end.min(len);
                if clamped != *hint {
                    warn!(
                        hint_start = hint.start,
                        hint_end = hint.end,
                        source_length = len,
                        "reuse hint extends past the source, clamping"
                    );
                }
                (!clamped.is_empty()).then_some(clamped)
            })
            .collect()
    }

    /// Commit the pending block and open a new one at `start`
    ///
    /// With reuse hints, the block's bytes are searched for in those source
    /// ranges on commit and long matches become source copies.
    pub fn start_block(
        &mut self,
        start: usize,
        name: Option<&str>,
        reuse_hints: &[Range<usize>],
    ) -> BpsResult<()> {
        self.ensure_open()?;
        commit_pending(
            &mut self.store,
            &mut self.pending,
            self.source,
            self.config.match_threshold,
        )?;

        let hints = self.clamp_hints(reuse_hints);
        self.pending.open(start, name.map(str::to_string), hints);
        Ok(())
    }

    /// Append literal bytes to the open block
    pub fn append(&mut self, bytes: &[u8]) -> BpsResult<()> {
        self.ensure_open()?;
        if !self.pending.is_open() {
            return Err(BpsError::NoOpenBlock {
                pending: bytes.len(),
            });
        }
        self.pending.append(bytes)
    }

    /// Zero-fill `range` wherever no hunk covers it
    pub fn queue_blanked_block(&mut self, range: Range<usize>) -> BpsResult<()> {
        self.ensure_open()?;
        self.blanks.insert(range);
        Ok(())
    }

    /// Name of the open block
    pub fn current_block_name(&self) -> Option<&str> {
        self.pending.name()
    }

    /// Queue a source read of `length` bytes at `destination`
    pub fn new_source_read(
        &mut self,
        destination: usize,
        length: usize,
        name: Option<&str>,
    ) -> BpsResult<()> {
        self.ensure_open()?;
        let hunk = Hunk::source_read(
            name.unwrap_or(DEFAULT_SOURCE_READ_NAME),
            destination,
            length,
        )?;
        if hunk.end() > self.source.len() {
            return Err(BpsError::out_of_bounds(
                hunk.name(),
                format!("reads past source length {}", self.source.len()),
            ));
        }
        self.insert_hunk(hunk)
    }

    /// Queue a source or target copy
    pub fn new_copy_hunk(
        &mut self,
        destination: usize,
        kind: CopyKind,
        length: usize,
        copy_from: usize,
        name: Option<&str>,
    ) -> BpsResult<()> {
        self.ensure_open()?;
        let hunk = Hunk::copy(
            name.unwrap_or(DEFAULT_COPY_NAME),
            destination,
            kind,
            length,
            copy_from,
        )?;
        if kind == CopyKind::Source && length > self.source.len().saturating_sub(copy_from) {
            return Err(BpsError::out_of_bounds(
                hunk.name(),
                format!(
                    "copies {length} bytes from {copy_from} past source length {}",
                    self.source.len()
                ),
            ));
        }
        self.insert_hunk(hunk)
    }

    /// Commit the pending block, then insert `hunk`
    ///
    /// Both ranges are checked against the store and each other first.
    fn insert_hunk(&mut self, hunk: Hunk) -> BpsResult<()> {
        if let Some(range) = self.pending.extent()? {
            let block = self.pending.name().unwrap_or(DEFAULT_SELF_READ_NAME);
            self.store.check_insert(block, range.start, range.len())?;
            if range.start < hunk.end() && hunk.destination() < range.end {
                return Err(BpsError::Overlap {
                    name: hunk.name().to_string(),
                    start: hunk.destination(),
                    end: hunk.end(),
                    existing: block.to_string(),
                    existing_start: range.start,
                    existing_end: range.end,
                });
            }
        }
        self.store
            .check_insert(hunk.name(), hunk.destination(), hunk.length())?;

        commit_pending(
            &mut self.store,
            &mut self.pending,
            self.source,
            self.config.match_threshold,
        )?;
        debug!(
            hunk = hunk.name(),
            kind = ?hunk.kind(),
            destination = hunk.destination(),
            length = hunk.length(),
            "queued hunk"
        );
        self.store.insert(hunk)
    }

    /// Statistics over the queued hunks, or the final hunks once finalized
    pub fn stats(&self) -> HunkStats {
        HunkStats::from_hunks(self.store.iter())
    }

    /// Queued hunks in destination order
    pub fn hunks(&self) -> impl Iterator<Item = &Hunk> {
        self.store.iter()
    }

    /// Produce the patch for a target of `target_length` bytes
    ///
    /// Gaps between hunks are read from the source, or zero-filled inside
    /// queued blank ranges and `extra_blank_ranges`. On success the writer
    /// is sealed; on failure it is unchanged.
    pub fn finalize(
        &mut self,
        target_length: usize,
        extra_blank_ranges: &[Range<usize>],
    ) -> BpsResult<Vec<u8>> {
        self.ensure_open()?;

        if target_length > self.source.len() {
            return Err(BpsError::UnsupportedTargetGrowth {
                source_length: self.source.len(),
                target_length,
            });
        }

        let mut store = self.store.clone();
        let mut pending = self.pending.clone();
        commit_pending(
            &mut store,
            &mut pending,
            self.source,
            self.config.match_threshold,
        )?;

        let required = store.end();
        if target_length < required {
            return Err(BpsError::TargetTooShort {
                target_length,
                required,
            });
        }

        let mut blanks = self.blanks.clone();
        blanks.extend(extra_blank_ranges.iter().cloned());

        let max_length = self.config.max_hunk_length;
        let hunks = optimizer::optimize(store.into_hunks().collect(), max_length);
        let mut hunks = fill::fill_gaps(
            hunks,
            target_length,
            self.source.len(),
            &blanks,
            self.config.fill_byte,
        )?;
        if self.config.merge_after_fill {
            hunks = optimizer::merge_adjacent(hunks, max_length);
        }

        let bytes = patch::encode_patch(&hunks, self.source, target_length)?;
        let stats = HunkStats::from_hunks(&hunks);
        info!(
            target_length,
            patch_size = bytes.len(),
            hunks = stats.hunks(),
            literal_bytes = stats.literal_bytes,
            copied_bytes = stats.copied_bytes,
            "finalized BPS patch: {stats}"
        );

        self.store = HunkStore::from_sorted(hunks)?;
        self.pending = pending;
        self.finalized = true;
        Ok(bytes)
    }

    /// Finalize and write the patch to `path`, returning its size
    pub fn write_to_file<P: AsRef<Path>>(
        &mut self,
        path: P,
        target_length: usize,
        extra_blank_ranges: &[Range<usize>],
    ) -> BpsResult<usize> {
        let bytes = self.finalize(target_length, extra_blank_ranges)?;
        std::fs::write(path.as_ref(), &bytes)?;
        Ok(bytes.len())
    }
}
