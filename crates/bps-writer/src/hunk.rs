//! Hunks: the individual operations of a BPS patch
//!
//! A hunk writes `length` bytes of the target starting at its destination
//! offset. The four kinds map one-to-one onto the BPS action codes:
//!
//! | Kind         | Code | Payload on the wire             | Bytes come from          |
//! |--------------|------|---------------------------------|--------------------------|
//! | `SourceRead` | 0    | none                            | source, same offset      |
//! | `SelfRead`   | 1    | `length` literal bytes          | the patch itself         |
//! | `SourceCopy` | 2    | signed relative offset          | source, any offset       |
//! | `TargetCopy` | 3    | signed relative offset          | already written target   |
//!
//! Every hunk starts with a header tag `((length - 1) << 2) | code`.

use crate::error::{BpsError, BpsResult};
use crate::varint;

/// Name used for source reads created without one
pub const DEFAULT_SOURCE_READ_NAME: &str = "unnamed_source_read";
/// Name used for self reads created without one
pub const DEFAULT_SELF_READ_NAME: &str = "unnamed_self_read";
/// Name used for copies created without one
pub const DEFAULT_COPY_NAME: &str = "unnamed_copy";

/// BPS action code of a hunk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum HunkKind {
    /// Copy from the source at the destination offset
    SourceRead = 0,
    /// Literal bytes carried in the patch
    SelfRead = 1,
    /// Copy from an arbitrary source offset
    SourceCopy = 2,
    /// Copy from earlier target output
    TargetCopy = 3,
}

impl HunkKind {
    /// Two-bit wire code
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Kind for a wire code, if valid
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::SourceRead),
            1 => Some(Self::SelfRead),
            2 => Some(Self::SourceCopy),
            3 => Some(Self::TargetCopy),
            _ => None,
        }
    }
}

/// Which buffer a copy hunk reads from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CopyKind {
    /// Copy from the original buffer
    Source,
    /// Copy from target bytes already written
    Target,
}

impl CopyKind {
    /// Matching hunk kind
    pub fn as_hunk_kind(self) -> HunkKind {
        match self {
            Self::Source => HunkKind::SourceCopy,
            Self::Target => HunkKind::TargetCopy,
        }
    }
}

/// Variant-specific data of a hunk
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HunkOp {
    /// Read from the source at the same offset
    SourceRead,
    /// Literal bytes, kept as separate chunks so merging never recopies them
    SelfRead {
        /// Chunks whose concatenation is the hunk's bytes
        chunks: Vec<Vec<u8>>,
    },
    /// Copy from the source buffer
    SourceCopy {
        /// First source byte to copy
        copy_from: usize,
    },
    /// Copy from the target buffer
    TargetCopy {
        /// First target byte to copy; always before the destination
        copy_from: usize,
    },
}

/// One patch operation covering a contiguous destination range
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hunk {
    name: String,
    destination: usize,
    length: usize,
    op: HunkOp,
}

/// Running "last copy end" per copy kind, used for relative offsets
///
/// Reset for every encode by creating a fresh value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CopyCursors {
    source: usize,
    target: usize,
}

impl CopyCursors {
    /// Create cursors starting at zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Relative offset for a copy, advancing the cursor past it
    pub fn advance(&mut self, kind: CopyKind, copy_from: usize, length: usize) -> i64 {
        let cursor = match kind {
            CopyKind::Source => &mut self.source,
            CopyKind::Target => &mut self.target,
        };
        let relative = copy_from as i64 - *cursor as i64;
        *cursor = copy_from + length;
        relative
    }
}

/// Header tag for a hunk of `kind` and `length` (length must be at least 1)
pub fn header_tag(kind: HunkKind, length: usize) -> u64 {
    debug_assert!(length >= 1);
    ((length as u64 - 1) << 2) | u64::from(kind.code())
}

/// Split a header tag back into kind and length
pub fn decode_header_tag(tag: u64) -> (HunkKind, usize) {
    let kind = HunkKind::from_code((tag & 0b11) as u8).unwrap_or(HunkKind::TargetCopy);
    (kind, (tag >> 2) as usize + 1)
}

fn validate_length(name: &str, length: usize) -> BpsResult<()> {
    if length == 0 {
        return Err(BpsError::invalid_hunk(name, "length must be at least 1"));
    }
    Ok(())
}

/// Exclusive end of `[start, start + length)`, if it fits in `usize`
pub(crate) fn checked_end(name: &str, start: usize, length: usize) -> BpsResult<usize> {
    start
        .checked_add(length)
        .ok_or_else(|| BpsError::invalid_hunk(name, "range overflows usize"))
}

impl Hunk {
    /// Source read of `length` bytes at `destination`
    pub fn source_read<S: Into<String>>(
        name: S,
        destination: usize,
        length: usize,
    ) -> BpsResult<Self> {
        let name = name.into();
        validate_length(&name, length)?;
        checked_end(&name, destination, length)?;
        Ok(Self {
            name,
            destination,
            length,
            op: HunkOp::SourceRead,
        })
    }

    /// Self read that takes ownership of `data`
    pub fn self_read<S: Into<String>>(name: S, destination: usize, data: Vec<u8>) -> BpsResult<Self> {
        let name = name.into();
        validate_length(&name, data.len())?;
        checked_end(&name, destination, data.len())?;
        Ok(Self {
            name,
            destination,
            length: data.len(),
            op: HunkOp::SelfRead { chunks: vec![data] },
        })
    }

    /// Self read of `count` copies of `byte`
    pub fn repeated<S: Into<String>>(
        name: S,
        destination: usize,
        byte: u8,
        count: usize,
    ) -> BpsResult<Self> {
        Self::self_read(name, destination, vec![byte; count])
    }

    /// Source or target copy
    ///
    /// Target copies must read from before their destination so a single
    /// left-to-right replay never sees unwritten bytes.
    pub fn copy<S: Into<String>>(
        name: S,
        destination: usize,
        kind: CopyKind,
        length: usize,
        copy_from: usize,
    ) -> BpsResult<Self> {
        let name = name.into();
        validate_length(&name, length)?;
        checked_end(&name, destination, length)?;
        checked_end(&name, copy_from, length)?;

        let op = match kind {
            CopyKind::Source => HunkOp::SourceCopy { copy_from },
            CopyKind::Target => {
                if copy_from >= destination {
                    return Err(BpsError::invalid_hunk(
                        name,
                        format!(
                            "target copy reads from {copy_from}, which is not before its destination {destination}"
                        ),
                    ));
                }
                HunkOp::TargetCopy { copy_from }
            }
        };

        Ok(Self {
            name,
            destination,
            length,
            op,
        })
    }

    /// Diagnostic name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// First target byte written
    pub fn destination(&self) -> usize {
        self.destination
    }

    /// Number of bytes written
    pub fn length(&self) -> usize {
        self.length
    }

    /// Exclusive end of the destination range
    pub fn end(&self) -> usize {
        self.destination + self.length
    }

    /// Variant data
    pub fn op(&self) -> &HunkOp {
        &self.op
    }

    /// BPS action kind
    pub fn kind(&self) -> HunkKind {
        match self.op {
            HunkOp::SourceRead => HunkKind::SourceRead,
            HunkOp::SelfRead { .. } => HunkKind::SelfRead,
            HunkOp::SourceCopy { .. } => CopyKind::Source.as_hunk_kind(),
            HunkOp::TargetCopy { .. } => CopyKind::Target.as_hunk_kind(),
        }
    }

    /// Copy origin for copy hunks
    pub fn copy_from(&self) -> Option<usize> {
        match self.op {
            HunkOp::SourceCopy { copy_from } | HunkOp::TargetCopy { copy_from } => Some(copy_from),
            HunkOp::SourceRead | HunkOp::SelfRead { .. } => None,
        }
    }

    /// A source copy that reads from its own destination is a plain source read
    pub fn is_degenerate_copy(&self) -> bool {
        matches!(self.op, HunkOp::SourceCopy { copy_from } if copy_from == self.destination)
    }

    /// Rewrite a degenerate source copy as the equivalent source read
    pub fn into_source_read(self) -> Self {
        if !self.is_degenerate_copy() {
            return self;
        }
        Self {
            name: format!("{}_as_source_read", self.name),
            destination: self.destination,
            length: self.length,
            op: HunkOp::SourceRead,
        }
    }

    /// Absorb `next` if it continues this hunk
    ///
    /// `next` must start exactly where this hunk ends and be of the same
    /// kind. Copies additionally need their origin to continue contiguously.
    /// On refusal `next` is handed back and `self` is unchanged.
    pub fn try_extend(&mut self, next: Self) -> Result<(), Self> {
        if self.end() != next.destination {
            return Err(next);
        }

        match (&mut self.op, next.op) {
            (HunkOp::SourceRead, HunkOp::SourceRead) => {}
            (HunkOp::SelfRead { chunks }, HunkOp::SelfRead { chunks: more }) => {
                chunks.extend(more);
            }
            (HunkOp::SourceCopy { copy_from }, HunkOp::SourceCopy { copy_from: next_from })
            | (HunkOp::TargetCopy { copy_from }, HunkOp::TargetCopy { copy_from: next_from })
                if *copy_from + self.length == next_from => {}
            (_, op) => {
                return Err(Self {
                    name: next.name,
                    destination: next.destination,
                    length: next.length,
                    op,
                });
            }
        }

        self.length += next.length;
        Ok(())
    }

    /// Write this hunk's bytes into `target`, reading from `source` as needed
    pub fn apply(&self, target: &mut [u8], source: &[u8]) -> BpsResult<()> {
        let range = self.destination..self.end();
        let target_len = target.len();
        let out_of_target = || {
            BpsError::out_of_bounds(
                &self.name,
                format!(
                    "writes [{}, {}) past target length {target_len}",
                    self.destination,
                    self.end()
                ),
            )
        };

        match &self.op {
            HunkOp::SourceRead => {
                let from = source.get(range.clone()).ok_or_else(|| {
                    BpsError::out_of_bounds(
                        &self.name,
                        format!("reads past source length {}", source.len()),
                    )
                })?;
                target
                    .get_mut(range)
                    .ok_or_else(out_of_target)?
                    .copy_from_slice(from);
            }
            HunkOp::SelfRead { chunks } => {
                let mut dest = target.get_mut(range).ok_or_else(out_of_target)?;
                for chunk in chunks {
                    let (head, tail) = std::mem::take(&mut dest).split_at_mut(chunk.len());
                    head.copy_from_slice(chunk);
                    dest = tail;
                }
            }
            HunkOp::SourceCopy { copy_from } => {
                let from = source
                    .get(*copy_from..*copy_from + self.length)
                    .ok_or_else(|| {
                        BpsError::out_of_bounds(
                            &self.name,
                            format!(
                                "copies [{copy_from}, {}) past source length {}",
                                copy_from + self.length,
                                source.len()
                            ),
                        )
                    })?;
                target
                    .get_mut(range)
                    .ok_or_else(out_of_target)?
                    .copy_from_slice(from);
            }
            HunkOp::TargetCopy { copy_from } => {
                if self.end() > target_len {
                    return Err(out_of_target());
                }
                // Byte by byte so overlapping copies repeat earlier output,
                // the way a BPS decoder replays them.
                for offset in 0..self.length {
                    target[self.destination + offset] = target[copy_from + offset];
                }
            }
        }
        Ok(())
    }

    /// Append this hunk's wire form to `out`
    pub fn encode(&self, out: &mut Vec<u8>, cursors: &mut CopyCursors) {
        varint::encode_unsigned(header_tag(self.kind(), self.length), out);
        match &self.op {
            HunkOp::SourceRead => {}
            HunkOp::SelfRead { chunks } => {
                for chunk in chunks {
                    out.extend_from_slice(chunk);
                }
            }
            HunkOp::SourceCopy { copy_from } => {
                let relative = cursors.advance(CopyKind::Source, *copy_from, self.length);
                varint::encode_signed(relative, out);
            }
            HunkOp::TargetCopy { copy_from } => {
                let relative = cursors.advance(CopyKind::Target, *copy_from, self.length);
                varint::encode_signed(relative, out);
            }
        }
    }
}
