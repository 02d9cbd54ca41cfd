//! BPS1 patch encoding and replay
//!
//! Layout of a patch:
//!
//! ```text
//! "BPS1"
//! varint source_length
//! varint target_length
//! varint metadata_length   (always 0)
//! hunk stream
//! u32le source CRC32
//! u32le target CRC32
//! u32le CRC32 of everything above
//! ```

use crate::error::{BpsError, BpsResult};
use crate::hunk::{CopyCursors, Hunk};
use crate::varint;
use binrw::{BinRead, BinWrite};
use std::io::Cursor;

/// Patch magic
pub const BPS_MAGIC: [u8; 4] = *b"BPS1";

/// Bytes taken by the three trailing checksums
pub const TRAILER_SIZE: usize = 12;

/// Smallest possible patch: magic, three one-byte varints, trailer
pub const MIN_PATCH_SIZE: usize = BPS_MAGIC.len() + 3 + TRAILER_SIZE;

/// Source and target checksums written after the hunk stream
///
/// The whole-patch checksum follows separately since it covers these bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, BinRead, BinWrite)]
#[br(little)]
#[bw(little)]
pub struct BpsTrailer {
    /// CRC32 of the source buffer
    pub source_crc: u32,
    /// CRC32 of the target the patch produces
    pub target_crc: u32,
}

/// Lengths stored at the start of a patch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatchHeader {
    /// Length of the source the patch applies to
    pub source_length: u64,
    /// Length of the target the patch produces
    pub target_length: u64,
    /// Length of the metadata block
    pub metadata_length: u64,
}

impl PatchHeader {
    /// Parse the magic and lengths, returning the bytes after the metadata
    pub fn parse(patch: &[u8]) -> BpsResult<(Self, &[u8])> {
        let Some(rest) = patch.strip_prefix(&BPS_MAGIC) else {
            if patch.len() < BPS_MAGIC.len() {
                return Err(BpsError::truncated(BPS_MAGIC.len(), patch.len()));
            }
            return Err(BpsError::InvalidMagic);
        };

        let mut input = rest;
        let source_length = varint::decode_unsigned(&mut input)?;
        let target_length = varint::decode_unsigned(&mut input)?;
        let metadata_length = varint::decode_unsigned(&mut input)?;

        let skip = usize::try_from(metadata_length).unwrap_or(usize::MAX);
        if input.len() < skip {
            return Err(BpsError::truncated(skip, input.len()));
        }

        Ok((
            Self {
                source_length,
                target_length,
                metadata_length,
            },
            &input[skip..],
        ))
    }
}

/// All three checksums of a patch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BpsChecksums {
    /// CRC32 of the source buffer
    pub source: u32,
    /// CRC32 of the produced target
    pub target: u32,
    /// CRC32 of the patch itself, excluding these last four bytes
    pub patch: u32,
}

/// Check that `hunks` are sorted and cover `[0, target_length)` exactly
fn check_tiling(hunks: &[Hunk], target_length: usize) -> BpsResult<()> {
    let mut covered = 0;
    let mut previous: Option<&Hunk> = None;
    for hunk in hunks {
        if hunk.destination() < covered {
            let (existing, existing_start) =
                previous.map_or(("", 0), |prev| (prev.name(), prev.destination()));
            return Err(BpsError::Overlap {
                name: hunk.name().to_string(),
                start: hunk.destination(),
                end: hunk.end(),
                existing: existing.to_string(),
                existing_start,
                existing_end: covered,
            });
        }
        if hunk.destination() > covered {
            return Err(BpsError::UncoveredRange {
                start: covered,
                end: hunk.destination(),
            });
        }
        covered = hunk.end();
        previous = Some(hunk);
    }

    if covered > target_length {
        return Err(BpsError::TargetTooShort {
            target_length,
            required: covered,
        });
    }
    if covered < target_length {
        return Err(BpsError::UncoveredRange {
            start: covered,
            end: target_length,
        });
    }
    Ok(())
}

/// Replay `hunks` onto a copy of `source` and return the target
///
/// The hunks must cover `[0, target_length)` in order without gaps or
/// overlaps, the same layout `encode_patch` requires.
pub fn apply_hunks(hunks: &[Hunk], source: &[u8], target_length: usize) -> BpsResult<Vec<u8>> {
    check_tiling(hunks, target_length)?;
    let mut target = source.to_vec();
    target.resize(target_length, 0);
    for hunk in hunks {
        hunk.apply(&mut target, source)?;
    }
    Ok(target)
}

/// Serialize hunks in destination order into a complete BPS1 patch
///
/// The hunks must cover `[0, target_length)` exactly; anything else would
/// produce a patch decoders reject.
pub fn encode_patch(hunks: &[Hunk], source: &[u8], target_length: usize) -> BpsResult<Vec<u8>> {
    check_tiling(hunks, target_length)?;
    let mut out = Vec::with_capacity(MIN_PATCH_SIZE + hunks.len() * 4);
    out.extend_from_slice(&BPS_MAGIC);
    varint::encode_unsigned(source.len() as u64, &mut out);
    varint::encode_unsigned(target_length as u64, &mut out);
    varint::encode_unsigned(0, &mut out);

    let mut cursors = CopyCursors::new();
    for hunk in hunks {
        hunk.encode(&mut out, &mut cursors);
    }

    let target = apply_hunks(hunks, source, target_length)?;
    let trailer = BpsTrailer {
        source_crc: crc32fast::hash(source),
        target_crc: crc32fast::hash(&target),
    };

    let end = out.len() as u64;
    let mut cursor = Cursor::new(&mut out);
    cursor.set_position(end);
    trailer.write_options(&mut cursor, binrw::Endian::Little, ())?;

    let patch_crc = crc32fast::hash(&out);
    out.extend_from_slice(&patch_crc.to_le_bytes());
    Ok(out)
}

/// Check the magic, patch checksum and source checksum of a patch
///
/// The target checksum is returned but cannot be checked without decoding.
pub fn verify_checksums(source: &[u8], patch: &[u8]) -> BpsResult<BpsChecksums> {
    PatchHeader::parse(patch)?;
    if patch.len() < MIN_PATCH_SIZE {
        return Err(BpsError::truncated(MIN_PATCH_SIZE, patch.len()));
    }

    let Some((body, patch_crc)) = patch.split_last_chunk::<4>() else {
        return Err(BpsError::truncated(MIN_PATCH_SIZE, patch.len()));
    };
    let stored_patch = u32::from_le_bytes(*patch_crc);
    let actual_patch = crc32fast::hash(body);
    if stored_patch != actual_patch {
        return Err(BpsError::ChecksumMismatch {
            field: "patch",
            expected: stored_patch,
            actual: actual_patch,
        });
    }

    let mut cursor = Cursor::new(&body[body.len() - (TRAILER_SIZE - 4)..]);
    let trailer = BpsTrailer::read_options(&mut cursor, binrw::Endian::Little, ())?;

    let actual_source = crc32fast::hash(source);
    if trailer.source_crc != actual_source {
        return Err(BpsError::ChecksumMismatch {
            field: "source",
            expected: trailer.source_crc,
            actual: actual_source,
        });
    }

    Ok(BpsChecksums {
        source: trailer.source_crc,
        target: trailer.target_crc,
        patch: stored_patch,
    })
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::hunk::CopyKind;

    const SOURCE: [u8; 4] = [0x00, 0x01, 0x02, 0x03];

    #[test]
    fn test_single_source_read_layout() {
        let hunks = vec![Hunk::source_read("all", 0, 4).unwrap()];
        let patch = encode_patch(&hunks, &SOURCE, 4).unwrap();

        let crc = crc32fast::hash(&SOURCE).to_le_bytes();
        let mut expected = b"BPS1".to_vec();
        expected.extend_from_slice(&[0x84, 0x84, 0x80]);
        // Source read of four bytes: ((4 - 1) << 2) | 0
        expected.push(0x80 | 12);
        expected.extend_from_slice(&crc);
        expected.extend_from_slice(&crc);
        let patch_crc = crc32fast::hash(&expected).to_le_bytes();
        expected.extend_from_slice(&patch_crc);

        assert_eq!(patch, expected);

        let sums = verify_checksums(&SOURCE, &patch).unwrap();
        assert_eq!(sums.source, sums.target);
    }

    #[test]
    fn test_trailer_binrw_layout() {
        let trailer = BpsTrailer {
            source_crc: 0x0403_0201,
            target_crc: 0x0807_0605,
        };
        let mut cursor = Cursor::new(Vec::new());
        trailer
            .write_options(&mut cursor, binrw::Endian::Little, ())
            .unwrap();
        assert_eq!(cursor.into_inner(), vec![1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn test_apply_hunks_builds_target() {
        let hunks = vec![
            Hunk::self_read("lit", 0, vec![9]).unwrap(),
            Hunk::copy("sc", 1, CopyKind::Source, 2, 2).unwrap(),
            Hunk::copy("tc", 3, CopyKind::Target, 1, 0).unwrap(),
        ];
        let target = apply_hunks(&hunks, &SOURCE, 4).unwrap();
        assert_eq!(target, vec![9, 2, 3, 9]);
    }

    #[test]
    fn test_hunks_must_tile_target() {
        let gap = vec![
            Hunk::source_read("a", 0, 1).unwrap(),
            Hunk::source_read("b", 2, 2).unwrap(),
        ];
        assert!(matches!(
            encode_patch(&gap, &SOURCE, 4),
            Err(BpsError::UncoveredRange { start: 1, end: 2 })
        ));
        assert!(matches!(
            apply_hunks(&gap, &SOURCE, 4),
            Err(BpsError::UncoveredRange { start: 1, end: 2 })
        ));

        let overlap = vec![
            Hunk::source_read("a", 0, 3).unwrap(),
            Hunk::source_read("b", 2, 2).unwrap(),
        ];
        let err = encode_patch(&overlap, &SOURCE, 4).unwrap_err();
        assert!(matches!(
            err,
            BpsError::Overlap { ref name, ref existing, existing_end: 3, .. }
                if name == "b" && existing == "a"
        ));

        let short = vec![Hunk::source_read("a", 0, 2).unwrap()];
        assert!(matches!(
            encode_patch(&short, &SOURCE, 4),
            Err(BpsError::UncoveredRange { start: 2, end: 4 })
        ));
        assert!(matches!(
            encode_patch(&short, &SOURCE, 1),
            Err(BpsError::TargetTooShort { target_length: 1, required: 2 })
        ));

        // An empty target needs no hunks
        assert!(encode_patch(&[], &SOURCE, 0).is_ok());
    }

    #[test]
    fn test_header_parse() {
        let hunks = vec![Hunk::source_read("all", 0, 4).unwrap()];
        let patch = encode_patch(&hunks, &SOURCE, 4).unwrap();
        let (header, rest) = PatchHeader::parse(&patch).unwrap();
        assert_eq!(header.source_length, 4);
        assert_eq!(header.target_length, 4);
        assert_eq!(header.metadata_length, 0);
        assert_eq!(rest.len(), 1 + TRAILER_SIZE);
    }

    #[test]
    fn test_verify_detects_corruption() {
        let hunks = vec![Hunk::self_read("lit", 0, vec![7, 7, 7, 7]).unwrap()];
        let mut patch = encode_patch(&hunks, &SOURCE, 4).unwrap();

        let err = verify_checksums(&[1, 1, 1, 1], &patch).unwrap_err();
        assert!(matches!(err, BpsError::ChecksumMismatch { field: "source", .. }));

        patch[8] ^= 0xff;
        let err = verify_checksums(&SOURCE, &patch).unwrap_err();
        assert!(matches!(err, BpsError::ChecksumMismatch { field: "patch", .. }));
        assert!(err.is_corruption_error());
    }

    #[test]
    fn test_verify_rejects_foreign_data() {
        assert!(matches!(
            verify_checksums(&SOURCE, b"UPS1\x80\x80\x80"),
            Err(BpsError::InvalidMagic)
        ));
        assert!(matches!(
            verify_checksums(&SOURCE, b"BP"),
            Err(BpsError::Truncated { .. })
        ));
        assert!(matches!(
            verify_checksums(&SOURCE, b"BPS1\x80\x80\x80\x00"),
            Err(BpsError::Truncated { .. })
        ));
    }
}
