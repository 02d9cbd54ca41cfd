//! Gap filling
//!
//! After construction the queued hunks may leave holes. Every undeclared
//! byte is either read from the source at the same offset or, when it lies
//! in a blank range, written as the fill byte.

use crate::blanks::BlankRanges;
use crate::error::{BpsError, BpsResult};
use crate::hunk::Hunk;
use std::ops::Range;
use tracing::debug;

/// Walks the blank ranges alongside the gaps being filled
struct BlankCursor<'a> {
    blanks: &'a [Range<usize>],
    index: usize,
    fill_byte: u8,
}

impl BlankCursor<'_> {
    /// Emit filler hunks covering `[from, to)`
    fn fill(&mut self, mut from: usize, to: usize, out: &mut Vec<Hunk>) -> BpsResult<()> {
        while from < to {
            while self.blanks.get(self.index).is_some_and(|b| b.end <= from) {
                self.index += 1;
            }

            match self.blanks.get(self.index) {
                Some(blank) if blank.start < to => {
                    if blank.start > from {
                        out.push(Hunk::source_read(
                            format!("filler_read_{from}"),
                            from,
                            blank.start - from,
                        )?);
                        from = blank.start;
                    } else {
                        let end = blank.end.min(to);
                        out.push(Hunk::repeated(
                            format!("blanking_{from}"),
                            from,
                            self.fill_byte,
                            end - from,
                        )?);
                        from = end;
                    }
                }
                _ => {
                    out.push(Hunk::source_read(
                        format!("filler_read_{from}"),
                        from,
                        to - from,
                    )?);
                    from = to;
                }
            }
        }
        Ok(())
    }
}

/// Fill every hole in `hunks` so they cover exactly `[0, target_length)`
///
/// `hunks` must be in destination order. A target longer than the source
/// gets its tail blanked, since there is nothing to read there.
pub fn fill_gaps<I>(
    hunks: I,
    target_length: usize,
    source_length: usize,
    blanks: &BlankRanges,
    fill_byte: u8,
) -> BpsResult<Vec<Hunk>>
where
    I: IntoIterator<Item = Hunk>,
{
    let mut blanks = blanks.clone();
    if target_length > source_length {
        blanks.insert(source_length..target_length);
    }
    let blanks: Vec<Range<usize>> = blanks.iter().collect();
    let mut cursor = BlankCursor {
        blanks: &blanks,
        index: 0,
        fill_byte,
    };

    let mut out = Vec::new();
    let mut end = 0usize;
    let mut previous: Option<(String, usize)> = None;
    let mut declared = 0usize;

    for hunk in hunks {
        if hunk.destination() < end {
            let (existing, existing_start) = previous.unwrap_or_default();
            return Err(BpsError::Overlap {
                name: hunk.name().to_string(),
                start: hunk.destination(),
                end: hunk.end(),
                existing,
                existing_start,
                existing_end: end,
            });
        }
        if hunk.destination() > end {
            cursor.fill(end, hunk.destination(), &mut out)?;
        }

        end = hunk.end();
        previous = Some((hunk.name().to_string(), hunk.destination()));
        declared += 1;
        out.push(hunk);
    }

    if target_length < end {
        return Err(BpsError::TargetTooShort {
            target_length,
            required: end,
        });
    }
    cursor.fill(end, target_length, &mut out)?;

    debug!(
        declared,
        fillers = out.len() - declared,
        target_length,
        "filled hunk gaps"
    );
    Ok(out)
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::hunk::{HunkKind, HunkOp};

    fn read(start: usize, length: usize) -> Hunk {
        Hunk::source_read(format!("r{start}"), start, length).unwrap()
    }

    fn spans(hunks: &[Hunk]) -> Vec<(HunkKind, usize, usize)> {
        hunks
            .iter()
            .map(|h| (h.kind(), h.destination(), h.end()))
            .collect()
    }

    #[test]
    fn test_blank_between_declared_hunks() {
        let hunks = vec![
            Hunk::self_read("a", 0, vec![1; 10]).unwrap(),
            Hunk::self_read("b", 20, vec![2; 10]).unwrap(),
        ];
        let blanks: BlankRanges = [10..20].into_iter().collect();

        let filled = fill_gaps(hunks, 30, 30, &blanks, 0).unwrap();
        assert_eq!(filled.len(), 3);
        assert_eq!(
            spans(&filled),
            vec![
                (HunkKind::SelfRead, 0, 10),
                (HunkKind::SelfRead, 10, 20),
                (HunkKind::SelfRead, 20, 30),
            ]
        );
        assert_eq!(
            filled[1].op(),
            &HunkOp::SelfRead {
                chunks: vec![vec![0; 10]]
            }
        );
        assert_eq!(filled[1].name(), "blanking_10");
    }

    #[test]
    fn test_gaps_read_from_source() {
        let filled = fill_gaps(vec![read(4, 2)], 10, 10, &BlankRanges::new(), 0).unwrap();
        assert_eq!(
            spans(&filled),
            vec![
                (HunkKind::SourceRead, 0, 4),
                (HunkKind::SourceRead, 4, 6),
                (HunkKind::SourceRead, 6, 10),
            ]
        );
    }

    #[test]
    fn test_blank_partially_inside_gap() {
        // Gap [0, 10), blank [6, 14) runs into the declared hunk region
        let blanks: BlankRanges = [6..14].into_iter().collect();
        let filled = fill_gaps(vec![read(10, 2)], 16, 16, &blanks, 0xff).unwrap();
        assert_eq!(
            spans(&filled),
            vec![
                (HunkKind::SourceRead, 0, 6),
                (HunkKind::SelfRead, 6, 10),
                (HunkKind::SourceRead, 10, 12),
                (HunkKind::SelfRead, 12, 14),
                (HunkKind::SourceRead, 14, 16),
            ]
        );
        assert_eq!(
            filled[1].op(),
            &HunkOp::SelfRead {
                chunks: vec![vec![0xff; 4]]
            }
        );
    }

    #[test]
    fn test_empty_store_fills_everything() {
        let filled = fill_gaps(Vec::new(), 8, 8, &BlankRanges::new(), 0).unwrap();
        assert_eq!(spans(&filled), vec![(HunkKind::SourceRead, 0, 8)]);

        let nothing = fill_gaps(Vec::new(), 0, 8, &BlankRanges::new(), 0).unwrap();
        assert!(nothing.is_empty());
    }

    #[test]
    fn test_target_too_short() {
        let err = fill_gaps(vec![read(0, 12)], 10, 16, &BlankRanges::new(), 0).unwrap_err();
        assert!(matches!(
            err,
            BpsError::TargetTooShort {
                target_length: 10,
                required: 12
            }
        ));
    }

    #[test]
    fn test_overlapping_input_rejected() {
        let err = fill_gaps(vec![read(0, 6), read(4, 4)], 10, 10, &BlankRanges::new(), 0)
            .unwrap_err();
        assert!(matches!(err, BpsError::Overlap { ref existing, .. } if existing == "r0"));
    }

    #[test]
    fn test_longer_target_blanks_tail() {
        let filled = fill_gaps(vec![read(0, 4)], 8, 6, &BlankRanges::new(), 0).unwrap();
        assert_eq!(
            spans(&filled),
            vec![
                (HunkKind::SourceRead, 0, 4),
                (HunkKind::SourceRead, 4, 6),
                (HunkKind::SelfRead, 6, 8),
            ]
        );
    }

    #[test]
    fn test_result_tiles_target() {
        let blanks: BlankRanges = [3..5, 9..11, 40..60].into_iter().collect();
        let filled = fill_gaps(vec![read(4, 3), read(20, 5)], 32, 32, &blanks, 0).unwrap();

        let mut expected_start = 0;
        for hunk in &filled {
            assert_eq!(hunk.destination(), expected_start);
            expected_start = hunk.end();
        }
        assert_eq!(expected_start, 32);
    }
}
