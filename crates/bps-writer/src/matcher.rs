//! Greedy longest-match search against caller supplied source regions
//!
//! A literal block is scanned left to right. At each position every
//! candidate region of the source is searched for the longest run that
//! matches the block from that position on. Long enough matches become
//! source copies; everything else stays literal.
//!
//! The search is `O(block_len * candidate_len)`. Candidate regions are hints
//! from the caller, never the whole source.

use std::ops::Range;
use tracing::trace;

/// A run of the block found in the source
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SourceMatch {
    /// First matching source byte
    pub source_offset: usize,
    /// Number of matching bytes
    pub length: usize,
}

/// Piece of a split block, in block-relative offsets
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Bytes that stay literal
    Literal(Range<usize>),
    /// Bytes that can be copied from the source
    Copy {
        /// Block range covered by the copy
        range: Range<usize>,
        /// Where in the source the bytes start
        source_offset: usize,
    },
}

fn common_prefix(a: &[u8], b: &[u8]) -> usize {
    a.iter().zip(b).take_while(|(x, y)| x == y).count()
}

/// Longest match for `block[pos..]` inside the candidate regions
///
/// Ties keep the first match found, in candidate order and then by
/// ascending start offset. A zero-length result means nothing matched.
pub fn find_best_match(
    block: &[u8],
    pos: usize,
    source: &[u8],
    candidates: &[Range<usize>],
) -> SourceMatch {
    let wanted = &block[pos..];
    let mut best = SourceMatch::default();

    for candidate in candidates {
        let end = candidate.end.min(source.len());
        let mut start = candidate.start;

        // Only starts with room for something longer than the best so far
        while start + best.length < end {
            let length = common_prefix(wanted, &source[start..end]);
            if length > best.length {
                best = SourceMatch {
                    source_offset: start,
                    length,
                };
                if length == wanted.len() {
                    return best;
                }
            }
            start += 1;
        }
    }

    best
}

/// Split a block into literal runs and source copies
///
/// A match is taken when it is longer than `threshold`, or when it runs to
/// the very end of the block, since even a short trailing copy saves a
/// literal hunk.
pub fn split_block(
    block: &[u8],
    source: &[u8],
    candidates: &[Range<usize>],
    threshold: usize,
) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut literal_start = 0;
    let mut pos = 0;

    while pos < block.len() {
        let found = find_best_match(block, pos, source, candidates);
        let reaches_end = pos + found.length == block.len();

        if found.length > threshold || (found.length > 0 && reaches_end) {
            if literal_start < pos {
                segments.push(Segment::Literal(literal_start..pos));
            }
            trace!(
                block_offset = pos,
                source_offset = found.source_offset,
                length = found.length,
                "accepted source match"
            );
            segments.push(Segment::Copy {
                range: pos..pos + found.length,
                source_offset: found.source_offset,
            });
            pos += found.length;
            literal_start = pos;
        } else {
            pos += 1;
        }
    }

    if literal_start < block.len() {
        segments.push(Segment::Literal(literal_start..block.len()));
    }

    segments
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &[u8] = b"....HELLO WORLD....abcdefgh....";

    #[test]
    fn test_find_best_match_longest_wins() {
        let block = b"WORLD!";
        let found = find_best_match(block, 0, SOURCE, &[0..SOURCE.len()]);
        assert_eq!(
            found,
            SourceMatch {
                source_offset: 10,
                length: 5
            }
        );
    }

    #[test]
    fn test_find_best_match_respects_candidate_end() {
        // Candidate stops after "WOR"
        let found = find_best_match(b"WORLD", 0, SOURCE, &[4..13]);
        assert_eq!(found.length, 3);
        assert_eq!(found.source_offset, 10);
    }

    #[test]
    fn test_find_best_match_ties_keep_first() {
        let source = b"abXXabYY";
        let found = find_best_match(b"abZZ", 0, source, &[4..8, 0..4]);
        // Both candidates match two bytes; the first candidate listed wins
        assert_eq!(found.source_offset, 4);
        assert_eq!(found.length, 2);
    }

    #[test]
    fn test_find_best_match_clamps_to_source() {
        let found = find_best_match(b"gh", 0, SOURCE, &[25..1000]);
        assert_eq!(found.source_offset, 25);
        assert_eq!(found.length, 2);
    }

    #[test]
    fn test_find_best_match_none() {
        let found = find_best_match(b"zzz", 0, SOURCE, &[0..SOURCE.len()]);
        assert_eq!(found.length, 0);
    }

    #[test]
    fn test_split_block_mixes_literals_and_copies() {
        let block = b"xyHELLO WORLDzz";
        let segments = split_block(block, SOURCE, &[0..SOURCE.len()], 3);
        assert_eq!(
            segments,
            vec![
                Segment::Literal(0..2),
                Segment::Copy {
                    range: 2..13,
                    source_offset: 4
                },
                Segment::Literal(13..15),
            ]
        );
    }

    #[test]
    fn test_short_match_stays_literal() {
        // "abc" matches only three bytes, not above the threshold
        let block = b"abcQ";
        let segments = split_block(block, SOURCE, &[0..SOURCE.len()], 3);
        assert_eq!(segments, vec![Segment::Literal(0..4)]);
    }

    #[test]
    fn test_short_trailing_match_is_copied() {
        let block = b"QQgh";
        let segments = split_block(block, SOURCE, &[0..SOURCE.len()], 3);
        assert_eq!(
            segments,
            vec![
                Segment::Literal(0..2),
                Segment::Copy {
                    range: 2..4,
                    source_offset: 25
                },
            ]
        );
    }

    #[test]
    fn test_scan_resumes_right_after_match() {
        // Second copy starts on the byte right after the first one
        let block = b"abcdHELLO";
        let segments = split_block(block, SOURCE, &[0..SOURCE.len()], 3);
        assert_eq!(
            segments,
            vec![
                Segment::Copy {
                    range: 0..4,
                    source_offset: 19
                },
                Segment::Copy {
                    range: 4..9,
                    source_offset: 4
                },
            ]
        );
    }

    #[test]
    fn test_threshold_is_configurable() {
        let block = b"abcQ";
        let segments = split_block(block, SOURCE, &[0..SOURCE.len()], 2);
        assert_eq!(
            segments,
            vec![
                Segment::Copy {
                    range: 0..3,
                    source_offset: 19
                },
                Segment::Literal(3..4),
            ]
        );
    }

    #[test]
    fn test_no_candidates_is_one_literal() {
        let segments = split_block(b"HELLO", SOURCE, &[], 3);
        assert_eq!(segments, vec![Segment::Literal(0..5)]);
    }
}
