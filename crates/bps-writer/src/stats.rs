//! Hunk statistics

use crate::hunk::{Hunk, HunkKind};
use std::fmt;

/// Counts and byte totals per hunk kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HunkStats {
    /// Number of source reads
    pub source_reads: usize,
    /// Number of self reads
    pub self_reads: usize,
    /// Number of source copies
    pub source_copies: usize,
    /// Number of target copies
    pub target_copies: usize,
    /// Bytes carried literally in the patch
    pub literal_bytes: usize,
    /// Bytes produced by source or target copies
    pub copied_bytes: usize,
    /// Bytes read from the source in place
    pub source_read_bytes: usize,
}

impl HunkStats {
    /// Tally a hunk sequence
    pub fn from_hunks<'a, I>(hunks: I) -> Self
    where
        I: IntoIterator<Item = &'a Hunk>,
    {
        let mut stats = Self::default();
        for hunk in hunks {
            match hunk.kind() {
                HunkKind::SourceRead => {
                    stats.source_reads += 1;
                    stats.source_read_bytes += hunk.length();
                }
                HunkKind::SelfRead => {
                    stats.self_reads += 1;
                    stats.literal_bytes += hunk.length();
                }
                HunkKind::SourceCopy => {
                    stats.source_copies += 1;
                    stats.copied_bytes += hunk.length();
                }
                HunkKind::TargetCopy => {
                    stats.target_copies += 1;
                    stats.copied_bytes += hunk.length();
                }
            }
        }
        stats
    }

    /// Total number of hunks
    pub fn hunks(&self) -> usize {
        self.source_reads + self.self_reads + self.source_copies + self.target_copies
    }

    /// Total bytes written by all hunks
    pub fn total_bytes(&self) -> usize {
        self.literal_bytes + self.copied_bytes + self.source_read_bytes
    }

    /// Share of the output carried as literal bytes
    pub fn literal_percentage(&self) -> f64 {
        let total = self.total_bytes();
        if total == 0 {
            return 0.0;
        }
        (self.literal_bytes as f64 / total as f64) * 100.0
    }
}

impl fmt::Display for HunkStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} hunks ({} source read, {} self read, {} source copy, {} target copy), {:.1}% literal",
            self.hunks(),
            self.source_reads,
            self.self_reads,
            self.source_copies,
            self.target_copies,
            self.literal_percentage()
        )
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::hunk::CopyKind;

    #[test]
    fn test_tally() {
        let hunks = vec![
            Hunk::source_read("r", 0, 10).unwrap(),
            Hunk::self_read("s", 10, vec![1; 5]).unwrap(),
            Hunk::copy("sc", 15, CopyKind::Source, 3, 0).unwrap(),
            Hunk::copy("tc", 18, CopyKind::Target, 2, 0).unwrap(),
        ];
        let stats = HunkStats::from_hunks(&hunks);

        assert_eq!(stats.hunks(), 4);
        assert_eq!(stats.source_read_bytes, 10);
        assert_eq!(stats.literal_bytes, 5);
        assert_eq!(stats.copied_bytes, 5);
        assert_eq!(stats.total_bytes(), 20);
        assert!((stats.literal_percentage() - 25.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_empty() {
        let stats = HunkStats::from_hunks(std::iter::empty());
        assert_eq!(stats, HunkStats::default());
        assert!(stats.literal_percentage().abs() < f64::EPSILON);
        assert!(stats.to_string().starts_with("0 hunks"));
    }
}
