//! Target ranges that must decode as zero-fill
//!
//! When no explicit hunk covers a byte the gap filler normally reads it from
//! the source. Ranges queued here are blanked instead.

use std::collections::BTreeMap;
use std::ops::Range;

/// Ordered set of disjoint half-open ranges, start -> exclusive end
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlankRanges {
    ranges: BTreeMap<usize, usize>,
}

impl BlankRanges {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a range, coalescing it with any range it overlaps or touches
    ///
    /// Empty ranges are ignored.
    pub fn insert(&mut self, range: Range<usize>) {
        if range.is_empty() {
            return;
        }

        let mut start = range.start;
        let mut end = range.end;

        // A range starting at or before us that reaches us
        if let Some((&prev_start, &prev_end)) = self.ranges.range(..=start).next_back()
            && prev_end >= start
        {
            start = prev_start;
            end = end.max(prev_end);
        }

        // Everything starting inside [start, end] gets swallowed
        let swallowed: Vec<usize> = self
            .ranges
            .range(start..=end)
            .map(|(&s, _)| s)
            .collect();
        for s in swallowed {
            if let Some(e) = self.ranges.remove(&s) {
                end = end.max(e);
            }
        }

        self.ranges.insert(start, end);
    }

    /// Ranges in ascending order
    pub fn iter(&self) -> impl Iterator<Item = Range<usize>> + '_ {
        self.ranges.iter().map(|(&start, &end)| start..end)
    }

    /// Number of disjoint ranges
    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    /// True when nothing is blanked
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }
}

impl Extend<Range<usize>> for BlankRanges {
    fn extend<I: IntoIterator<Item = Range<usize>>>(&mut self, iter: I) {
        for range in iter {
            self.insert(range);
        }
    }
}

impl FromIterator<Range<usize>> for BlankRanges {
    fn from_iter<I: IntoIterator<Item = Range<usize>>>(iter: I) -> Self {
        let mut blanks = Self::new();
        blanks.extend(iter);
        blanks
    }
}
