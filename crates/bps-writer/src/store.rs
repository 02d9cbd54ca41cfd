//! Ordered hunk storage with the no-overlap invariant
//!
//! Hunks are keyed by destination offset. Inserting looks at the immediate
//! predecessor and successor only: if neither intersects the new range, no
//! other hunk can, because the stored ranges are already disjoint.

use crate::error::{BpsError, BpsResult};
use crate::hunk::{self, Hunk};
use std::collections::BTreeMap;

/// Sorted, non-overlapping collection of hunks
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HunkStore {
    hunks: BTreeMap<usize, Hunk>,
}

impl HunkStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from hunks already in destination order
    ///
    /// Each hunk still goes through the overlap check.
    pub fn from_sorted<I: IntoIterator<Item = Hunk>>(hunks: I) -> BpsResult<Self> {
        let mut store = Self::new();
        for hunk in hunks {
            store.insert(hunk)?;
        }
        Ok(store)
    }

    /// Check that `[start, start + length)` could be inserted
    pub fn check_insert(&self, name: &str, start: usize, length: usize) -> BpsResult<()> {
        let end = hunk::checked_end(name, start, length)?;
        let overlap = |existing: &Hunk| BpsError::Overlap {
            name: name.to_string(),
            start,
            end,
            existing: existing.name().to_string(),
            existing_start: existing.destination(),
            existing_end: existing.end(),
        };

        if let Some((_, prev)) = self.hunks.range(..=start).next_back()
            && prev.end() > start
        {
            return Err(overlap(prev));
        }

        if let Some((_, next)) = self.hunks.range(start..).next()
            && end > next.destination()
        {
            return Err(overlap(next));
        }

        Ok(())
    }

    /// Insert a hunk, refusing it if it overlaps a stored one
    pub fn insert(&mut self, hunk: Hunk) -> BpsResult<()> {
        self.check_insert(hunk.name(), hunk.destination(), hunk.length())?;
        self.hunks.insert(hunk.destination(), hunk);
        Ok(())
    }

    /// Hunks in destination order
    pub fn iter(&self) -> impl Iterator<Item = &Hunk> {
        self.hunks.values()
    }

    /// Take the hunks out in destination order
    pub fn into_hunks(self) -> impl Iterator<Item = Hunk> {
        self.hunks.into_values()
    }

    /// Exclusive end of the last hunk, or 0 when empty
    pub fn end(&self) -> usize {
        self.hunks.values().next_back().map_or(0, Hunk::end)
    }

    /// Number of stored hunks
    pub fn len(&self) -> usize {
        self.hunks.len()
    }

    /// True when nothing is stored
    pub fn is_empty(&self) -> bool {
        self.hunks.is_empty()
    }
}
