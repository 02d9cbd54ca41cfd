//! Hunk sequence optimizations
//!
//! Two passes over hunks in destination order: source copies that read from
//! their own destination become source reads, then neighbors that continue
//! each other are merged.

use crate::hunk::Hunk;
use tracing::trace;

/// Replace every source copy with `copy_from == destination` by a source read
pub fn rewrite_degenerate_copies(hunks: Vec<Hunk>) -> Vec<Hunk> {
    hunks.into_iter().map(Hunk::into_source_read).collect()
}

/// Merge destination-contiguous hunks that continue each other
///
/// With `max_length` set, merges that would produce a longer hunk are skipped.
pub fn merge_adjacent(hunks: Vec<Hunk>, max_length: Option<usize>) -> Vec<Hunk> {
    let mut merged = Vec::with_capacity(hunks.len());
    let mut iter = hunks.into_iter();
    let Some(mut current) = iter.next() else {
        return merged;
    };

    for next in iter {
        if max_length.is_some_and(|max| current.length() + next.length() > max) {
            merged.push(std::mem::replace(&mut current, next));
            continue;
        }

        let absorbed = next.name().to_string();
        match current.try_extend(next) {
            Ok(()) => trace!(
                into = current.name(),
                absorbed = %absorbed,
                length = current.length(),
                "merged hunks"
            ),
            Err(next) => merged.push(std::mem::replace(&mut current, next)),
        }
    }

    merged.push(current);
    merged
}

/// Both passes in order
pub fn optimize(hunks: Vec<Hunk>, max_length: Option<usize>) -> Vec<Hunk> {
    merge_adjacent(rewrite_degenerate_copies(hunks), max_length)
}
