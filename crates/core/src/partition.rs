//! Deterministic work partitioning.
//!
//! A work list of length `L` is split into `n` contiguous chunks whose sizes
//! differ by at most one; the first `L mod n` chunks carry the extra element.
//! Chunk indices are 1-based so they can be passed straight from a job
//! matrix (`--chunk-index 3 --chunks 8`).

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Half-open index range `[start, end)` over a work list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChunkRange {
    pub start: usize,
    pub end: usize,
}

impl ChunkRange {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// The range covering a whole list.
    pub fn full(len: usize) -> Self {
        Self { start: 0, end: len }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, index: usize) -> bool {
        self.start <= index && index < self.end
    }
}

impl core::fmt::Display for ChunkRange {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// Compute the range owned by chunk `chunk_index` (1-based) of `chunks`.
///
/// Fails with [`CoreError::InvalidArgument`] when `chunks == 0` or when
/// `chunk_index` is outside `1..=chunks`. An empty list always yields
/// `(0, 0)` once the arguments are valid.
pub fn chunk_range(list_len: usize, chunk_index: usize, chunks: usize) -> CoreResult<ChunkRange> {
    if chunks == 0 {
        return Err(CoreError::invalid_argument(
            "number of chunks must be a positive integer",
        ));
    }
    if chunk_index == 0 || chunk_index > chunks {
        return Err(CoreError::invalid_argument(format!(
            "chunk index ({chunk_index}) must be between 1 and number of chunks ({chunks})"
        )));
    }
    if list_len == 0 {
        return Ok(ChunkRange::new(0, 0));
    }

    let base = list_len / chunks;
    let extra = list_len % chunks;

    let preceding = chunk_index - 1;
    let start = preceding * base + preceding.min(extra);
    let size = base + usize::from(chunk_index <= extra);

    Ok(ChunkRange::new(start, start + size))
}

/// All `chunks` ranges of a list, in chunk order.
pub fn chunk_ranges(list_len: usize, chunks: usize) -> CoreResult<Vec<ChunkRange>> {
    (1..=chunks.max(1))
        .map(|k| chunk_range(list_len, k, chunks))
        .collect()
}

/// Keep the elements whose index falls in any of `ranges`, order preserved.
pub fn select_by_ranges<T: Clone>(items: &[T], ranges: &[ChunkRange]) -> Vec<T> {
    items
        .iter()
        .enumerate()
        .filter(|(i, _)| ranges.iter().any(|r| r.contains(*i)))
        .map(|(_, item)| item.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ten_items_three_chunks() {
        assert_eq!(chunk_range(10, 1, 3).unwrap(), ChunkRange::new(0, 4));
        assert_eq!(chunk_range(10, 2, 3).unwrap(), ChunkRange::new(4, 7));
        assert_eq!(chunk_range(10, 3, 3).unwrap(), ChunkRange::new(7, 10));
    }

    #[test]
    fn empty_list_is_empty_range() {
        assert_eq!(chunk_range(0, 1, 1).unwrap(), ChunkRange::new(0, 0));
        assert_eq!(chunk_range(0, 4, 7).unwrap(), ChunkRange::new(0, 0));
    }

    #[test]
    fn rejects_bad_arguments() {
        assert!(matches!(chunk_range(10, 1, 0), Err(CoreError::InvalidArgument(_))));
        assert!(matches!(chunk_range(10, 0, 3), Err(CoreError::InvalidArgument(_))));
        assert!(matches!(chunk_range(10, 4, 3), Err(CoreError::InvalidArgument(_))));
        // Validation happens before the empty-list shortcut.
        assert!(chunk_range(0, 2, 1).is_err());
    }

    #[test]
    fn more_chunks_than_items() {
        let ranges = chunk_ranges(2, 4).unwrap();
        assert_eq!(
            ranges,
            vec![
                ChunkRange::new(0, 1),
                ChunkRange::new(1, 2),
                ChunkRange::new(2, 2),
                ChunkRange::new(2, 2),
            ]
        );
    }

    #[test]
    fn select_keeps_order_and_ignores_out_of_bounds() {
        let items: Vec<u32> = (0..10).collect();
        let picked = select_by_ranges(&items, &[ChunkRange::new(7, 20), ChunkRange::new(1, 3)]);
        assert_eq!(picked, vec![1, 2, 7, 8, 9]);
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 512,
                ..ProptestConfig::default()
            })]

            /// Property: the chunks tile `[0, L)` exactly once, in order.
            #[test]
            fn chunks_cover_list_exactly(len in 0usize..5_000, chunks in 1usize..64) {
                let ranges = chunk_ranges(len, chunks).unwrap();
                let covered: Vec<usize> = ranges.iter().flat_map(|r| r.start..r.end).collect();
                let expected: Vec<usize> = (0..len).collect();
                prop_assert_eq!(covered, expected);
            }

            /// Property: sizes differ by at most one and the large chunks come first.
            #[test]
            fn chunks_are_balanced(len in 1usize..5_000, chunks in 1usize..64) {
                let ranges = chunk_ranges(len, chunks).unwrap();
                let base = len / chunks;
                let extra = len % chunks;
                for (i, r) in ranges.iter().enumerate() {
                    let expected = if i < extra { base + 1 } else { base };
                    prop_assert_eq!(r.len(), expected);
                }
            }

            /// Property: out-of-range chunk indices are always rejected.
            #[test]
            fn out_of_range_index_rejected(len in 0usize..1_000, chunks in 1usize..64) {
                prop_assert!(chunk_range(len, 0, chunks).is_err());
                prop_assert!(chunk_range(len, chunks + 1, chunks).is_err());
            }
        }
    }
}
