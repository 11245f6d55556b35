//! Mapping from unbounded grid coordinates onto the hash pool.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

const ROW_PRIME: i32 = 31;
const COL_PRIME: i32 = 37;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    pub row: i32,
    pub col: i32,
}

impl CellCoord {
    pub const fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }

    pub fn manhattan(self, other: CellCoord) -> u64 {
        let dr = (i64::from(self.row) - i64::from(other.row)).unsigned_abs();
        let dc = (i64::from(self.col) - i64::from(other.col)).unsigned_abs();
        dr + dc
    }
}

/// `|(row * 31) ^ (col * 37)| mod pool_size` in wrapping 32-bit arithmetic.
/// `None` only for an empty pool.
pub fn index_of(row: i32, col: i32, pool_size: usize) -> Option<usize> {
    if pool_size == 0 {
        return None;
    }
    let mixed = row.wrapping_mul(ROW_PRIME) ^ col.wrapping_mul(COL_PRIME);
    Some((mixed.unsigned_abs() as usize) % pool_size)
}

/// Ordered, append-only set of hashes shown on the grid.
#[derive(Debug, Clone, Default)]
pub struct HashPool {
    hashes: Vec<String>,
    seen: HashSet<String>,
}

impl HashPool {
    pub fn new<I, S>(hashes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut pool = Self::default();
        pool.extend(hashes);
        pool
    }

    /// Appends unseen hashes in order. Growing the pool may move existing
    /// cells onto different hashes.
    pub fn extend<I, S>(&mut self, hashes: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut added = 0;
        for hash in hashes {
            let hash = hash.into();
            if self.seen.insert(hash.clone()) {
                self.hashes.push(hash);
                added += 1;
            }
        }
        added
    }

    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.hashes
    }

    pub fn position(&self, hash: &str) -> Option<usize> {
        self.hashes.iter().position(|candidate| candidate == hash)
    }

    pub fn hash_at(&self, cell: CellCoord) -> Option<&str> {
        index_of(cell.row, cell.col, self.hashes.len()).map(|index| self.hashes[index].as_str())
    }

    /// Nearest cell to `origin` (by Manhattan rings) showing pool entry
    /// `target`, searching up to `max_radius` rings out.
    pub fn find_cell_for(&self, target: usize, origin: CellCoord, max_radius: i32) -> Option<CellCoord> {
        let len = self.hashes.len();
        if target >= len {
            return None;
        }
        for radius in 0..=max_radius.max(0) {
            for row_delta in -radius..=radius {
                let rest = radius - row_delta.abs();
                let col_deltas = if rest == 0 { vec![0] } else { vec![rest, -rest] };
                for col_delta in col_deltas {
                    let cell = CellCoord::new(
                        origin.row.saturating_add(row_delta),
                        origin.col.saturating_add(col_delta),
                    );
                    if index_of(cell.row, cell.col, len) == Some(target) {
                        return Some(cell);
                    }
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::{index_of, CellCoord, HashPool};

    #[test]
    fn origin_is_stable() {
        let first = index_of(0, 0, 3);
        assert_eq!(first, Some(0));
        assert_eq!(index_of(0, 0, 3), first);
        assert_eq!(index_of(1, 0, 3), Some(31 % 3));
    }

    #[test]
    fn empty_pool_has_no_index() {
        assert_eq!(index_of(4, 5, 0), None);
    }

    #[test]
    fn extremes_do_not_overflow() {
        assert!(index_of(i32::MIN, i32::MAX, 7).is_some());
        assert!(index_of(i32::MIN, 0, 7).is_some());
    }

    #[test]
    fn pool_dedups_and_keeps_order() {
        let mut pool = HashPool::new(["a", "b", "a"]);
        assert_eq!(pool.as_slice(), ["a", "b"]);
        assert_eq!(pool.extend(["c", "b"]), 1);
        assert_eq!(pool.position("c"), Some(2));
    }

    #[test]
    fn find_cell_for_returns_a_matching_cell() {
        let pool = HashPool::new(["h0", "h1", "h2", "h3", "h4"]);
        for target in 0..pool.len() {
            let cell = pool
                .find_cell_for(target, CellCoord::new(0, 0), 16)
                .expect("every entry is reachable near the origin");
            assert_eq!(index_of(cell.row, cell.col, pool.len()), Some(target));
        }
    }

    proptest! {
        #[test]
        fn index_is_in_range_and_repeatable(row in any::<i32>(), col in any::<i32>(), pool in 1usize..10_000) {
            let first = index_of(row, col, pool).unwrap();
            prop_assert!(first < pool);
            prop_assert_eq!(index_of(row, col, pool), Some(first));
        }
    }
}
