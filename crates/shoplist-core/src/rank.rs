//! # Rank Protocol
//!
//! Planning for the dense `1..N` ordering of categories.
//!
//! ## Moving a Category
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  move 2 → 5 over ranks [1, 2, 3, 4, 5]                                  │
//! │                                                                         │
//! │  1. park mover:      rank(2) = -1        [1, -1, 3, 4, 5]              │
//! │  2. shift (2, 5]:    rank -= 1           [1, -1, 2, 3, 4]              │
//! │  3. land mover:      rank(-1) = 5        [1,  5, 2, 3, 4]              │
//! │                                                                         │
//! │  move 5 → 2:                                                            │
//! │  2. shift [2, 5):    rank += 1                                          │
//! │                                                                         │
//! │  All three steps run in one transaction; readers never see -1.         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The database layer executes a [`RankMove`] as three UPDATE statements.
//! [`RankMove::apply_to`] performs the same steps over a slice so the plan can
//! be checked without a database.

use crate::error::{CoreError, CoreResult};
use crate::RANK_SENTINEL;

// =============================================================================
// Rank Move
// =============================================================================

/// Ranks that shift by `delta` while a category moves, bounds inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RankShift {
    pub lower: i32,
    pub upper: i32,
    pub delta: i32,
}

impl RankShift {
    pub fn contains(&self, rank: i32) -> bool {
        rank >= self.lower && rank <= self.upper
    }
}

/// A planned move of one category from `from` to `to`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RankMove {
    pub from: i32,
    pub to: i32,
}

impl RankMove {
    /// Plans a move. Returns `None` when `from == to` (nothing to do).
    pub fn plan(from: i32, to: i32) -> Option<RankMove> {
        if from == to {
            None
        } else {
            Some(RankMove { from, to })
        }
    }

    /// Plans a move after checking both ranks against the category count.
    pub fn plan_checked(from: i32, to: i32, count: i32) -> CoreResult<Option<RankMove>> {
        check_rank(from, count)?;
        check_rank(to, count)?;
        Ok(Self::plan(from, to))
    }

    /// The neighbours that slide over to make room.
    ///
    /// Moving down (`from < to`) pulls `(from, to]` up by one; moving up
    /// pushes `[to, from)` down by one.
    pub fn shift(&self) -> RankShift {
        if self.from < self.to {
            RankShift {
                lower: self.from + 1,
                upper: self.to,
                delta: -1,
            }
        } else {
            RankShift {
                lower: self.to,
                upper: self.from - 1,
                delta: 1,
            }
        }
    }

    /// Applies the move to an in-memory rank list, step by step.
    pub fn apply_to(&self, ranks: &mut [i32]) {
        let shift = self.shift();
        let mover = ranks.iter().position(|&r| r == self.from);

        if let Some(index) = mover {
            ranks[index] = RANK_SENTINEL;
        }
        for rank in ranks.iter_mut() {
            if *rank != RANK_SENTINEL && shift.contains(*rank) {
                *rank += shift.delta;
            }
        }
        if let Some(index) = mover {
            ranks[index] = self.to;
        }
    }
}

/// Fails with `RankOutOfRange` unless `1 <= rank <= count`.
pub fn check_rank(rank: i32, count: i32) -> CoreResult<()> {
    if rank < 1 || rank > count {
        return Err(CoreError::RankOutOfRange { rank, count });
    }
    Ok(())
}

// =============================================================================
// Density
// =============================================================================

/// True when the ranks are exactly `{1, ..., N}` in any order.
pub fn is_dense(ranks: &[i32]) -> bool {
    let mut sorted = ranks.to_vec();
    sorted.sort_unstable();
    sorted
        .iter()
        .enumerate()
        .all(|(index, &rank)| rank == index as i32 + 1)
}

/// Fails with `RanksNotDense` unless [`is_dense`] holds.
pub fn ensure_dense(ranks: &[i32]) -> CoreResult<()> {
    if is_dense(ranks) {
        Ok(())
    } else {
        Err(CoreError::RanksNotDense {
            ranks: ranks.to_vec(),
        })
    }
}

/// Renumbering that closes gaps while keeping the order.
///
/// Takes ranks sorted ascending and returns the `(old, new)` pairs that change.
pub fn compaction(sorted_ranks: &[i32]) -> Vec<(i32, i32)> {
    sorted_ranks
        .iter()
        .enumerate()
        .map(|(index, &old)| (old, index as i32 + 1))
        .filter(|(old, new)| old != new)
        .collect()
}

// =============================================================================
// Undo Re-insertion
// =============================================================================

/// Ranks to try, in order, when restoring a deleted category.
///
/// The original rank first, then the slot above, then the slot below. Ranks
/// below 1 are skipped. When every candidate is taken the category is
/// appended instead.
pub fn reinsert_candidates(rank: i32) -> Vec<i32> {
    [rank, rank - 1, rank + 1]
        .into_iter()
        .filter(|&r| r >= 1)
        .collect()
}

/// First candidate not present in `taken`, if any.
pub fn pick_reinsert_rank(rank: i32, taken: &[i32]) -> Option<i32> {
    reinsert_candidates(rank)
        .into_iter()
        .find(|candidate| !taken.contains(candidate))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_move_down() {
        let mut ranks = vec![1, 2, 3, 4, 5];
        RankMove::plan(2, 5).unwrap().apply_to(&mut ranks);

        // index 1 held rank 2, now 5; old 3, 4, 5 slid to 2, 3, 4
        assert_eq!(ranks, vec![1, 5, 2, 3, 4]);
    }

    #[test]
    fn test_move_up() {
        let mut ranks = vec![1, 2, 3, 4, 5];
        RankMove::plan(5, 2).unwrap().apply_to(&mut ranks);

        assert_eq!(ranks, vec![1, 3, 4, 5, 2]);
    }

    #[test]
    fn test_noop_move() {
        assert_eq!(RankMove::plan(3, 3), None);
    }

    #[test]
    fn test_every_move_stays_dense() {
        for count in 1..=6 {
            for from in 1..=count {
                for to in 1..=count {
                    let mut ranks: Vec<i32> = (1..=count).collect();
                    if let Some(plan) = RankMove::plan(from, to) {
                        plan.apply_to(&mut ranks);
                        assert_eq!(ranks[(from - 1) as usize], to);
                    }
                    assert!(is_dense(&ranks), "{from} -> {to} broke {ranks:?}");
                }
            }
        }
    }

    #[test]
    fn test_shift_ranges() {
        assert_eq!(
            RankMove::plan(2, 5).unwrap().shift(),
            RankShift { lower: 3, upper: 5, delta: -1 }
        );
        assert_eq!(
            RankMove::plan(5, 2).unwrap().shift(),
            RankShift { lower: 2, upper: 4, delta: 1 }
        );
    }

    #[test]
    fn test_plan_checked_rejects_out_of_range() {
        assert!(RankMove::plan_checked(1, 4, 3).is_err());
        assert!(RankMove::plan_checked(RANK_SENTINEL, 2, 3).is_err());
        assert_eq!(
            RankMove::plan_checked(1, 3, 3).unwrap(),
            Some(RankMove { from: 1, to: 3 })
        );
    }

    #[test]
    fn test_density() {
        assert!(is_dense(&[]));
        assert!(is_dense(&[3, 1, 2]));
        assert!(!is_dense(&[1, 3]));
        assert!(!is_dense(&[1, 1, 2]));
        assert!(ensure_dense(&[0, 1]).is_err());
    }

    #[test]
    fn test_compaction() {
        assert_eq!(compaction(&[1, 3, 4]), vec![(3, 2), (4, 3)]);
        assert!(compaction(&[1, 2, 3]).is_empty());
    }

    #[test]
    fn test_reinsert_candidates() {
        assert_eq!(reinsert_candidates(3), vec![3, 2, 4]);
        assert_eq!(reinsert_candidates(1), vec![1, 2]);
        assert_eq!(pick_reinsert_rank(3, &[1, 2]), Some(3));
        assert_eq!(pick_reinsert_rank(3, &[3, 4]), Some(2));
        assert_eq!(pick_reinsert_rank(3, &[2, 3]), Some(4));
        assert_eq!(pick_reinsert_rank(3, &[2, 3, 4]), None);
    }
}
