//! Work accounting and fork choice
//!
//! The work metric of a single block is the number of leading zero hex
//! characters in the digest of its canonical serialization. Cumulative work
//! over a chain is the fork-choice criterion: strictly greater total work
//! wins, equal work is explicitly a draw that callers must handle.

use crate::block::Block;
use crate::hash::Hash;

/// Count of consecutive leading `'0'` characters in a hex digest.
pub fn difficulty(hash: &Hash) -> usize {
    hash.as_str().chars().take_while(|&c| c == '0').count()
}

/// True iff `hash` has exactly `target` leading zeros.
///
/// Exact equality, not "at least": a digest with more zeros than requested
/// does not satisfy this target.
pub fn meets_difficulty(hash: &Hash, target: usize) -> bool {
    difficulty(hash) == target
}

/// Cumulative work of a chain; `None` for an empty chain.
///
/// Work is undefined, not zero, for "no chain".
pub fn total_work(chain: &[Block]) -> Option<u64> {
    if chain.is_empty() {
        return None;
    }
    Some(
        chain
            .iter()
            .map(|block| difficulty(&block.digest()) as u64)
            .sum(),
    )
}

/// Longest suffix of `chain` whose numbers are strictly sequential by 1.
///
/// Walks backward from the end and stops at the first break in
/// sequentiality. An empty chain yields an empty suffix.
pub fn trailing_sequence(chain: &[Block]) -> &[Block] {
    let Some(last) = chain.last() else {
        return &[];
    };
    let mut start = chain.len() - 1;
    let mut expected = last.number;
    for i in (0..chain.len() - 1).rev() {
        if chain[i].number + 1 != expected {
            break;
        }
        expected = chain[i].number;
        start = i;
    }
    &chain[start..]
}

/// Outcome of comparing two chains by cumulative work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkOrdering {
    /// The left chain demonstrates strictly more work.
    Left,
    /// The right chain demonstrates strictly more work.
    Right,
    /// Exact tie; not resolved by length, arrival order, or any other tiebreak.
    Both,
}

/// Fork-choice comparator.
///
/// `None` iff both chains have undefined total work (both empty). A chain
/// that is empty on one side only compares as zero work.
pub fn compare_work(left: &[Block], right: &[Block]) -> Option<WorkOrdering> {
    let left_work = total_work(left);
    let right_work = total_work(right);
    if left_work.is_none() && right_work.is_none() {
        return None;
    }
    let left_work = left_work.unwrap_or(0);
    let right_work = right_work.unwrap_or(0);
    Some(match left_work.cmp(&right_work) {
        std::cmp::Ordering::Greater => WorkOrdering::Left,
        std::cmp::Ordering::Less => WorkOrdering::Right,
        std::cmp::Ordering::Equal => WorkOrdering::Both,
    })
}
