//! Chain validation
//!
//! Validity checks are total boolean functions: a block that fails any
//! condition is reported as invalid, never as an error. Chain validation has
//! to be a decision, not exceptional control flow, because the reconciler
//! turns these answers directly into accept/reject outcomes.

use crate::block::{now_millis, Block};
use crate::hash::Hash;
use crate::record::RecordValidator;

/// True iff `block` is a structurally and semantically valid genesis block.
pub fn is_valid_genesis_block(block: &Block, validator: &dyn RecordValidator) -> bool {
    block.is_internally_consistent()
        && block.number == 0
        && block.timestamp <= now_millis()
        && block.data.iter().all(|r| validator.is_valid_record(r))
}

/// True iff `curr` is a valid successor of `prev`.
///
/// Checks internal consistency of both blocks, that `curr` is not
/// future-dated, that every record passes the external predicate, that the
/// sequence numbers are adjacent, and that `curr` commits to `prev`'s
/// canonical serialization.
pub fn is_valid_block(curr: &Block, prev: &Block, validator: &dyn RecordValidator) -> bool {
    curr.is_internally_consistent()
        && prev.is_internally_consistent()
        && curr.timestamp <= now_millis()
        && curr.data.iter().all(|r| validator.is_valid_record(r))
        && curr.number == prev.number + 1
        && curr.last_hash.as_ref() == Some(&Hash::encode(&prev.serialize()))
}

/// Validate the chain prefix up to and including position `index`.
///
/// A later block cannot be valid while an earlier one is corrupt, so this
/// walks every adjacent pair from the genesis block forward, short-circuiting
/// on the first failure. Position 0 delegates to genesis validation.
pub fn is_valid_to_chain(index: usize, chain: &[Block], validator: &dyn RecordValidator) -> bool {
    let Some(genesis) = chain.first() else {
        return false;
    };
    if index >= chain.len() {
        return false;
    }
    if !is_valid_genesis_block(genesis, validator) {
        return false;
    }
    for i in 1..=index {
        if !is_valid_block(&chain[i], &chain[i - 1], validator) {
            return false;
        }
    }
    true
}
