//! Block structure and construction
//!
//! A block is immutable once accepted into the canonical chain. The only
//! field ever rewritten after construction is the nonce, and only while the
//! proof-of-work search is still perturbing the candidate.
//!
//! The canonical serialization covers every public field in a fixed order
//! and length-prefixes free-form strings, so it is injective with respect to
//! consensus-relevant fields. It is both the proof-of-work input and the
//! commitment target for successor blocks.

use crate::error::{ChainError, Result};
use crate::hash::Hash;
use crate::record::Record;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// Current time in unix milliseconds.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    /// Sequence position; 0 is reserved for the genesis block.
    pub number: u64,
    /// Unix milliseconds; must not be in the future at validation time.
    pub timestamp: i64,
    /// Perturbs the commitment during proof-of-work search only.
    pub nonce: Option<String>,
    /// Payload records; may be empty.
    pub data: Vec<Record>,
    /// Commitment to the serialized predecessor; absent only for genesis.
    pub last_hash: Option<Hash>,
}

/// Explicit allow-list of caller-suppliable fields for block factories.
///
/// Computed fields (`number`, `last_hash`) can never be smuggled in through
/// a pattern; the factories own them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlockPattern {
    pub timestamp: Option<i64>,
    pub nonce: Option<String>,
    pub data: Option<Vec<Record>>,
}

impl Block {
    /// Construct the genesis block.
    ///
    /// Forces `number = 0` and no predecessor commitment. An absent pattern
    /// timestamp means "now"; a supplied timestamp must not be in the future.
    pub fn genesis(pattern: BlockPattern) -> Result<Block> {
        let now = now_millis();
        let timestamp = match pattern.timestamp {
            Some(ts) if ts > now => {
                return Err(ChainError::InvalidTimestamp(format!(
                    "genesis timestamp {} is in the future (now {})",
                    ts, now
                )));
            }
            Some(ts) => ts,
            None => now,
        };

        Ok(Block {
            number: 0,
            timestamp,
            nonce: pattern.nonce,
            data: pattern.data.unwrap_or_default(),
            last_hash: None,
        })
    }

    /// Construct the successor of `predecessor`.
    ///
    /// Sets `number = predecessor.number + 1` and commits to the
    /// predecessor's serialized form. Caller-supplied pattern fields are
    /// merged over the computed ones.
    pub fn next(pattern: BlockPattern, predecessor: &Block) -> Block {
        Block {
            number: predecessor.number + 1,
            timestamp: pattern.timestamp.unwrap_or_else(now_millis),
            nonce: pattern.nonce,
            data: pattern.data.unwrap_or_default(),
            last_hash: Some(Hash::encode(&predecessor.serialize())),
        }
    }

    /// Structural sanity check only.
    ///
    /// Does not verify linkage to any particular predecessor; that is the
    /// chain validator's job.
    pub fn is_internally_consistent(&self) -> bool {
        self.timestamp >= 0 && (self.number == 0 || self.last_hash.is_some())
    }

    /// Canonical string form used as the commitment and proof-of-work input.
    pub fn serialize(&self) -> String {
        let mut out = String::new();
        let _ = write!(out, "number:{};timestamp:{};", self.number, self.timestamp);

        match &self.nonce {
            Some(nonce) => {
                let _ = write!(out, "nonce:{}:{};", nonce.len(), nonce);
            }
            None => out.push_str("nonce:-;"),
        }

        out.push_str("data:[");
        for (i, record) in self.data.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            out.push_str(&record.canonical());
        }
        out.push_str("];");

        match &self.last_hash {
            Some(hash) => {
                let _ = write!(out, "last_hash:{}", hash.as_str());
            }
            None => out.push_str("last_hash:-"),
        }

        out
    }

    /// Digest of this block's canonical serialization.
    pub fn digest(&self) -> Hash {
        Hash::encode(&self.serialize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_genesis_has_number_zero() {
        let block = Block::genesis(BlockPattern::default()).unwrap();
        assert_eq!(block.number, 0);
        assert!(block.last_hash.is_none());
        assert!(block.is_internally_consistent());
    }

    #[test]
    fn test_genesis_rejects_future_timestamp() {
        let pattern = BlockPattern {
            timestamp: Some(now_millis() + 365 * 24 * 3600 * 1000),
            ..Default::default()
        };
        let result = Block::genesis(pattern);
        assert!(matches!(result, Err(ChainError::InvalidTimestamp(_))));
    }

    #[test]
    fn test_genesis_accepts_past_timestamp() {
        let pattern = BlockPattern {
            timestamp: Some(1_000_000),
            ..Default::default()
        };
        let block = Block::genesis(pattern).unwrap();
        assert_eq!(block.timestamp, 1_000_000);
    }

    #[test]
    fn test_next_links_to_predecessor() {
        let genesis = Block::genesis(BlockPattern::default()).unwrap();
        let block = Block::next(BlockPattern::default(), &genesis);

        assert_eq!(block.number, 1);
        assert_eq!(
            block.last_hash,
            Some(Hash::encode(&genesis.serialize()))
        );
        assert!(block.is_internally_consistent());
    }

    #[test]
    fn test_next_merges_pattern_fields() {
        let genesis = Block::genesis(BlockPattern::default()).unwrap();
        let pattern = BlockPattern {
            nonce: Some("42".to_string()),
            data: Some(vec![Record::Opaque("payload".to_string())]),
            ..Default::default()
        };
        let block = Block::next(pattern, &genesis);
        assert_eq!(block.nonce.as_deref(), Some("42"));
        assert_eq!(block.data.len(), 1);
    }

    #[test]
    fn test_non_genesis_without_last_hash_is_inconsistent() {
        let genesis = Block::genesis(BlockPattern::default()).unwrap();
        let mut block = Block::next(BlockPattern::default(), &genesis);
        block.last_hash = None;
        assert!(!block.is_internally_consistent());
    }

    #[test]
    fn test_serialization_covers_every_field() {
        let genesis = Block::genesis(BlockPattern::default()).unwrap();
        let base = Block::next(BlockPattern::default(), &genesis);

        let mut tampered = base.clone();
        tampered.number += 1;
        assert_ne!(base.serialize(), tampered.serialize());

        let mut tampered = base.clone();
        tampered.timestamp += 1;
        assert_ne!(base.serialize(), tampered.serialize());

        let mut tampered = base.clone();
        tampered.nonce = Some("0".to_string());
        assert_ne!(base.serialize(), tampered.serialize());

        let mut tampered = base.clone();
        tampered.data.push(Record::Opaque("x".to_string()));
        assert_ne!(base.serialize(), tampered.serialize());

        let mut tampered = base.clone();
        tampered.last_hash = None;
        assert_ne!(base.serialize(), tampered.serialize());
    }

    #[test]
    fn test_absent_nonce_differs_from_empty_nonce() {
        let a = Block::genesis(BlockPattern {
            timestamp: Some(1),
            ..Default::default()
        })
        .unwrap();
        let mut b = a.clone();
        b.nonce = Some(String::new());
        assert_ne!(a.serialize(), b.serialize());
    }
}
