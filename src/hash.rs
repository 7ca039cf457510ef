//! Cryptographic primitives for minechain
//!
//! Blocks commit to their predecessor through a SHA-256 digest of the
//! predecessor's canonical serialization. Digests are carried as lowercase
//! hex strings so difficulty can be measured directly as leading zero
//! characters.

use crate::error::ChainError;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Length of a hex-encoded SHA-256 digest.
pub const HASH_HEX_LEN: usize = 64;

/// A fixed-length (64 hex character) digest value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Hash(String);

impl Hash {
    /// Deterministic one-way digest of an arbitrary message.
    ///
    /// Equal inputs always produce equal outputs; there is no hidden state.
    pub fn encode(message: &str) -> Hash {
        let digest = Sha256::digest(message.as_bytes());
        Hash(hex::encode(digest))
    }

    /// Construct a `Hash` from an existing hex string.
    ///
    /// Rejects anything that is not exactly 64 lowercase-convertible hex
    /// characters. Used when accepting digests from the wire or the ledger.
    pub fn from_hex(s: &str) -> Result<Hash, ChainError> {
        if s.len() != HASH_HEX_LEN {
            return Err(ChainError::InvalidHash(format!(
                "digest must be {} hex characters, got {}",
                HASH_HEX_LEN,
                s.len()
            )));
        }
        if !s.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ChainError::InvalidHash(
                "digest contains non-hex characters".to_string(),
            ));
        }
        Ok(Hash(s.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Hash {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque identifier correlating asynchronous proof-of-work results.
///
/// Not part of consensus state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    /// Generate a fresh random task identifier.
    pub fn generate() -> TaskId {
        let mut bytes = [0u8; 64];
        rand::thread_rng().fill_bytes(&mut bytes);
        TaskId(hex::encode(bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
