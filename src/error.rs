//! Error types for minechain

use std::fmt;

#[derive(Debug, Clone)]
pub enum ChainError {
    InvalidTimestamp(String),
    InvalidPattern(String),
    InvalidHash(String),
    EmptyChain,
    SelectorOutOfRange(i64),
    BatchRejected(String),
    MinerAborted(String),
    ConfigError(String),
    LedgerError(String),
    IoError(String),
    SerializationError(String),
}

impl fmt::Display for ChainError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ChainError::InvalidTimestamp(msg) => write!(f, "Invalid timestamp: {}", msg),
            ChainError::InvalidPattern(msg) => write!(f, "Invalid block pattern: {}", msg),
            ChainError::InvalidHash(msg) => write!(f, "Invalid hash: {}", msg),
            ChainError::EmptyChain => write!(f, "The canonical chain is empty"),
            ChainError::SelectorOutOfRange(i) => write!(f, "Block selector out of range: {}", i),
            ChainError::BatchRejected(msg) => write!(f, "Block batch rejected: {}", msg),
            ChainError::MinerAborted(msg) => write!(f, "Miner session aborted: {}", msg),
            ChainError::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
            ChainError::LedgerError(msg) => write!(f, "Ledger error: {}", msg),
            ChainError::IoError(msg) => write!(f, "IO error: {}", msg),
            ChainError::SerializationError(msg) => write!(f, "Serialization error: {}", msg),
        }
    }
}

impl std::error::Error for ChainError {}

impl From<std::io::Error> for ChainError {
    fn from(err: std::io::Error) -> Self {
        ChainError::IoError(err.to_string())
    }
}

impl From<serde_json::Error> for ChainError {
    fn from(err: serde_json::Error) -> Self {
        ChainError::SerializationError(err.to_string())
    }
}

/// Convenience alias used across the crate
pub type Result<T> = std::result::Result<T, ChainError>;
