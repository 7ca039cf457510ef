//! Ledger-file persistence layer for minechain
//!
//! The ledger is an ordered sequence of block representations stored as a
//! JSON file. Persistence is the sole owner of durable storage; the core
//! treats a loaded chain as an ordinary input to be validated through the
//! reconciler, never as implicitly trusted state.

use crate::block::Block;
use crate::error::{ChainError, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Abstraction for persistence backends. Implementations should provide
/// atomic saving/loading of the full chain.
pub trait Persistence: Send + Sync {
    fn load_chain(&self) -> Result<Vec<Block>>;
    fn save_chain(&self, chain: &[Block]) -> Result<()>;
}

/// JSON file ledger.
pub struct JsonLedger {
    path: PathBuf,
}

impl JsonLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Persistence for JsonLedger {
    fn load_chain(&self) -> Result<Vec<Block>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let raw = fs::read_to_string(&self.path)
            .map_err(|e| ChainError::LedgerError(format!("failed to read {:?}: {}", self.path, e)))?;
        serde_json::from_str(&raw)
            .map_err(|e| ChainError::LedgerError(format!("failed to parse {:?}: {}", self.path, e)))
    }

    fn save_chain(&self, chain: &[Block]) -> Result<()> {
        let raw = serde_json::to_string_pretty(chain)?;
        // write-then-rename keeps a crash from truncating the ledger
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, raw)
            .map_err(|e| ChainError::LedgerError(format!("failed to write {:?}: {}", tmp, e)))?;
        fs::rename(&tmp, &self.path).map_err(|e| {
            ChainError::LedgerError(format!("failed to replace {:?}: {}", self.path, e))
        })?;
        Ok(())
    }
}

/// In-memory persistence, used as a fallback and in tests.
#[derive(Default)]
pub struct InMemoryPersistence {
    chain: Mutex<Vec<Block>>,
}

impl InMemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Persistence for InMemoryPersistence {
    fn load_chain(&self) -> Result<Vec<Block>> {
        Ok(self
            .chain
            .lock()
            .map_err(|_| ChainError::LedgerError("mutex poisoned".to_string()))?
            .clone())
    }

    fn save_chain(&self, chain: &[Block]) -> Result<()> {
        *self
            .chain
            .lock()
            .map_err(|_| ChainError::LedgerError("mutex poisoned".to_string()))? = chain.to_vec();
        Ok(())
    }
}
