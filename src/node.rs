//! Node orchestration
//!
//! Wires configuration, ledger persistence, the reconciler, and the message
//! dispatcher together. The reconciler sits behind a single `RwLock`:
//! message handling takes the write lock for the whole validate-then-commit
//! batch, so concurrent batches are serialized and the rollback snapshot is
//! sound; snapshot reads share the read lock.

use crate::block::{Block, BlockPattern};
use crate::config::Config;
use crate::error::Result;
use crate::miner::mine_block_parallel;
use crate::persistence::{JsonLedger, Persistence};
use crate::protocol::{Body, Dispatcher};
use crate::reconciler::ChainReconciler;
use crate::record::Record;
use crossbeam_channel::{unbounded, Receiver};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{info, warn};

pub struct Node {
    pub config: Config,
    persistence: Box<dyn Persistence>,
    reconciler: Arc<RwLock<ChainReconciler>>,
    dispatcher: Dispatcher,
    outbound: Receiver<Body>,
}

impl Node {
    /// Initialize a node with the ledger file named by the configuration.
    pub fn init(config: Config) -> Result<Self> {
        let persistence: Box<dyn Persistence> =
            Box::new(JsonLedger::new(config.ledger.file.clone()));
        Self::init_with_persistence(config, persistence)
    }

    pub fn init_with_persistence(
        config: Config,
        persistence: Box<dyn Persistence>,
    ) -> Result<Self> {
        let loaded = match persistence.load_chain() {
            Ok(chain) => chain,
            Err(e) => {
                warn!("failed to load ledger: {}. Starting with an empty chain.", e);
                Vec::new()
            }
        };

        // A stored chain is input, not truth: it goes through the same
        // reconciliation as blocks arriving from the network.
        let mut reconciler = ChainReconciler::default();
        if !loaded.is_empty() {
            match reconciler.process_blocks(&loaded) {
                Ok(()) => info!(height = loaded.len(), "ledger loaded"),
                Err(e) => warn!("stored ledger rejected: {}. Starting with an empty chain.", e),
            }
        }

        let (tx, rx) = unbounded();
        Ok(Self {
            config,
            persistence,
            reconciler: Arc::new(RwLock::new(reconciler)),
            dispatcher: Dispatcher::new(tx),
            outbound: rx,
        })
    }

    /// Route one inbound protocol body to the reconciliation core.
    pub fn handle_message(&self, body: Body) -> Result<()> {
        let mut reconciler = self.reconciler.write();
        self.dispatcher.dispatch(&mut reconciler, body)
    }

    /// Outbound protocol bodies published by the handlers, in order.
    pub fn outbound(&self) -> &Receiver<Body> {
        &self.outbound
    }

    pub fn chain_snapshot(&self) -> Vec<Block> {
        self.reconciler.read().chain().to_vec()
    }

    pub fn last_block(&self) -> Option<Block> {
        self.reconciler.read().last_block().cloned()
    }

    /// Mine the next block over the current tip and reconcile it in.
    ///
    /// The tip may advance while the search runs; the reconciler
    /// re-validates the mined block on submission either way.
    pub fn mine_next(&self, data: Vec<Record>) -> Result<Block> {
        let tip = self.last_block();
        let pattern = BlockPattern {
            data: Some(data),
            ..Default::default()
        };
        let candidate = match &tip {
            Some(tip) => Block::next(pattern, tip),
            None => Block::genesis(pattern)?,
        };

        let mined = mine_block_parallel(
            candidate,
            self.config.miner.difficulty,
            self.config.miner.threads,
        )?;
        self.reconciler.write().process_blocks(&[mined.clone()])?;
        info!(number = mined.number, "mined and accepted block");
        Ok(mined)
    }

    /// Persist the current canonical chain to the ledger.
    pub fn save(&self) -> Result<()> {
        let chain = self.chain_snapshot();
        self.persistence.save_chain(&chain)
    }
}
