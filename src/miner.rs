//! Proof-of-work nonce search
//!
//! The search rewrites a candidate block's nonce until the digest of the
//! block's canonical serialization shows exactly the target number of
//! leading zero hex characters. The loop is unbounded; termination is
//! probabilistic, relying on search-space density at the given difficulty.
//!
//! The parallel variant partitions the nonce space into disjoint interleaved
//! strides, one per worker, so no two workers ever test the same nonce and
//! no shared mutable state exists besides the session stop flag. The first
//! worker to win the stop-flag swap is the session's single publisher;
//! sibling workers observe the flag cooperatively and stop, and any result
//! they were mid-way through is discarded.

use crate::block::Block;
use crate::error::{ChainError, Result};
use crate::hash::TaskId;
use crate::work::meets_difficulty;
use crossbeam_channel::{bounded, Receiver};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use tracing::debug;

/// Worker count matching the available processing units.
pub fn default_worker_count() -> usize {
    thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
}

fn search(
    mut block: Block,
    target: usize,
    start_nonce: u64,
    step: u64,
    stop: &AtomicBool,
) -> Option<Block> {
    let mut nonce = start_nonce;
    loop {
        if stop.load(Ordering::Relaxed) {
            return None;
        }
        block.nonce = Some(nonce.to_string());
        if meets_difficulty(&block.digest(), target) {
            return Some(block);
        }
        nonce = nonce.wrapping_add(step);
    }
}

/// Sequentially search nonces 0, 1, 2, … until the target difficulty holds.
pub fn mine_block(block: Block, target: usize) -> Block {
    mine_block_striped(block, target, 0, 1)
}

/// Sequential search over the stride `start_nonce, start_nonce + step, …`.
pub fn mine_block_striped(block: Block, target: usize, start_nonce: u64, step: u64) -> Block {
    let never = AtomicBool::new(false);
    // the flag is never set, so the search can only return a found block
    search(block, target, start_nonce, step, &never)
        .unwrap_or_else(|| unreachable!("unstopped search always returns a block"))
}

/// A proof-of-work search session.
///
/// Owns the session's result channel and the fresh task id that correlates
/// the eventual result. Exactly one winning block is delivered per session;
/// dropping the handle stops the workers.
pub struct PowSearch {
    task_id: TaskId,
    rx: Receiver<Block>,
    stop: Arc<AtomicBool>,
}

impl PowSearch {
    pub fn task_id(&self) -> &TaskId {
        &self.task_id
    }

    /// Non-blocking poll for the winning block.
    pub fn try_result(&self) -> Option<Block> {
        self.rx.try_recv().ok()
    }

    /// Block until the winning block is published.
    pub fn wait(self) -> Result<Block> {
        self.rx.recv().map_err(|_| {
            ChainError::MinerAborted(format!(
                "search {} stopped without publishing a result",
                self.task_id
            ))
        })
    }

    /// Stop all workers without waiting for a result.
    pub fn cancel(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }
}

impl Drop for PowSearch {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
    }
}

/// Start a parallel search and return its session handle immediately.
///
/// Worker `i` of `workers` owns the stride `i, i + workers, i + 2·workers, …`.
pub fn mine_block_parallel_async(block: Block, target: usize, workers: usize) -> PowSearch {
    let workers = workers.max(1);
    let task_id = TaskId::generate();
    let stop = Arc::new(AtomicBool::new(false));
    let (tx, rx) = bounded::<Block>(1);

    for i in 0..workers {
        let candidate = block.clone();
        let stop = Arc::clone(&stop);
        let tx = tx.clone();
        thread::spawn(move || {
            if let Some(found) = search(candidate, target, i as u64, workers as u64, &stop) {
                // first finisher wins the swap and is the only publisher
                if !stop.swap(true, Ordering::SeqCst) {
                    let _ = tx.try_send(found);
                }
            }
        });
    }
    debug!(task_id = %task_id, workers, target, "started proof-of-work search");

    PowSearch { task_id, rx, stop }
}

/// Parallel search that blocks until the winning block is found.
pub fn mine_block_parallel(block: Block, target: usize, workers: usize) -> Result<Block> {
    mine_block_parallel_async(block, target, workers).wait()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{Block, BlockPattern};
    use crate::work::difficulty;

    const TEST_TARGET: usize = 2;

    fn candidate() -> Block {
        let genesis = Block::genesis(BlockPattern {
            timestamp: Some(1_000),
            ..Default::default()
        })
        .unwrap();
        Block::next(
            BlockPattern {
                timestamp: Some(2_000),
                ..Default::default()
            },
            &genesis,
        )
    }

    #[test]
    fn test_sequential_search_meets_exact_target() {
        let mined = mine_block(candidate(), TEST_TARGET);
        assert_eq!(difficulty(&mined.digest()), TEST_TARGET);
        assert!(mined.nonce.is_some());
    }

    #[test]
    fn test_striped_search_stays_on_its_stride() {
        let mined = mine_block_striped(candidate(), TEST_TARGET, 1, 2);
        let nonce: u64 = mined.nonce.as_deref().unwrap().parse().unwrap();
        assert_eq!(nonce % 2, 1);
        assert_eq!(difficulty(&mined.digest()), TEST_TARGET);
    }

    #[test]
    fn test_parallel_search_delivers_one_winner() {
        let session = mine_block_parallel_async(candidate(), TEST_TARGET, 4);
        let mined = session.wait().unwrap();
        assert_eq!(difficulty(&mined.digest()), TEST_TARGET);
    }

    #[test]
    fn test_parallel_search_blocking_variant() {
        let mined = mine_block_parallel(candidate(), TEST_TARGET, 2).unwrap();
        assert_eq!(difficulty(&mined.digest()), TEST_TARGET);
    }

    #[test]
    fn test_sessions_have_distinct_task_ids() {
        let a = mine_block_parallel_async(candidate(), 1, 2);
        let b = mine_block_parallel_async(candidate(), 1, 2);
        assert_ne!(a.task_id(), b.task_id());
        a.wait().unwrap();
        b.wait().unwrap();
    }

    #[test]
    fn test_cancelled_session_reports_abort() {
        // An impossibly high target never resolves, so cancellation is the
        // only way out.
        let session = mine_block_parallel_async(candidate(), 64, 2);
        session.cancel();
        assert!(matches!(session.wait(), Err(ChainError::MinerAborted(_))));
    }

    #[test]
    fn test_zero_workers_is_treated_as_one() {
        let mined = mine_block_parallel(candidate(), 1, 0).unwrap();
        assert_eq!(difficulty(&mined.digest()), 1);
    }
}
