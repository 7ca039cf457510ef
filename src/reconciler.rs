//! Canonical chain ownership and reconciliation
//!
//! The reconciler owns the single canonical chain and decides, for every
//! incoming batch of blocks, whether each maximal sequential run extends the
//! chain, successfully challenges a trailing range, or is rejected. A batch
//! is all-or-nothing: failure of any run restores the pre-batch snapshot,
//! so the chain is never left partially updated.
//!
//! Callers must serialize `process_blocks` invocations; validation and
//! commit for one batch are a single critical section. Read access
//! (`resolve_blocks`, `last_block`) returns clones and may be shared.

use crate::block::Block;
use crate::error::{ChainError, Result};
use crate::record::{RecordValidator, StandardRecordValidator};
use crate::validation::is_valid_to_chain;
use crate::work::{compare_work, trailing_sequence, WorkOrdering};
use std::collections::HashSet;
use tracing::{info, warn};

pub struct ChainReconciler {
    chain: Vec<Block>,
    validator: Box<dyn RecordValidator>,
    /// Asserted network difficulty and the timestamp since which it holds.
    difficulty: Option<u32>,
    since: Option<i64>,
}

impl Default for ChainReconciler {
    fn default() -> Self {
        Self::new(Box::new(StandardRecordValidator))
    }
}

impl ChainReconciler {
    pub fn new(validator: Box<dyn RecordValidator>) -> Self {
        Self {
            chain: Vec::new(),
            validator,
            difficulty: None,
            since: None,
        }
    }

    /// Most recently accepted block, or `None` for an empty chain.
    pub fn last_block(&self) -> Option<&Block> {
        self.chain.last()
    }

    pub fn chain(&self) -> &[Block] {
        &self.chain
    }

    pub fn assert_difficulty(&mut self, difficulty: u32, since: i64) {
        self.difficulty = Some(difficulty);
        self.since = Some(since);
    }

    pub fn difficulty(&self) -> Option<u32> {
        self.difficulty
    }

    pub fn since(&self) -> Option<i64> {
        self.since
    }

    /// Ingest a batch of candidate blocks.
    ///
    /// Blocks are sorted by number and grouped into maximal runs of
    /// sequential numbers. Each run either extends the chain or challenges
    /// an existing range. Any failure rejects the entire batch and restores
    /// the pre-batch snapshot.
    pub fn process_blocks(&mut self, incoming: &[Block]) -> Result<()> {
        if incoming.is_empty() {
            return Ok(());
        }
        let snapshot = self.chain.clone();
        match self.apply_batch(incoming) {
            Ok(()) => {
                info!(
                    accepted = incoming.len(),
                    height = self.chain.len(),
                    "block batch applied"
                );
                Ok(())
            }
            Err(err) => {
                self.chain = snapshot;
                Err(err)
            }
        }
    }

    fn apply_batch(&mut self, incoming: &[Block]) -> Result<()> {
        let mut sorted = incoming.to_vec();
        sorted.sort_by_key(|b| b.number);

        let mut cursor = 0;
        while cursor < sorted.len() {
            let run_start = sorted[cursor].number;
            let run: Vec<Block> = sorted[cursor..]
                .iter()
                .enumerate()
                .take_while(|(offset, b)| b.number == run_start + *offset as u64)
                .map(|(_, b)| b.clone())
                .collect();
            let run_len = run.len();

            match self.chain.iter().position(|b| b.number == run_start) {
                None => self.extend_chain(run)?,
                Some(index) => self.challenge_chain(index, run)?,
            }
            cursor += run_len;
        }
        Ok(())
    }

    /// Pure extension: no canonical block shares the run's starting number.
    fn extend_chain(&mut self, run: Vec<Block>) -> Result<()> {
        let mut candidate = trailing_sequence(&self.chain).to_vec();
        candidate.extend(run.iter().cloned());

        let last = candidate.len() - 1;
        if is_valid_to_chain(last, &candidate, self.validator.as_ref()) {
            self.chain.extend(run);
            Ok(())
        } else {
            warn!(
                run_start = run[0].number,
                run_len = run.len(),
                "extension run not valid against the canonical chain"
            );
            Err(ChainError::BatchRejected(
                "sequence not valid in blockchain".to_string(),
            ))
        }
    }

    /// Challenge: the run starts at a number already present in the chain.
    ///
    /// Builds a candidate from the kept prefix's trailing sequence plus the
    /// run, validates the whole candidate prefix, then requires the
    /// candidate to demonstrate strictly more work than the displaced
    /// canonical segment before splicing it in.
    fn challenge_chain(&mut self, index: usize, run: Vec<Block>) -> Result<()> {
        let mut candidate = trailing_sequence(&self.chain[..index]).to_vec();
        candidate.extend(run.iter().cloned());

        let last = candidate.len() - 1;
        if !is_valid_to_chain(last, &candidate, self.validator.as_ref()) {
            warn!(
                run_start = run[0].number,
                run_len = run.len(),
                "challenge run not valid against the canonical chain"
            );
            return Err(ChainError::BatchRejected(
                "sequence not valid in blockchain".to_string(),
            ));
        }

        let displaced = &self.chain[index..];
        if compare_work(displaced, &candidate) != Some(WorkOrdering::Right) {
            warn!(
                run_start = run[0].number,
                run_len = run.len(),
                "challenge run does not demonstrate most work"
            );
            return Err(ChainError::BatchRejected(
                "sequence does not demonstrate most work".to_string(),
            ));
        }

        // Splice: replace exactly the range the candidate covers, leaving
        // everything before and after untouched.
        let first_number = candidate[0].number;
        let last_number = candidate[last].number;
        let splice_from = self
            .chain
            .iter()
            .position(|b| b.number == first_number)
            .unwrap_or(0);
        let splice_to = self
            .chain
            .iter()
            .position(|b| b.number > last_number)
            .unwrap_or(self.chain.len());

        let mut reorganized = self.chain[..splice_from].to_vec();
        reorganized.extend(candidate);
        reorganized.extend_from_slice(&self.chain[splice_to..]);
        self.chain = reorganized;
        Ok(())
    }

    /// Resolve blocks for digest queries.
    ///
    /// Without selectors, returns the full canonical chain. With selectors,
    /// returns the de-duplicated blocks at the requested indices in first
    /// occurrence order; `-1` denotes the last block. Fails fast on an empty
    /// chain or an out-of-range selector.
    pub fn resolve_blocks(&self, selectors: Option<&[i64]>) -> Result<Vec<Block>> {
        if self.chain.is_empty() {
            return Err(ChainError::EmptyChain);
        }
        let Some(selectors) = selectors else {
            return Ok(self.chain.clone());
        };

        let mut seen = HashSet::new();
        let mut resolved = Vec::new();
        for &selector in selectors {
            let index = if selector == -1 {
                self.chain.len() - 1
            } else if selector >= 0 && (selector as usize) < self.chain.len() {
                selector as usize
            } else {
                return Err(ChainError::SelectorOutOfRange(selector));
            };
            if seen.insert(index) {
                resolved.push(self.chain[index].clone());
            }
        }
        Ok(resolved)
    }
}
