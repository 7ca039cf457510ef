//! Protocol payloads and message dispatch
//!
//! Inbound wire messages reach the reconciliation core through a single
//! dispatcher holding one handler strategy per message category. Dispatch is
//! exclusive: exactly one handler branch runs per message. Each handler
//! consumes only the reconciler operations it needs and publishes outbound
//! bodies on the session's channel; the transport envelope around these
//! bodies is the networking layer's concern.

use crate::block::Block;
use crate::error::Result;
use crate::reconciler::ChainReconciler;
use crossbeam_channel::Sender;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Network difficulty assertion: the value and the timestamp since which it
/// has held.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DifficultyAssertion {
    pub difficulty: u32,
    pub since: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DifficultyPayload {
    Request,
    Assert(DifficultyAssertion),
}

/// Query over block numbers for partial digest requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DigestQuery {
    Exact { exact: i64 },
    Explicit { explicit: Vec<i64> },
    Range { from: Option<u64>, to: Option<u64> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DigestPayload {
    RequestFull,
    RequestPartial { query: DigestQuery },
    Transmit { blocks: Vec<Block> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LastPayload {
    Request,
    Transmit {
        difficulty: DifficultyAssertion,
        submit: Block,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SubmitPayload {
    Submit { block: Block },
}

/// A protocol message body, tagged by category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "body", rename_all = "snake_case")]
pub enum Body {
    Difficulty(DifficultyPayload),
    Digest(DigestPayload),
    Last(LastPayload),
    Submit(SubmitPayload),
    None,
}

fn publish(out: &Sender<Body>, body: Body) {
    if out.send(body).is_err() {
        warn!("outbound channel closed; dropping protocol body");
    }
}

fn transmit_digest(out: &Sender<Body>, blocks: Vec<Block>) {
    publish(out, Body::Digest(DigestPayload::Transmit { blocks }));
}

fn publish_difficulty(out: &Sender<Body>, reconciler: &ChainReconciler) {
    if let (Some(difficulty), Some(since)) = (reconciler.difficulty(), reconciler.since()) {
        publish(
            out,
            Body::Difficulty(DifficultyPayload::Assert(DifficultyAssertion {
                difficulty,
                since,
            })),
        );
    }
}

/// Handles difficulty requests and assertions.
struct DifficultyHandler;

impl DifficultyHandler {
    fn handle(
        &self,
        reconciler: &mut ChainReconciler,
        payload: DifficultyPayload,
        out: &Sender<Body>,
    ) -> Result<()> {
        match payload {
            DifficultyPayload::Request => publish_difficulty(out, reconciler),
            DifficultyPayload::Assert(assertion) => {
                reconciler.assert_difficulty(assertion.difficulty, assertion.since);
            }
        }
        Ok(())
    }
}

/// Handles digest queries and digest transmissions.
struct DigestHandler;

impl DigestHandler {
    fn handle(
        &self,
        reconciler: &mut ChainReconciler,
        payload: DigestPayload,
        out: &Sender<Body>,
    ) -> Result<()> {
        match payload {
            DigestPayload::RequestFull => {
                let blocks = reconciler.resolve_blocks(None)?;
                transmit_digest(out, blocks);
            }
            DigestPayload::RequestPartial { query } => {
                if let Some(selectors) = Self::expand_query(&query, reconciler) {
                    let blocks = reconciler.resolve_blocks(Some(&selectors))?;
                    transmit_digest(out, blocks);
                }
            }
            DigestPayload::Transmit { blocks } => reconciler.process_blocks(&blocks)?,
        }
        Ok(())
    }

    /// Expand a query into an explicit selector list.
    ///
    /// Ranges are half-open (`from..to`); a from-only range runs up to the
    /// last block and yields nothing when the chain does not reach past
    /// `from`.
    fn expand_query(query: &DigestQuery, reconciler: &ChainReconciler) -> Option<Vec<i64>> {
        match query {
            DigestQuery::Exact { exact } => Some(vec![*exact]),
            DigestQuery::Explicit { explicit } => Some(explicit.clone()),
            DigestQuery::Range {
                from: Some(from),
                to: Some(to),
            } => Some((*from..*to).map(|i| i as i64).collect()),
            DigestQuery::Range {
                from: None,
                to: Some(to),
            } => Some((0..*to).map(|i| i as i64).collect()),
            DigestQuery::Range {
                from: Some(from),
                to: None,
            } => {
                let to = reconciler.last_block().map(|b| b.number)?;
                if to > *from {
                    Some((*from..to).map(|i| i as i64).collect())
                } else {
                    None
                }
            }
            DigestQuery::Range {
                from: None,
                to: None,
            } => {
                warn!("unbounded digest range query ignored");
                None
            }
        }
    }
}

/// Handles last-block requests and tip transmissions.
struct LastHandler;

impl LastHandler {
    fn handle(
        &self,
        reconciler: &mut ChainReconciler,
        payload: LastPayload,
        out: &Sender<Body>,
    ) -> Result<()> {
        match payload {
            LastPayload::Request => {
                publish_difficulty(out, reconciler);
                let blocks = reconciler.resolve_blocks(Some(&[-1]))?;
                transmit_digest(out, blocks);
            }
            LastPayload::Transmit { difficulty, submit } => {
                reconciler.assert_difficulty(difficulty.difficulty, difficulty.since);
                reconciler.process_blocks(&[submit])?;
            }
        }
        Ok(())
    }
}

/// Handles direct block submissions.
struct SubmitHandler;

impl SubmitHandler {
    fn handle(&self, reconciler: &mut ChainReconciler, payload: SubmitPayload) -> Result<()> {
        match payload {
            SubmitPayload::Submit { block } => reconciler.process_blocks(&[block]),
        }
    }
}

/// Routes each inbound body to exactly one handler.
pub struct Dispatcher {
    difficulty: DifficultyHandler,
    digest: DigestHandler,
    last: LastHandler,
    submit: SubmitHandler,
    out: Sender<Body>,
}

impl Dispatcher {
    pub fn new(out: Sender<Body>) -> Self {
        Self {
            difficulty: DifficultyHandler,
            digest: DigestHandler,
            last: LastHandler,
            submit: SubmitHandler,
            out,
        }
    }

    pub fn dispatch(&self, reconciler: &mut ChainReconciler, body: Body) -> Result<()> {
        match body {
            Body::Difficulty(payload) => self.difficulty.handle(reconciler, payload, &self.out),
            Body::Digest(payload) => self.digest.handle(reconciler, payload, &self.out),
            Body::Last(payload) => self.last.handle(reconciler, payload, &self.out),
            Body::Submit(payload) => self.submit.handle(reconciler, payload),
            Body::None => {
                debug!("ignoring body of type none");
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{Block, BlockPattern};
    use crate::miner::mine_block;
    use crossbeam_channel::unbounded;

    fn seeded_reconciler(len: usize) -> ChainReconciler {
        let mut chain = vec![mine_block(
            Block::genesis(BlockPattern::default()).unwrap(),
            0,
        )];
        while chain.len() < len {
            let next = Block::next(BlockPattern::default(), chain.last().unwrap());
            chain.push(mine_block(next, 0));
        }
        let mut reconciler = ChainReconciler::default();
        reconciler.process_blocks(&chain).unwrap();
        reconciler
    }

    fn dispatcher() -> (Dispatcher, crossbeam_channel::Receiver<Body>) {
        let (tx, rx) = unbounded();
        (Dispatcher::new(tx), rx)
    }

    #[test]
    fn test_difficulty_request_without_assertion_stays_silent() {
        let (dispatcher, rx) = dispatcher();
        let mut reconciler = ChainReconciler::default();
        dispatcher
            .dispatch(&mut reconciler, Body::Difficulty(DifficultyPayload::Request))
            .unwrap();
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_difficulty_assert_then_request_round_trip() {
        let (dispatcher, rx) = dispatcher();
        let mut reconciler = ChainReconciler::default();
        let assertion = DifficultyAssertion {
            difficulty: 4,
            since: 1_700_000_000_000,
        };

        dispatcher
            .dispatch(
                &mut reconciler,
                Body::Difficulty(DifficultyPayload::Assert(assertion)),
            )
            .unwrap();
        dispatcher
            .dispatch(&mut reconciler, Body::Difficulty(DifficultyPayload::Request))
            .unwrap();

        let reply = rx.try_recv().unwrap();
        assert_eq!(
            reply,
            Body::Difficulty(DifficultyPayload::Assert(assertion))
        );
        // exclusive dispatch: the assert branch alone ran for the first
        // message, so exactly one reply is queued
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_full_digest_request_transmits_whole_chain() {
        let (dispatcher, rx) = dispatcher();
        let mut reconciler = seeded_reconciler(3);
        dispatcher
            .dispatch(&mut reconciler, Body::Digest(DigestPayload::RequestFull))
            .unwrap();

        match rx.try_recv().unwrap() {
            Body::Digest(DigestPayload::Transmit { blocks }) => assert_eq!(blocks.len(), 3),
            other => panic!("unexpected reply: {:?}", other),
        }
    }

    #[test]
    fn test_partial_digest_range_queries() {
        let (dispatcher, rx) = dispatcher();
        let mut reconciler = seeded_reconciler(4);

        let cases = [
            (
                DigestQuery::Range {
                    from: Some(1),
                    to: Some(3),
                },
                vec![1, 2],
            ),
            (
                DigestQuery::Range {
                    from: None,
                    to: Some(2),
                },
                vec![0, 1],
            ),
            (
                DigestQuery::Range {
                    from: Some(1),
                    to: None,
                },
                vec![1, 2],
            ),
            (DigestQuery::Exact { exact: 2 }, vec![2]),
            (
                DigestQuery::Explicit {
                    explicit: vec![0, -1],
                },
                vec![0, 3],
            ),
        ];

        for (query, expected_numbers) in cases {
            dispatcher
                .dispatch(
                    &mut reconciler,
                    Body::Digest(DigestPayload::RequestPartial { query }),
                )
                .unwrap();
            match rx.try_recv().unwrap() {
                Body::Digest(DigestPayload::Transmit { blocks }) => {
                    let numbers: Vec<u64> = blocks.iter().map(|b| b.number).collect();
                    assert_eq!(numbers, expected_numbers);
                }
                other => panic!("unexpected reply: {:?}", other),
            }
        }
    }

    #[test]
    fn test_from_only_range_past_tip_stays_silent() {
        let (dispatcher, rx) = dispatcher();
        let mut reconciler = seeded_reconciler(2);
        dispatcher
            .dispatch(
                &mut reconciler,
                Body::Digest(DigestPayload::RequestPartial {
                    query: DigestQuery::Range {
                        from: Some(5),
                        to: None,
                    },
                }),
            )
            .unwrap();
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_digest_transmit_feeds_reconciliation() {
        let (dispatcher, _rx) = dispatcher();
        let mut reconciler = seeded_reconciler(2);
        let next = Block::next(BlockPattern::default(), reconciler.last_block().unwrap());

        dispatcher
            .dispatch(
                &mut reconciler,
                Body::Digest(DigestPayload::Transmit {
                    blocks: vec![next],
                }),
            )
            .unwrap();
        assert_eq!(reconciler.last_block().unwrap().number, 2);
    }

    #[test]
    fn test_last_request_publishes_difficulty_and_tip() {
        let (dispatcher, rx) = dispatcher();
        let mut reconciler = seeded_reconciler(2);
        reconciler.assert_difficulty(3, 42);

        dispatcher
            .dispatch(&mut reconciler, Body::Last(LastPayload::Request))
            .unwrap();

        assert!(matches!(
            rx.try_recv().unwrap(),
            Body::Difficulty(DifficultyPayload::Assert(_))
        ));
        match rx.try_recv().unwrap() {
            Body::Digest(DigestPayload::Transmit { blocks }) => {
                assert_eq!(blocks.len(), 1);
                assert_eq!(blocks[0].number, 1);
            }
            other => panic!("unexpected reply: {:?}", other),
        }
    }

    #[test]
    fn test_last_transmit_asserts_and_submits() {
        let (dispatcher, _rx) = dispatcher();
        let mut reconciler = seeded_reconciler(2);
        let next = Block::next(BlockPattern::default(), reconciler.last_block().unwrap());

        dispatcher
            .dispatch(
                &mut reconciler,
                Body::Last(LastPayload::Transmit {
                    difficulty: DifficultyAssertion {
                        difficulty: 2,
                        since: 7,
                    },
                    submit: next,
                }),
            )
            .unwrap();
        assert_eq!(reconciler.difficulty(), Some(2));
        assert_eq!(reconciler.last_block().unwrap().number, 2);
    }

    #[test]
    fn test_submit_routes_to_reconciler() {
        let (dispatcher, _rx) = dispatcher();
        let mut reconciler = seeded_reconciler(2);
        let next = Block::next(BlockPattern::default(), reconciler.last_block().unwrap());

        dispatcher
            .dispatch(
                &mut reconciler,
                Body::Submit(SubmitPayload::Submit { block: next }),
            )
            .unwrap();
        assert_eq!(reconciler.last_block().unwrap().number, 2);
    }

    #[test]
    fn test_none_body_is_ignored() {
        let (dispatcher, rx) = dispatcher();
        let mut reconciler = ChainReconciler::default();
        dispatcher.dispatch(&mut reconciler, Body::None).unwrap();
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_body_serde_round_trip() {
        let body = Body::Digest(DigestPayload::RequestPartial {
            query: DigestQuery::Range {
                from: Some(1),
                to: Some(4),
            },
        });
        let json = serde_json::to_string(&body).unwrap();
        let back: Body = serde_json::from_str(&json).unwrap();
        assert_eq!(body, back);
    }
}
