//! minechain - a minimal proof-of-work blockchain core
//!
//! # Architecture
//!
//! The crate is organized into logical modules:
//!
//! ## Core Consensus
//! - [`block`] - Block structure, factories, canonical serialization
//! - [`validation`] - Genesis/pair/prefix chain validation
//! - [`work`] - Work accounting and heaviest-chain fork choice
//! - [`reconciler`] - Canonical chain ownership and batch reconciliation
//!
//! ## Mining
//! - [`miner`] - Sequential and striped-parallel proof-of-work search
//!
//! ## Cryptography
//! - [`hash`] - SHA-256 digests and task identifiers
//!
//! ## Payloads
//! - [`record`] - Block payload records and the validity predicate
//! - [`protocol`] - Wire message bodies and exclusive dispatch
//!
//! ## State & Utilities
//! - [`persistence`] - Ledger-file persistence
//! - [`node`] - Orchestration of config, ledger, reconciler, dispatcher
//! - [`config`] - Configuration management
//! - [`error`] - Error types

#![forbid(unsafe_code)]

// ============================================================================
// Core Consensus
// ============================================================================
pub mod block;
pub mod reconciler;
pub mod validation;
pub mod work;

// ============================================================================
// Mining
// ============================================================================
pub mod miner;

// ============================================================================
// Cryptography
// ============================================================================
pub mod hash;

// ============================================================================
// Payloads & Protocol
// ============================================================================
pub mod protocol;
pub mod record;

// ============================================================================
// State Management & Utilities
// ============================================================================
pub mod config;
pub mod error;
pub mod node;
pub mod persistence;
