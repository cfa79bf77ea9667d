//! picochain - A minimal distributed ledger
//!
//! Value-transfer transactions signed with secp256k1, SHA-256-linked blocks
//! sealed by proof-of-work, balances replayed from genesis, and a
//! longest-valid-chain rule over synchronously polled HTTP peers.
//!
//! # Architecture
//!
//! ## Core Ledger
//! - [`blockchain`] - Ledger state, admission, reconciliation, validation
//! - [`block`] - Block structure and proof-of-work mining
//! - [`transaction`] - Value-transfer transactions
//!
//! ## Cryptography
//! - [`crypto`] - Keypairs, signatures and verification (secp256k1)
//!
//! ## Networking
//! - [`sync`] - Peer polling, chain replacement, mining orchestration
//! - [`registry`] - Flat-file peer registry
//! - [`api`] - REST API server
//!
//! ## Configuration & Utilities
//! - [`config`] - Configuration management
//! - [`error`] - Error types

#![forbid(unsafe_code)]

// ============================================================================
// Core Ledger
// ============================================================================
pub mod block;
pub mod blockchain;
pub mod transaction;

// ============================================================================
// Cryptography
// ============================================================================
pub mod crypto;

// ============================================================================
// Networking
// ============================================================================
pub mod api;
pub mod registry;
pub mod sync;

// ============================================================================
// Configuration & Utilities
// ============================================================================
pub mod config;
pub mod error;
