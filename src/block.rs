//! Block structure and proof-of-work mining

use crate::transaction::Transaction;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Sentinel `previous_hash` of the genesis block.
pub const GENESIS_PREVIOUS_HASH: &str = "0";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Block {
    pub previous_hash: String,
    /// Creation instant in unix milliseconds.
    pub timestamp: u64,
    pub transactions: Vec<Transaction>,
    pub nonce: u64,
    /// Derived field: always the hash of the other fields. Recomputed on
    /// every nonce change during mining and recomputed again by validators.
    pub hash: String,
}

impl Block {
    pub fn new(transactions: Vec<Transaction>, previous_hash: String) -> Self {
        let mut block = Block {
            previous_hash,
            timestamp: chrono::Utc::now().timestamp_millis() as u64,
            transactions,
            nonce: 0,
            hash: String::new(),
        };
        block.hash = block.calculate_hash();
        block
    }

    /// The first block of a chain, synthesized locally when no peer supplies
    /// one. Not subject to the mined difficulty invariant.
    pub fn genesis() -> Self {
        Block::new(vec![], GENESIS_PREVIOUS_HASH.to_string())
    }

    /// SHA-256 over (previous_hash, timestamp, transaction contents including
    /// signatures, nonce), hex-encoded.
    pub fn calculate_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.previous_hash.as_bytes());
        hasher.update(self.timestamp.to_le_bytes());
        for tx in &self.transactions {
            hasher.update(tx.calculate_hash().as_bytes());
            if let Some(signature) = &tx.signature {
                hasher.update(signature.as_bytes());
            }
        }
        hasher.update(self.nonce.to_le_bytes());
        hex::encode(hasher.finalize())
    }

    /// Increments the nonce until the hash has `difficulty` leading zero hex
    /// characters. CPU-bound and unbounded: it only returns on success.
    pub fn mine(&mut self, difficulty: usize) {
        while !self.meets_difficulty(difficulty) {
            self.nonce += 1;
            self.hash = self.calculate_hash();
        }
    }

    pub fn meets_difficulty(&self, difficulty: usize) -> bool {
        self.hash.len() >= difficulty && self.hash.bytes().take(difficulty).all(|b| b == b'0')
    }

    /// True iff every transaction in the block verifies. An unsigned
    /// transaction counts as invalid here, it does not abort validation.
    pub fn has_valid_transactions(&self) -> bool {
        self.transactions
            .iter()
            .all(|tx| tx.is_valid().unwrap_or(false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::KeyPair;

    const TEST_DIFFICULTY: usize = 2;

    #[test]
    fn test_hash_is_derived_from_fields() {
        let block = Block::genesis();
        assert_eq!(block.hash, block.calculate_hash());
    }

    #[test]
    fn test_mining_satisfies_difficulty() {
        let mut block = Block::new(vec![], "abc".to_string());
        block.mine(TEST_DIFFICULTY);

        assert!(block.meets_difficulty(TEST_DIFFICULTY));
        assert!(block.hash.starts_with("00"));
        // Re-validation of the mined block reproduces the stored hash.
        assert_eq!(block.hash, block.calculate_hash());
    }

    #[test]
    fn test_tampering_changes_recomputed_hash() {
        let mut block = Block::new(
            vec![Transaction::reward("miner".to_string(), 100)],
            "abc".to_string(),
        );
        block.mine(TEST_DIFFICULTY);

        block.transactions[0].amount = 1_000_000;
        assert_ne!(block.hash, block.calculate_hash());
    }

    #[test]
    fn test_nonce_changes_hash() {
        let mut block = Block::genesis();
        let original = block.hash.clone();
        block.nonce += 1;
        assert_ne!(original, block.calculate_hash());
    }

    #[test]
    fn test_has_valid_transactions() {
        let keypair = KeyPair::generate();
        let mut tx = Transaction::new(Some(keypair.address()), "bob".to_string(), 5);
        tx.sign(&keypair.private_key_hex()).unwrap();

        let reward = Transaction::reward("miner".to_string(), 100);
        let block = Block::new(vec![tx.clone(), reward], "abc".to_string());
        assert!(block.has_valid_transactions());

        // Tampering with a signed amount breaks the block.
        let mut tampered = block.clone();
        tampered.transactions[0].amount = 9999;
        assert!(!tampered.has_valid_transactions());

        // So does stripping a signature.
        let mut unsigned = block;
        unsigned.transactions[0].signature = None;
        assert!(!unsigned.has_valid_transactions());
    }

    #[test]
    fn test_genesis_shape() {
        let genesis = Block::genesis();
        assert_eq!(genesis.previous_hash, GENESIS_PREVIOUS_HASH);
        assert!(genesis.transactions.is_empty());
        assert_eq!(genesis.nonce, 0);
    }
}
