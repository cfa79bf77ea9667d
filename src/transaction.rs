//! Value-transfer transactions
//!
//! A transaction with no `from_address` is system-issued (a mining reward)
//! and is valid by construction. Everything else must carry a signature made
//! by the holder of the private key matching `from_address`.

use crate::crypto::{self, KeyPair};
use crate::error::ChainError;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub from_address: Option<String>,
    pub to_address: String,
    pub amount: u64,
    /// Creation instant in unix milliseconds.
    pub timestamp: u64,
    #[serde(default)]
    pub signature: Option<String>,
}

impl Transaction {
    pub fn new(from_address: Option<String>, to_address: String, amount: u64) -> Self {
        Transaction {
            from_address,
            to_address,
            amount,
            timestamp: chrono::Utc::now().timestamp_millis() as u64,
            signature: None,
        }
    }

    /// A system-issued reward transaction. Needs no signature.
    pub fn reward(to_address: String, amount: u64) -> Self {
        Transaction::new(None, to_address, amount)
    }

    /// SHA-256 over the signed fields, hex-encoded. The signature itself is
    /// excluded so that signing does not change the message being signed.
    pub fn calculate_hash(&self) -> String {
        let mut hasher = Sha256::new();
        if let Some(from) = &self.from_address {
            hasher.update(from.as_bytes());
        }
        hasher.update(self.to_address.as_bytes());
        hasher.update(self.amount.to_le_bytes());
        hasher.update(self.timestamp.to_le_bytes());
        hex::encode(hasher.finalize())
    }

    /// Signs this transaction with the given hex-encoded private key.
    ///
    /// Fails with `KeyMismatch` when the derived public key does not equal
    /// `from_address`: you can only spend from your own wallet.
    pub fn sign(&mut self, private_key_hex: &str) -> Result<(), ChainError> {
        let keypair = KeyPair::from_private_hex(private_key_hex)?;
        match &self.from_address {
            Some(from) if *from == keypair.address() => {}
            _ => return Err(ChainError::KeyMismatch),
        }

        let signature = keypair.sign(self.calculate_hash().as_bytes())?;
        self.signature = Some(signature);
        Ok(())
    }

    /// Checks the signature against `from_address` as verification key.
    ///
    /// Returns `Ok(true)`/`Ok(false)` for signature validity; the only error
    /// is the structural `MissingSignature` on an unsigned transaction.
    pub fn is_valid(&self) -> Result<bool, ChainError> {
        let from = match &self.from_address {
            None => return Ok(true),
            Some(from) => from,
        };

        let signature = match &self.signature {
            Some(sig) if !sig.is_empty() => sig,
            _ => return Err(ChainError::MissingSignature),
        };

        Ok(crypto::verify_signature(
            from,
            self.calculate_hash().as_bytes(),
            signature,
        ))
    }

    pub fn is_reward(&self) -> bool {
        self.from_address.is_none()
    }

    /// Whether this transaction credits or debits the given address.
    pub fn involves(&self, address: &str) -> bool {
        self.from_address.as_deref() == Some(address) || self.to_address == address
    }
}
