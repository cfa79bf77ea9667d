//! Cryptographic primitives for picochain
//!
//! Wallet addresses are hex-encoded compressed secp256k1 public keys, so the
//! address doubles as the verification key for transaction signatures.

use crate::error::ChainError;
use once_cell::sync::Lazy;
use rand::rngs::OsRng;
use secp256k1::{
    constants::{COMPACT_SIGNATURE_SIZE, PUBLIC_KEY_SIZE},
    ecdsa::Signature,
    All, Message, PublicKey, Secp256k1, SecretKey,
};
use sha2::{Digest, Sha256};

/// A thread-safe, lazily initialized Secp256k1 context.
/// This prevents repeated, unnecessary context creation.
static SECP256K1_CONTEXT: Lazy<Secp256k1<All>> = Lazy::new(Secp256k1::new);

#[derive(Debug, Clone)]
pub struct KeyPair {
    pub secret_key: SecretKey,
    pub public_key: PublicKey,
}

impl KeyPair {
    /// Generates a new random KeyPair using the OS random number generator.
    pub fn generate() -> Self {
        let secret_key = SecretKey::new(&mut OsRng);
        let public_key = PublicKey::from_secret_key(&SECP256K1_CONTEXT, &secret_key);

        KeyPair {
            secret_key,
            public_key,
        }
    }

    /// Creates a KeyPair from a hex-encoded secret key.
    pub fn from_private_hex(private_key_hex: &str) -> Result<Self, ChainError> {
        let bytes = hex::decode(private_key_hex)
            .map_err(|e| ChainError::Crypto(format!("Invalid hex secret key: {}", e)))?;
        let secret_key = SecretKey::from_slice(&bytes)
            .map_err(|e| ChainError::Crypto(format!("Invalid secret key bytes: {}", e)))?;
        let public_key = PublicKey::from_secret_key(&SECP256K1_CONTEXT, &secret_key);

        Ok(KeyPair {
            secret_key,
            public_key,
        })
    }

    /// The wallet address: hex encoding of the compressed public key.
    pub fn address(&self) -> String {
        hex::encode(self.public_key.serialize())
    }

    /// Hex encoding of the raw secret key, as handed out by wallet generation.
    pub fn private_key_hex(&self) -> String {
        hex::encode(self.secret_key.secret_bytes())
    }

    /// Signs a message (which is first hashed using SHA-256) and returns the
    /// compact signature as a hex string.
    pub fn sign(&self, message: &[u8]) -> Result<String, ChainError> {
        let digest = Sha256::digest(message);

        let message = Message::from_digest_slice(&digest)
            .map_err(|e| ChainError::Crypto(format!("Failed to create message: {}", e)))?;

        let signature = SECP256K1_CONTEXT.sign_ecdsa(&message, &self.secret_key);
        Ok(hex::encode(signature.serialize_compact()))
    }
}

/// Verifies an ECDSA signature against a hex-encoded public-key address.
///
/// A signature that fails to parse or does not verify is simply invalid, not
/// an error: malformed peer data must never abort chain validation.
pub fn verify_signature(address: &str, message: &[u8], signature_hex: &str) -> bool {
    let public_key_bytes = match hex::decode(address) {
        Ok(bytes) if bytes.len() == PUBLIC_KEY_SIZE => bytes,
        _ => return false,
    };
    let signature_bytes = match hex::decode(signature_hex) {
        Ok(bytes) if bytes.len() == COMPACT_SIGNATURE_SIZE => bytes,
        _ => return false,
    };

    let public_key = match PublicKey::from_slice(&public_key_bytes) {
        Ok(key) => key,
        Err(_) => return false,
    };
    let signature = match Signature::from_compact(&signature_bytes) {
        Ok(sig) => sig,
        Err(_) => return false,
    };

    let digest = Sha256::digest(message);
    let message = match Message::from_digest_slice(&digest) {
        Ok(m) => m,
        Err(_) => return false,
    };

    SECP256K1_CONTEXT
        .verify_ecdsa(&message, &signature, &public_key)
        .is_ok()
}
