//! Error types for picochain

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum ChainError {
    #[error("cannot sign transactions for other wallets")]
    KeyMismatch,
    #[error("no signature in this transaction")]
    MissingSignature,
    #[error("cannot add invalid transaction to chain")]
    InvalidSignature,
    #[error("transaction must include from and to address")]
    InvalidAddress,
    #[error("transaction amount should be higher than 0")]
    NonPositiveAmount,
    #[error("not enough balance: {0}")]
    InsufficientBalance(String),
    #[error("chain advanced during mining, mined block discarded")]
    StaleMiningResult,
    #[error("peer unreachable: {0}")]
    PeerUnreachable(String),
    #[error("candidate chain failed validation")]
    ChainInvalid,
    #[error("cryptographic error: {0}")]
    Crypto(String),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("io error: {0}")]
    Io(String),
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<std::io::Error> for ChainError {
    fn from(err: std::io::Error) -> Self {
        ChainError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for ChainError {
    fn from(err: serde_json::Error) -> Self {
        ChainError::Serialization(err.to_string())
    }
}

/// Convenience alias used across the crate
pub type Result<T> = std::result::Result<T, ChainError>;
