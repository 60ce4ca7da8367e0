//! # Error Types
//!
//! Errors raised while parsing or signing ledger primitives.

use thiserror::Error;

/// Errors from parsing keys and signatures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum KeyError {
    /// The base58 text could not be decoded.
    #[error("Invalid base58: {0}")]
    InvalidBase58(String),

    /// Decoded bytes have the wrong length.
    #[error("Invalid length: expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}

/// Errors from building or signing a transaction.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SigningError {
    /// The transaction has no instructions to sign.
    #[error("Transaction has no instructions")]
    EmptyTransaction,

    /// No signer was supplied (the fee payer must sign).
    #[error("Transaction has no signers")]
    MissingSigner,

    /// The message could not be serialized for signing.
    #[error("Message serialization failed: {0}")]
    Serialization(String),

    /// A signature did not verify against its key.
    #[error("Signature verification failed for {0}")]
    VerificationFailed(String),
}
