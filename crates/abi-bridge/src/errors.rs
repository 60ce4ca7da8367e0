//! # Error Types
//!
//! All error types for contract invocation.

use shared_types::{Pubkey, SigningError};
use thiserror::Error;

// =============================================================================
// CODEC ERRORS
// =============================================================================

/// Errors raised while encoding or decoding ABI values.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// The buffer ended before the declared type was fully read.
    #[error("schema mismatch: needed {needed} bytes, {remaining} remaining")]
    SchemaMismatch { needed: usize, remaining: usize },

    /// The value does not have the shape of the declared type.
    #[error("value mismatch: expected {expected}, found {found}")]
    ValueMismatch { expected: String, found: String },

    /// An integer does not fit the declared width.
    #[error("value out of range for {ty}")]
    OutOfRange { ty: String },

    /// A string payload is not valid UTF-8.
    #[error("invalid utf-8 in string")]
    InvalidUtf8,

    /// A boolean byte was neither 0 nor 1.
    #[error("invalid bool encoding: 0x{0:02x}")]
    InvalidBool(u8),

    /// Bytes remained after a strict decode.
    #[error("{0} trailing bytes after decode")]
    TrailingBytes(usize),

    /// A length or offset does not fit its encoding.
    #[error("length {0} does not fit the encoding")]
    LengthOverflow(u128),

    /// A fixed-size array received the wrong number of elements.
    #[error("array length mismatch: expected {expected}, found {found}")]
    ArrayLength { expected: usize, found: usize },
}

// =============================================================================
// ABI ERRORS
// =============================================================================

/// Errors raised while loading an ABI or resolving entries in it.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AbiError {
    /// The ABI document is not valid JSON or has the wrong layout.
    #[error("invalid abi json: {0}")]
    Json(String),

    /// A type string could not be parsed.
    #[error("unknown abi type: {0}")]
    UnknownType(String),

    /// No function matches the requested name or signature.
    #[error("unknown function: {0}")]
    UnknownFunction(String),

    /// A bare name matches several overloads.
    #[error("ambiguous function {name}: candidates {candidates:?}")]
    AmbiguousFunction {
        name: String,
        candidates: Vec<String>,
    },

    /// No event matches the log's first topic.
    #[error("unknown event topic: 0x{0}")]
    UnknownEvent(String),

    /// The caller supplied the wrong number of arguments.
    #[error("argument count mismatch: expected {expected}, found {found}")]
    ArgumentCount { expected: usize, found: usize },

    /// The log carries the wrong number of indexed topics.
    #[error("topic count mismatch for {event}: expected {expected}, found {found}")]
    TopicCount {
        event: String,
        expected: usize,
        found: usize,
    },

    /// Event data failed to decode.
    #[error("event decode failed: {0}")]
    Codec(#[from] CodecError),
}

// =============================================================================
// SEED ERRORS
// =============================================================================

/// Errors raised while encoding seeds or deriving program addresses.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SeedError {
    /// More seeds than the encoding or derivation allows.
    #[error("too many seeds: {count} > {max}")]
    TooManySeeds { count: usize, max: usize },

    /// A seed is longer than allowed.
    #[error("seed too long: {len} > {max} bytes")]
    SeedTooLong { len: usize, max: usize },

    /// The derived address lies on the ed25519 curve.
    #[error("derived address is on the curve")]
    OnCurve,

    /// No bump value produced an off-curve address.
    #[error("no viable bump seed found")]
    NoViableBump,
}

// =============================================================================
// TRANSPORT ERRORS
// =============================================================================

/// Errors surfaced by a ledger transport.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The ledger rejected the transaction.
    #[error("transaction rejected: {0}")]
    Rejected(String),

    /// The ledger could not be reached.
    #[error("ledger unavailable: {0}")]
    Unavailable(String),

    /// The requested transaction or subscription does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A log subscription could not be opened or closed.
    #[error("subscription error: {0}")]
    Subscription(String),
}

// =============================================================================
// EXECUTION ERROR
// =============================================================================

/// A failed invocation, with everything needed to diagnose it.
///
/// Displays as its message alone so callers can match on the text the
/// contract produced.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ExecutionError {
    /// Best available human-readable reason.
    pub message: String,
    /// Full log output of the failed execution.
    pub logs: Vec<String>,
    /// Compute units the execution consumed before failing.
    pub compute_units_used: u64,
}

// =============================================================================
// CONTRACT ERRORS
// =============================================================================

/// Errors surfaced by the contract façade.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ContractError {
    /// The contract reported failure.
    #[error(transparent)]
    Execution(#[from] ExecutionError),

    /// A function with outputs returned nothing.
    #[error("missing return data for {function}")]
    MissingReturnData { function: String },

    /// The supplied storage account does not belong to this instance.
    #[error("invalid storage account: expected {expected}, found {found}")]
    InvalidStorageAccount { expected: Pubkey, found: Pubkey },

    /// The supplied program account does not belong to this instance.
    #[error("invalid program account: expected {expected}, found {found}")]
    InvalidProgramAccount { expected: Pubkey, found: Pubkey },

    /// A state-changing call was attempted without a payer.
    #[error("no payer account configured")]
    MissingPayerAccount,

    /// The transport failed and resimulation could not explain why.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Arguments or return data failed to encode or decode.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// The ABI could not be loaded or an entry could not be resolved.
    #[error("abi error: {0}")]
    Abi(#[from] AbiError),

    /// Seed encoding or address derivation failed.
    #[error("seed error: {0}")]
    Seeds(#[from] SeedError),

    /// The transaction could not be signed.
    #[error("signing error: {0}")]
    Signing(#[from] SigningError),
}

// =============================================================================
// DISPATCH ERRORS
// =============================================================================

/// Errors from listener registration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// The listener id was never issued or was already removed.
    #[error("unknown listener id: {0}")]
    UnknownListener(u64),

    /// The interface declares no event with this name or signature.
    #[error("unknown event: {0}")]
    UnknownEvent(String),

    /// Opening or closing the log subscription failed.
    #[error("subscription transport error: {0}")]
    Transport(#[from] TransportError),
}

// =============================================================================
// TESTS
// =============================================================================
