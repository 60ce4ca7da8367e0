//! # Core Ledger Entities
//!
//! ## Clusters
//!
//! - **Identity**: `Pubkey`, `Signature`, `Keypair`
//! - **Execution**: `AccountMeta`, `Instruction`, `Message`, `Transaction`
//! - **Observation**: `LogBatch`

use crate::errors::{KeyError, SigningError};
use ed25519_dalek::{Signer, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, Bytes};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

// =============================================================================
// CLUSTER A: IDENTITY
// =============================================================================

/// A 32-byte account address (an ed25519 public key or a derived address).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Pubkey(pub [u8; 32]);

impl Pubkey {
    /// Length of an account address in bytes.
    pub const LEN: usize = 32;

    /// Creates a key from a 32-byte array.
    #[must_use]
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Creates a key from a slice.
    pub fn try_from_slice(slice: &[u8]) -> Result<Self, KeyError> {
        let bytes: [u8; 32] = slice.try_into().map_err(|_| KeyError::InvalidLength {
            expected: Self::LEN,
            actual: slice.len(),
        })?;
        Ok(Self(bytes))
    }

    /// Creates a process-unique key. Handy for tests and placeholders.
    #[must_use]
    pub fn new_unique() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        let n = COUNTER.fetch_add(1, Ordering::Relaxed);
        let mut bytes = [0u8; 32];
        bytes[..8].copy_from_slice(&n.to_be_bytes());
        Self(bytes)
    }

    /// Returns the underlying bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Returns the key as an owned byte array.
    #[must_use]
    pub const fn to_bytes(self) -> [u8; 32] {
        self.0
    }

    /// Returns true if the bytes decompress to a point on the ed25519 curve.
    ///
    /// Derived addresses must be off-curve so that no private key exists.
    #[must_use]
    pub fn is_on_curve(&self) -> bool {
        VerifyingKey::from_bytes(&self.0).is_ok()
    }
}

impl fmt::Display for Pubkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", bs58::encode(self.0).into_string())
    }
}

impl fmt::Debug for Pubkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pubkey({self})")
    }
}

impl FromStr for Pubkey {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = bs58::decode(s)
            .into_vec()
            .map_err(|e| KeyError::InvalidBase58(e.to_string()))?;
        Self::try_from_slice(&bytes)
    }
}

impl From<[u8; 32]> for Pubkey {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for Pubkey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// A 64-byte ed25519 signature. Also serves as the transaction id.
#[serde_as]
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Signature(#[serde_as(as = "Bytes")] pub [u8; 64]);

impl Signature {
    /// Returns the underlying bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }
}

impl Default for Signature {
    fn default() -> Self {
        Self([0u8; 64])
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", bs58::encode(self.0).into_string())
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({self})")
    }
}

impl FromStr for Signature {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = bs58::decode(s)
            .into_vec()
            .map_err(|e| KeyError::InvalidBase58(e.to_string()))?;
        let sig: [u8; 64] = bytes.as_slice().try_into().map_err(|_| KeyError::InvalidLength {
            expected: 64,
            actual: bytes.len(),
        })?;
        Ok(Self(sig))
    }
}

/// An ed25519 signing keypair.
#[derive(Clone)]
pub struct Keypair {
    signing_key: SigningKey,
}

impl Keypair {
    /// Generates a fresh random keypair.
    #[must_use]
    pub fn generate() -> Self {
        let mut rng = rand::rngs::OsRng;
        Self {
            signing_key: SigningKey::generate(&mut rng),
        }
    }

    /// Rebuilds a keypair from its 32-byte secret seed.
    #[must_use]
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(seed),
        }
    }

    /// Returns the public key.
    #[must_use]
    pub fn pubkey(&self) -> Pubkey {
        Pubkey(self.signing_key.verifying_key().to_bytes())
    }

    /// Signs an arbitrary message.
    #[must_use]
    pub fn sign_message(&self, message: &[u8]) -> Signature {
        Signature(self.signing_key.sign(message).to_bytes())
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keypair")
            .field("pubkey", &self.pubkey())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// CLUSTER B: EXECUTION
// =============================================================================

/// A reference to an account passed to a program, with its access flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountMeta {
    /// The referenced account.
    pub pubkey: Pubkey,
    /// Whether the account must sign the transaction.
    pub is_signer: bool,
    /// Whether the program may modify the account.
    pub is_writable: bool,
}

impl AccountMeta {
    /// A writable, non-signing reference.
    #[must_use]
    pub const fn writable(pubkey: Pubkey) -> Self {
        Self {
            pubkey,
            is_signer: false,
            is_writable: true,
        }
    }

    /// A read-only, non-signing reference.
    #[must_use]
    pub const fn readonly(pubkey: Pubkey) -> Self {
        Self {
            pubkey,
            is_signer: false,
            is_writable: false,
        }
    }
}

/// A single program invocation: target program, ordered accounts, opaque data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instruction {
    /// Program to invoke.
    pub program_id: Pubkey,
    /// Ordered account references; programs index into this list positionally.
    pub accounts: Vec<AccountMeta>,
    /// Raw instruction payload.
    pub data: Vec<u8>,
}

/// The signed portion of a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Account paying the fees. Always the first signer.
    pub payer: Pubkey,
    /// Instructions executed in order.
    pub instructions: Vec<Instruction>,
}

impl Message {
    /// Serializes the message into the bytes covered by signatures.
    pub fn serialize(&self) -> Result<Vec<u8>, SigningError> {
        bincode::serialize(self).map_err(|e| SigningError::Serialization(e.to_string()))
    }
}

/// A message together with the signatures of its signers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// The signed message.
    pub message: Message,
    /// Signatures, payer first.
    pub signatures: Vec<(Pubkey, Signature)>,
}

impl Transaction {
    /// Builds and signs a transaction. The first signer pays the fees.
    pub fn new_signed(
        instructions: Vec<Instruction>,
        signers: &[&Keypair],
    ) -> Result<Self, SigningError> {
        if instructions.is_empty() {
            return Err(SigningError::EmptyTransaction);
        }
        let payer = signers.first().ok_or(SigningError::MissingSigner)?.pubkey();
        let message = Message {
            payer,
            instructions,
        };
        let bytes = message.serialize()?;

        let mut signatures: Vec<(Pubkey, Signature)> = Vec::with_capacity(signers.len());
        for signer in signers {
            let key = signer.pubkey();
            // The same key listed twice only signs once.
            if signatures.iter().any(|(k, _)| *k == key) {
                continue;
            }
            signatures.push((key, signer.sign_message(&bytes)));
        }

        Ok(Self {
            message,
            signatures,
        })
    }

    /// The transaction id (the payer's signature).
    #[must_use]
    pub fn id(&self) -> Signature {
        self.signatures
            .first()
            .map(|(_, sig)| *sig)
            .unwrap_or_default()
    }

    /// Verifies every signature against the serialized message.
    pub fn verify(&self) -> Result<(), SigningError> {
        let bytes = self.message.serialize()?;
        for (key, sig) in &self.signatures {
            let verifying = VerifyingKey::from_bytes(key.as_bytes())
                .map_err(|_| SigningError::VerificationFailed(key.to_string()))?;
            let signature = ed25519_dalek::Signature::from_bytes(sig.as_bytes());
            verifying
                .verify(&bytes, &signature)
                .map_err(|_| SigningError::VerificationFailed(key.to_string()))?;
        }
        Ok(())
    }
}

// =============================================================================
// CLUSTER C: OBSERVATION
// =============================================================================

/// One transaction's worth of log lines, as pushed to log subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogBatch {
    /// Transaction that produced the logs.
    pub signature: Signature,
    /// Ledger-level error, if the transaction failed.
    pub err: Option<String>,
    /// Log lines in emission order.
    pub logs: Vec<String>,
}

impl LogBatch {
    /// Returns true if any line mentions `program` (e.g. `Program <id> invoke [1]`).
    #[must_use]
    pub fn mentions(&self, program: &Pubkey) -> bool {
        let needle = program.to_string();
        self.logs.iter().any(|line| line.contains(&needle))
    }
}

// =============================================================================
// TESTS
// =============================================================================
