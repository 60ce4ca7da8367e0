//! # Value Objects
//!
//! Immutable domain primitives for contract invocation.
//! These types represent concepts that are defined by their value, not identity.

use num_bigint::{BigInt, BigUint};
use shared_types::Pubkey;
use std::fmt;

/// A 4-byte function or constructor selector.
pub type Selector = [u8; 4];

/// A 32-byte event topic.
pub type Topic = [u8; 32];

/// Identifier issued for a registered listener.
pub type ListenerId = u64;

// =============================================================================
// ABI VALUE
// =============================================================================

/// A runtime value matching some [`AbiType`](crate::domain::abi::AbiType).
///
/// Integers of every width are carried as arbitrary-precision numbers;
/// the codec checks that they fit the declared width.
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum AbiValue {
    /// Signed integer.
    Int(BigInt),
    /// Unsigned integer.
    UInt(BigUint),
    /// Boolean.
    Bool(bool),
    /// Fixed-size byte string (`bytesN`).
    FixedBytes(Vec<u8>),
    /// Dynamic byte string (`bytes`).
    Bytes(Vec<u8>),
    /// UTF-8 string.
    String(String),
    /// 32-byte account address.
    Address(Pubkey),
    /// Ordered heterogeneous components.
    Tuple(Vec<AbiValue>),
    /// Homogeneous elements (fixed or dynamic length).
    Array(Vec<AbiValue>),
}

impl AbiValue {
    /// Short name of the value's shape, for error messages.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Int(_) => "int",
            Self::UInt(_) => "uint",
            Self::Bool(_) => "bool",
            Self::FixedBytes(_) => "fixed bytes",
            Self::Bytes(_) => "bytes",
            Self::String(_) => "string",
            Self::Address(_) => "address",
            Self::Tuple(_) => "tuple",
            Self::Array(_) => "array",
        }
    }

    /// Returns the value as a signed integer, converting unsigned values.
    #[must_use]
    pub fn as_int(&self) -> Option<BigInt> {
        match self {
            Self::Int(v) => Some(v.clone()),
            Self::UInt(v) => Some(BigInt::from(v.clone())),
            _ => None,
        }
    }

    /// Returns the value as an unsigned integer, converting non-negative signed values.
    #[must_use]
    pub fn as_uint(&self) -> Option<BigUint> {
        match self {
            Self::UInt(v) => Some(v.clone()),
            Self::Int(v) => v.to_biguint(),
            _ => None,
        }
    }

    /// Returns the string payload.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the boolean payload.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the raw bytes of `bytes`, `bytesN` and address values.
    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(b) | Self::FixedBytes(b) => Some(b),
            Self::Address(a) => Some(a.as_bytes()),
            _ => None,
        }
    }

    /// Returns the components of a tuple or the elements of an array.
    #[must_use]
    pub fn as_slice(&self) -> Option<&[AbiValue]> {
        match self {
            Self::Tuple(items) | Self::Array(items) => Some(items),
            _ => None,
        }
    }
}

impl fmt::Debug for AbiValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "Int({v})"),
            Self::UInt(v) => write!(f, "UInt({v})"),
            Self::Bool(v) => write!(f, "Bool({v})"),
            Self::FixedBytes(v) => write!(f, "FixedBytes(0x{})", hex::encode(v)),
            Self::Bytes(v) => write!(f, "Bytes(0x{})", hex::encode(v)),
            Self::String(v) => write!(f, "String({v:?})"),
            Self::Address(v) => write!(f, "Address({v})"),
            Self::Tuple(v) => f.debug_tuple("Tuple").field(v).finish(),
            Self::Array(v) => f.debug_tuple("Array").field(v).finish(),
        }
    }
}

macro_rules! impl_from_signed {
    ($($t:ty),*) => {
        $(impl From<$t> for AbiValue {
            fn from(v: $t) -> Self {
                Self::Int(BigInt::from(v))
            }
        })*
    };
}

macro_rules! impl_from_unsigned {
    ($($t:ty),*) => {
        $(impl From<$t> for AbiValue {
            fn from(v: $t) -> Self {
                Self::UInt(BigUint::from(v))
            }
        })*
    };
}

impl_from_signed!(i8, i16, i32, i64, i128, BigInt);
impl_from_unsigned!(u8, u16, u32, u64, u128, BigUint);

impl From<bool> for AbiValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<&str> for AbiValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for AbiValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<Pubkey> for AbiValue {
    fn from(v: Pubkey) -> Self {
        Self::Address(v)
    }
}

impl From<Vec<u8>> for AbiValue {
    fn from(v: Vec<u8>) -> Self {
        Self::Bytes(v)
    }
}

// =============================================================================
// EVENT DATA
// =============================================================================

/// Raw event payload recovered from a `Program data:` log line.
#[derive(Clone, PartialEq, Eq)]
pub struct EventData {
    /// Topics; the first is the event signature hash.
    pub topics: Vec<Topic>,
    /// ABI-encoded non-indexed parameters.
    pub data: Vec<u8>,
}

impl fmt::Debug for EventData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let topics: Vec<String> = self
            .topics
            .iter()
            .map(|t| format!("0x{}", hex::encode(t)))
            .collect();
        f.debug_struct("EventData")
            .field("topics", &topics)
            .field("data", &format!("0x{}", hex::encode(&self.data)))
            .finish()
    }
}

// =============================================================================
// PROGRAM DERIVED ADDRESS
// =============================================================================

/// An off-curve account derived from a program id and a seed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProgramDerivedAddress {
    /// The derived account.
    pub account: Pubkey,
    /// The seed that produced it (salt followed by the bump byte).
    pub seed: Vec<u8>,
}

// =============================================================================
// TESTS
// =============================================================================
