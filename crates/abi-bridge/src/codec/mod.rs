//! # Type Codec
//!
//! Serializes [`AbiValue`]s to bytes and back according to an [`AbiType`]
//! schema. Two wire formats are provided:
//!
//! | Codec | Used for |
//! |-------|----------|
//! | [`BorshCodec`] | Call payloads and return data (default) |
//! | [`EthAbiCodec`] | Revert payloads, event data, and call payloads when configured |

pub mod borsh;
pub mod eth;

pub use self::borsh::BorshCodec;
pub use self::eth::EthAbiCodec;

use crate::domain::abi::AbiType;
use crate::domain::value_objects::AbiValue;
use crate::errors::CodecError;
use num_bigint::{BigInt, BigUint, Sign};
use num_traits::One;
use std::fmt;
use std::str::FromStr;

/// Encodes and decodes parameter lists.
pub trait TypeCodec: Send + Sync + fmt::Debug {
    /// Which wire format this codec speaks.
    fn encoding(&self) -> Encoding;

    /// Encodes `values` against `types`. Lengths must match.
    fn encode(&self, types: &[AbiType], values: &[AbiValue]) -> Result<Vec<u8>, CodecError>;

    /// Decodes one value per type from the front of `buf`.
    ///
    /// Fails with [`CodecError::SchemaMismatch`] when `buf` is too short.
    fn decode(&self, types: &[AbiType], buf: &[u8]) -> Result<Vec<AbiValue>, CodecError>;
}

/// Wire format selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Encoding {
    /// Little-endian, length-prefixed (Borsh).
    #[default]
    Borsh,
    /// Ethereum ABI: 32-byte big-endian words with head/tail layout.
    EthAbi,
}

impl Encoding {
    /// Returns the codec for this format.
    #[must_use]
    pub fn codec(self) -> &'static dyn TypeCodec {
        match self {
            Self::Borsh => &BorshCodec,
            Self::EthAbi => &EthAbiCodec,
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Borsh => f.write_str("borsh"),
            Self::EthAbi => f.write_str("ethabi"),
        }
    }
}

impl FromStr for Encoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "borsh" => Ok(Self::Borsh),
            "ethabi" | "eth" | "abi" => Ok(Self::EthAbi),
            other => Err(format!("unknown encoding: {other}")),
        }
    }
}

/// Decodes the string argument of an `Error(string)` revert payload whose
/// selector has already been stripped.
pub fn decode_revert_reason(codec: &dyn TypeCodec, body: &[u8]) -> Result<String, CodecError> {
    match codec.decode(&[AbiType::String], body)?.pop() {
        Some(AbiValue::String(reason)) => Ok(reason),
        Some(other) => Err(CodecError::ValueMismatch {
            expected: "string".to_string(),
            found: other.kind().to_string(),
        }),
        None => Err(CodecError::ValueMismatch {
            expected: "string".to_string(),
            found: "nothing".to_string(),
        }),
    }
}

// =============================================================================
// SHARED HELPERS
// =============================================================================

pub(crate) fn check_arity(types: &[AbiType], values: &[AbiValue]) -> Result<(), CodecError> {
    if types.len() == values.len() {
        Ok(())
    } else {
        Err(CodecError::ArrayLength {
            expected: types.len(),
            found: values.len(),
        })
    }
}

pub(crate) fn mismatch(ty: &AbiType, value: &AbiValue) -> CodecError {
    CodecError::ValueMismatch {
        expected: ty.canonical(),
        found: value.kind().to_string(),
    }
}

/// Extracts a signed integer and checks it fits `width` bits.
pub(crate) fn signed_value(
    ty: &AbiType,
    value: &AbiValue,
    width: usize,
) -> Result<BigInt, CodecError> {
    let v = value.as_int().ok_or_else(|| mismatch(ty, value))?;
    let bound = BigInt::one() << (width - 1);
    if v < -bound.clone() || v >= bound {
        return Err(CodecError::OutOfRange { ty: ty.canonical() });
    }
    Ok(v)
}

/// Extracts an unsigned integer and checks it fits `width` bits.
pub(crate) fn unsigned_value(
    ty: &AbiType,
    value: &AbiValue,
    width: usize,
) -> Result<BigUint, CodecError> {
    let v = match value {
        AbiValue::Int(i) if i.sign() == Sign::Minus => {
            return Err(CodecError::OutOfRange { ty: ty.canonical() })
        }
        _ => value.as_uint().ok_or_else(|| mismatch(ty, value))?,
    };
    if v.bits() > width as u64 {
        return Err(CodecError::OutOfRange { ty: ty.canonical() });
    }
    Ok(v)
}

/// Maps a signed value into `[0, 2^width)` by two's complement.
pub(crate) fn to_twos_complement(v: &BigInt, width: usize) -> BigUint {
    let wrapped = if v.sign() == Sign::Minus {
        (BigInt::one() << width) + v
    } else {
        v.clone()
    };
    wrapped.to_biguint().unwrap_or_default()
}

/// Inverse of [`to_twos_complement`].
pub(crate) fn from_twos_complement(u: BigUint, width: usize) -> BigInt {
    if u.bit(width as u64 - 1) {
        BigInt::from(u) - (BigInt::one() << width)
    } else {
        BigInt::from(u)
    }
}

// =============================================================================
// TESTS
// =============================================================================
