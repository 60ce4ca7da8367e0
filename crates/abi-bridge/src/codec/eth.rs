//! # Ethereum ABI Codec
//!
//! 32-byte big-endian words with the head/tail layout: static values sit in
//! the head, dynamic values are referenced from the head by byte offset and
//! stored in the tail.
//!
//! Addresses are full 32-byte account keys rather than 20-byte values.

use super::{
    check_arity, from_twos_complement, mismatch, signed_value, to_twos_complement,
    unsigned_value, Encoding, TypeCodec,
};
use crate::domain::abi::AbiType;
use crate::domain::services::REVERT_SELECTOR;
use crate::domain::value_objects::{AbiValue, Topic};
use crate::errors::CodecError;
use num_bigint::BigUint;
use shared_types::Pubkey;

const WORD: usize = 32;

/// Ethereum ABI wire format.
#[derive(Debug, Clone, Copy, Default)]
pub struct EthAbiCodec;

impl TypeCodec for EthAbiCodec {
    fn encoding(&self) -> Encoding {
        Encoding::EthAbi
    }

    fn encode(&self, types: &[AbiType], values: &[AbiValue]) -> Result<Vec<u8>, CodecError> {
        encode_tuple(types, values)
    }

    fn decode(&self, types: &[AbiType], buf: &[u8]) -> Result<Vec<AbiValue>, CodecError> {
        decode_tuple(types, buf)
    }
}

// =============================================================================
// REVERT PAYLOADS AND TOPICS
// =============================================================================

/// Builds an `Error(string)` revert payload.
pub fn encode_revert(message: &str) -> Result<Vec<u8>, CodecError> {
    let mut out = REVERT_SELECTOR.to_vec();
    out.extend(encode_tuple(&[AbiType::String], &[AbiValue::from(message)])?);
    Ok(out)
}

/// Decodes an indexed event parameter from its topic.
///
/// Value types are decoded from the word. Dynamic types, tuples and arrays
/// are only present as a hash and come back as 32 fixed bytes.
pub fn decode_topic(ty: &AbiType, topic: &Topic) -> Result<AbiValue, CodecError> {
    match ty {
        AbiType::Tuple(_) | AbiType::Array(..) | AbiType::DynamicBytes | AbiType::String => {
            Ok(AbiValue::FixedBytes(topic.to_vec()))
        }
        _ => decode_value(ty, topic),
    }
}

// =============================================================================
// ENCODING
// =============================================================================

fn static_size(ty: &AbiType) -> usize {
    match ty {
        AbiType::Tuple(components) => components.iter().map(head_size).sum(),
        AbiType::Array(element, Some(n)) => n * static_size(element),
        _ => WORD,
    }
}

fn head_size(ty: &AbiType) -> usize {
    if ty.is_dynamic() {
        WORD
    } else {
        static_size(ty)
    }
}

fn uint_word(value: &BigUint) -> Result<[u8; WORD], CodecError> {
    let bytes = value.to_bytes_be();
    if bytes.len() > WORD {
        return Err(CodecError::OutOfRange {
            ty: "uint256".to_string(),
        });
    }
    let mut word = [0u8; WORD];
    word[WORD - bytes.len()..].copy_from_slice(&bytes);
    Ok(word)
}

fn usize_word(value: usize) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    word[WORD - 8..].copy_from_slice(&(value as u64).to_be_bytes());
    word
}

fn padded(bytes: &[u8]) -> Vec<u8> {
    let mut out = bytes.to_vec();
    out.resize(bytes.len().div_ceil(WORD) * WORD, 0);
    out
}

fn encode_tuple(types: &[AbiType], values: &[AbiValue]) -> Result<Vec<u8>, CodecError> {
    check_arity(types, values)?;
    let head_len: usize = types.iter().map(head_size).sum();
    let mut head = Vec::with_capacity(head_len);
    let mut tail = Vec::new();

    for (ty, value) in types.iter().zip(values) {
        let encoded = encode_value(ty, value)?;
        if ty.is_dynamic() {
            head.extend_from_slice(&usize_word(head_len + tail.len()));
            tail.extend(encoded);
        } else {
            head.extend(encoded);
        }
    }

    head.extend(tail);
    Ok(head)
}

fn encode_value(ty: &AbiType, value: &AbiValue) -> Result<Vec<u8>, CodecError> {
    match ty {
        AbiType::Int(width) => {
            let v = signed_value(ty, value, *width)?;
            Ok(uint_word(&to_twos_complement(&v, 256))?.to_vec())
        }
        AbiType::UInt(width) => {
            let v = unsigned_value(ty, value, *width)?;
            Ok(uint_word(&v)?.to_vec())
        }
        AbiType::Bool => {
            let b = value.as_bool().ok_or_else(|| mismatch(ty, value))?;
            Ok(usize_word(usize::from(b)).to_vec())
        }
        AbiType::Address => match value {
            AbiValue::Address(key) => Ok(key.as_bytes().to_vec()),
            AbiValue::FixedBytes(bytes) if bytes.len() == Pubkey::LEN => Ok(bytes.clone()),
            _ => Err(mismatch(ty, value)),
        },
        AbiType::FixedBytes(n) => match value {
            AbiValue::FixedBytes(bytes) | AbiValue::Bytes(bytes) if bytes.len() == *n => {
                Ok(padded(bytes))
            }
            _ => Err(mismatch(ty, value)),
        },
        AbiType::DynamicBytes => match value {
            AbiValue::Bytes(bytes) | AbiValue::FixedBytes(bytes) => {
                let mut out = usize_word(bytes.len()).to_vec();
                out.extend(padded(bytes));
                Ok(out)
            }
            _ => Err(mismatch(ty, value)),
        },
        AbiType::String => {
            let s = value.as_str().ok_or_else(|| mismatch(ty, value))?;
            let mut out = usize_word(s.len()).to_vec();
            out.extend(padded(s.as_bytes()));
            Ok(out)
        }
        AbiType::Tuple(components) => match value {
            AbiValue::Tuple(items) => encode_tuple(components, items),
            _ => Err(mismatch(ty, value)),
        },
        AbiType::Array(element, length) => {
            let AbiValue::Array(items) = value else {
                return Err(mismatch(ty, value));
            };
            let types = vec![(**element).clone(); items.len()];
            match length {
                Some(n) if items.len() != *n => Err(CodecError::ArrayLength {
                    expected: *n,
                    found: items.len(),
                }),
                Some(_) => encode_tuple(&types, items),
                None => {
                    let mut out = usize_word(items.len()).to_vec();
                    out.extend(encode_tuple(&types, items)?);
                    Ok(out)
                }
            }
        }
    }
}

// =============================================================================
// DECODING
// =============================================================================

fn tail_from(data: &[u8], offset: usize) -> Result<&[u8], CodecError> {
    data.get(offset..).ok_or(CodecError::SchemaMismatch {
        needed: offset,
        remaining: data.len(),
    })
}

fn word_at(data: &[u8], at: usize) -> Result<&[u8], CodecError> {
    data.get(at..at + WORD).ok_or(CodecError::SchemaMismatch {
        needed: WORD,
        remaining: data.len().saturating_sub(at),
    })
}

fn usize_at(data: &[u8], at: usize) -> Result<usize, CodecError> {
    let word = word_at(data, at)?;
    if word[..16].iter().any(|b| *b != 0) {
        return Err(CodecError::LengthOverflow(u128::MAX));
    }
    let mut low = [0u8; 16];
    low.copy_from_slice(&word[16..]);
    let value = u128::from_be_bytes(low);
    usize::try_from(value).map_err(|_| CodecError::LengthOverflow(value))
}

fn decode_tuple(types: &[AbiType], data: &[u8]) -> Result<Vec<AbiValue>, CodecError> {
    let mut values = Vec::with_capacity(types.len());
    let mut cursor = 0;
    for ty in types {
        if ty.is_dynamic() {
            let offset = usize_at(data, cursor)?;
            values.push(decode_value(ty, tail_from(data, offset)?)?);
            cursor += WORD;
        } else {
            values.push(decode_value(ty, tail_from(data, cursor)?)?);
            cursor += static_size(ty);
        }
    }
    Ok(values)
}

fn decode_value(ty: &AbiType, data: &[u8]) -> Result<AbiValue, CodecError> {
    match ty {
        AbiType::Int(width) => {
            let raw = BigUint::from_bytes_be(word_at(data, 0)?);
            let value = AbiValue::Int(from_twos_complement(raw, 256));
            signed_value(ty, &value, *width)?;
            Ok(value)
        }
        AbiType::UInt(width) => {
            let value = AbiValue::UInt(BigUint::from_bytes_be(word_at(data, 0)?));
            unsigned_value(ty, &value, *width)?;
            Ok(value)
        }
        AbiType::Bool => {
            let word = word_at(data, 0)?;
            let last = word[WORD - 1];
            if word[..WORD - 1].iter().any(|b| *b != 0) || last > 1 {
                return Err(CodecError::InvalidBool(last));
            }
            Ok(AbiValue::Bool(last == 1))
        }
        AbiType::Address => {
            let mut key = [0u8; 32];
            key.copy_from_slice(word_at(data, 0)?);
            Ok(AbiValue::Address(Pubkey::new(key)))
        }
        AbiType::FixedBytes(n) => Ok(AbiValue::FixedBytes(word_at(data, 0)?[..*n].to_vec())),
        AbiType::DynamicBytes => Ok(AbiValue::Bytes(read_dynamic(data)?.to_vec())),
        AbiType::String => {
            let bytes = read_dynamic(data)?;
            let s = std::str::from_utf8(bytes).map_err(|_| CodecError::InvalidUtf8)?;
            Ok(AbiValue::String(s.to_string()))
        }
        AbiType::Tuple(components) => decode_tuple(components, data).map(AbiValue::Tuple),
        AbiType::Array(element, Some(n)) => {
            let types = vec![(**element).clone(); *n];
            decode_tuple(&types, data).map(AbiValue::Array)
        }
        AbiType::Array(element, None) => {
            let len = usize_at(data, 0)?;
            let body = tail_from(data, WORD)?;
            // Every element occupies at least one head word.
            if len > body.len() / WORD {
                return Err(CodecError::SchemaMismatch {
                    needed: len.saturating_mul(WORD),
                    remaining: body.len(),
                });
            }
            let types = vec![(**element).clone(); len];
            decode_tuple(&types, body).map(AbiValue::Array)
        }
    }
}

fn read_dynamic(data: &[u8]) -> Result<&[u8], CodecError> {
    let len = usize_at(data, 0)?;
    let body = tail_from(data, WORD)?;
    body.get(..len).ok_or(CodecError::SchemaMismatch {
        needed: len,
        remaining: body.len(),
    })
}

// =============================================================================
// TESTS
// =============================================================================
