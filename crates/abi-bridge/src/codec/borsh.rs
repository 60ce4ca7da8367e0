//! # Borsh Codec
//!
//! Little-endian, length-prefixed encoding.
//!
//! | Type | Layout |
//! |------|--------|
//! | `intN` / `uintN` | N/8 bytes, two's complement, little-endian |
//! | `bool` | 1 byte, 0 or 1 |
//! | `bytesN` | N raw bytes |
//! | `address` | 32 raw bytes |
//! | `bytes` / `string` | u32 length, then the bytes |
//! | `T[k]` / tuple | elements back to back, no prefix |
//! | `T[]` | u32 count, then the elements |

use super::{
    check_arity, from_twos_complement, mismatch, signed_value, to_twos_complement,
    unsigned_value, Encoding, TypeCodec,
};
use crate::domain::abi::AbiType;
use crate::domain::value_objects::AbiValue;
use crate::errors::CodecError;
use num_bigint::{BigInt, BigUint};
use num_traits::ToPrimitive;
use shared_types::Pubkey;

/// Borsh wire format.
#[derive(Debug, Clone, Copy, Default)]
pub struct BorshCodec;

impl BorshCodec {
    /// Decodes and requires that `buf` is consumed exactly.
    pub fn decode_exact(&self, types: &[AbiType], buf: &[u8]) -> Result<Vec<AbiValue>, CodecError> {
        let mut reader = Reader::new(buf);
        let values = types
            .iter()
            .map(|ty| reader.read_value(ty))
            .collect::<Result<Vec<_>, _>>()?;
        match reader.remaining() {
            0 => Ok(values),
            n => Err(CodecError::TrailingBytes(n)),
        }
    }
}

impl TypeCodec for BorshCodec {
    fn encoding(&self) -> Encoding {
        Encoding::Borsh
    }

    fn encode(&self, types: &[AbiType], values: &[AbiValue]) -> Result<Vec<u8>, CodecError> {
        check_arity(types, values)?;
        let mut out = Vec::new();
        for (ty, value) in types.iter().zip(values) {
            write_value(&mut out, ty, value)?;
        }
        Ok(out)
    }

    fn decode(&self, types: &[AbiType], buf: &[u8]) -> Result<Vec<AbiValue>, CodecError> {
        let mut reader = Reader::new(buf);
        types.iter().map(|ty| reader.read_value(ty)).collect()
    }
}

// =============================================================================
// ENCODING
// =============================================================================

fn write_len(out: &mut Vec<u8>, len: usize) -> Result<(), CodecError> {
    let len = u32::try_from(len).map_err(|_| CodecError::LengthOverflow(len as u128))?;
    out.extend_from_slice(&len.to_le_bytes());
    Ok(())
}

fn write_value(out: &mut Vec<u8>, ty: &AbiType, value: &AbiValue) -> Result<(), CodecError> {
    match ty {
        AbiType::Int(width) => {
            let v = signed_value(ty, value, *width)?;
            let size = width / 8;
            if *width <= 64 {
                let n = v.to_i64().ok_or_else(|| CodecError::OutOfRange { ty: ty.canonical() })?;
                out.extend_from_slice(&n.to_le_bytes()[..size]);
            } else {
                let mut bytes = to_twos_complement(&v, *width).to_bytes_le();
                bytes.resize(size, 0);
                out.extend_from_slice(&bytes);
            }
        }
        AbiType::UInt(width) => {
            let v = unsigned_value(ty, value, *width)?;
            let size = width / 8;
            if *width <= 64 {
                let n = v.to_u64().ok_or_else(|| CodecError::OutOfRange { ty: ty.canonical() })?;
                out.extend_from_slice(&n.to_le_bytes()[..size]);
            } else {
                let mut bytes = v.to_bytes_le();
                bytes.resize(size, 0);
                out.extend_from_slice(&bytes);
            }
        }
        AbiType::Bool => {
            let b = value.as_bool().ok_or_else(|| mismatch(ty, value))?;
            out.push(u8::from(b));
        }
        AbiType::FixedBytes(n) => match value {
            AbiValue::FixedBytes(bytes) | AbiValue::Bytes(bytes) if bytes.len() == *n => {
                out.extend_from_slice(bytes);
            }
            _ => return Err(mismatch(ty, value)),
        },
        AbiType::Address => match value {
            AbiValue::Address(key) => out.extend_from_slice(key.as_bytes()),
            AbiValue::FixedBytes(bytes) if bytes.len() == Pubkey::LEN => {
                out.extend_from_slice(bytes);
            }
            _ => return Err(mismatch(ty, value)),
        },
        AbiType::DynamicBytes => match value {
            AbiValue::Bytes(bytes) | AbiValue::FixedBytes(bytes) => {
                write_len(out, bytes.len())?;
                out.extend_from_slice(bytes);
            }
            _ => return Err(mismatch(ty, value)),
        },
        AbiType::String => {
            let s = value.as_str().ok_or_else(|| mismatch(ty, value))?;
            write_len(out, s.len())?;
            out.extend_from_slice(s.as_bytes());
        }
        AbiType::Tuple(components) => {
            let AbiValue::Tuple(items) = value else {
                return Err(mismatch(ty, value));
            };
            check_arity(components, items)?;
            for (component, item) in components.iter().zip(items) {
                write_value(out, component, item)?;
            }
        }
        AbiType::Array(element, length) => {
            let AbiValue::Array(items) = value else {
                return Err(mismatch(ty, value));
            };
            match length {
                Some(n) if items.len() != *n => {
                    return Err(CodecError::ArrayLength {
                        expected: *n,
                        found: items.len(),
                    })
                }
                Some(_) => {}
                None => write_len(out, items.len())?,
            }
            for item in items {
                write_value(out, element, item)?;
            }
        }
    }
    Ok(())
}

// =============================================================================
// DECODING
// =============================================================================

struct Reader<'a> {
    buf: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, offset: 0 }
    }

    fn remaining(&self) -> usize {
        self.buf.len() - self.offset
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], CodecError> {
        if n > self.remaining() {
            return Err(CodecError::SchemaMismatch {
                needed: n,
                remaining: self.remaining(),
            });
        }
        let slice = &self.buf[self.offset..self.offset + n];
        self.offset += n;
        Ok(slice)
    }

    fn read_len(&mut self) -> Result<usize, CodecError> {
        let bytes = self.take(4)?;
        let len = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        Ok(len as usize)
    }

    fn read_value(&mut self, ty: &AbiType) -> Result<AbiValue, CodecError> {
        Ok(match ty {
            AbiType::Int(width) => {
                let bytes = self.take(width / 8)?;
                if *width <= 64 {
                    let negative = bytes.last().is_some_and(|b| b & 0x80 != 0);
                    let mut buf = if negative { [0xff; 8] } else { [0; 8] };
                    buf[..bytes.len()].copy_from_slice(bytes);
                    AbiValue::Int(BigInt::from(i64::from_le_bytes(buf)))
                } else {
                    AbiValue::Int(from_twos_complement(BigUint::from_bytes_le(bytes), *width))
                }
            }
            AbiType::UInt(width) => {
                let bytes = self.take(width / 8)?;
                AbiValue::UInt(BigUint::from_bytes_le(bytes))
            }
            AbiType::Bool => match self.take(1)?[0] {
                0 => AbiValue::Bool(false),
                1 => AbiValue::Bool(true),
                other => return Err(CodecError::InvalidBool(other)),
            },
            AbiType::FixedBytes(n) => AbiValue::FixedBytes(self.take(*n)?.to_vec()),
            AbiType::Address => {
                let bytes = self.take(Pubkey::LEN)?;
                let mut key = [0u8; 32];
                key.copy_from_slice(bytes);
                AbiValue::Address(Pubkey::new(key))
            }
            AbiType::DynamicBytes => {
                let len = self.read_len()?;
                AbiValue::Bytes(self.take(len)?.to_vec())
            }
            AbiType::String => {
                let len = self.read_len()?;
                let bytes = self.take(len)?;
                let s = std::str::from_utf8(bytes).map_err(|_| CodecError::InvalidUtf8)?;
                AbiValue::String(s.to_string())
            }
            AbiType::Tuple(components) => AbiValue::Tuple(
                components
                    .iter()
                    .map(|c| self.read_value(c))
                    .collect::<Result<_, _>>()?,
            ),
            AbiType::Array(element, length) => {
                let count = match length {
                    Some(n) => *n,
                    None => {
                        let count = self.read_len()?;
                        // Zero-sized elements still cost a byte each here, so
                        // the count is always bounded by the buffer.
                        let floor = min_encoded_len(element).max(1);
                        if count > self.remaining() / floor {
                            return Err(CodecError::SchemaMismatch {
                                needed: count.saturating_mul(floor),
                                remaining: self.remaining(),
                            });
                        }
                        count
                    }
                };
                let mut items = Vec::with_capacity(count);
                for _ in 0..count {
                    items.push(self.read_value(element)?);
                }
                AbiValue::Array(items)
            }
        })
    }
}

/// Fewest bytes a value of `ty` can occupy.
fn min_encoded_len(ty: &AbiType) -> usize {
    match ty {
        AbiType::Int(width) | AbiType::UInt(width) => width / 8,
        AbiType::Bool => 1,
        AbiType::FixedBytes(n) => *n,
        AbiType::Address => Pubkey::LEN,
        AbiType::DynamicBytes | AbiType::String | AbiType::Array(_, None) => 4,
        AbiType::Tuple(components) => components.iter().map(min_encoded_len).sum(),
        AbiType::Array(element, Some(n)) => min_encoded_len(element).saturating_mul(*n),
    }
}

// =============================================================================
// TESTS
// =============================================================================
