//! # Domain Services
//!
//! Pure functions for contract invocation.
//! These functions are deterministic and have no side effects.
//!
//! - Hashing: `keccak256`, selectors and event topics
//! - Seeds: the seed block carried in every instruction
//! - Addresses: program-derived account derivation

use crate::domain::value_objects::{ProgramDerivedAddress, Selector, Topic};
use crate::errors::SeedError;
use sha2::Sha256;
use sha3::{Digest, Keccak256};
use shared_types::Pubkey;

/// Selector of the standard `Error(string)` revert payload.
pub const REVERT_SELECTOR: Selector = [0x08, 0xc3, 0x79, 0xa0];

/// Maximum seeds accepted by address derivation.
pub const MAX_SEEDS: usize = 16;

/// Maximum length of a single derivation seed.
pub const MAX_SEED_LEN: usize = 32;

/// Domain separator appended when deriving program addresses.
const PDA_MARKER: &[u8] = b"ProgramDerivedAddress";

// =============================================================================
// HASHING
// =============================================================================

/// Computes keccak256 hash.
#[must_use]
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    out.copy_from_slice(&Keccak256::digest(data));
    out
}

/// Selector of a function: first four bytes of `keccak256(signature)`.
#[must_use]
pub fn function_selector(signature: &str) -> Selector {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// Selector identifying a contract's constructor.
///
/// Derived from the contract name, so every contract in a program has a
/// distinct deploy entry point.
#[must_use]
pub fn constructor_selector(contract_name: &str) -> Selector {
    function_selector(contract_name)
}

/// Topic of a non-anonymous event: `keccak256(signature)`.
#[must_use]
pub fn event_topic(signature: &str) -> Topic {
    keccak256(signature.as_bytes())
}

// =============================================================================
// SEEDS
// =============================================================================

/// Encodes the seed block of an instruction payload.
///
/// Layout: one count byte, then for each seed one length byte and its bytes.
pub fn encode_seeds(seeds: &[Vec<u8>]) -> Result<Vec<u8>, SeedError> {
    let count = u8::try_from(seeds.len()).map_err(|_| SeedError::TooManySeeds {
        count: seeds.len(),
        max: usize::from(u8::MAX),
    })?;

    let mut out = Vec::with_capacity(1 + seeds.iter().map(|s| s.len() + 1).sum::<usize>());
    out.push(count);
    for seed in seeds {
        let len = u8::try_from(seed.len()).map_err(|_| SeedError::SeedTooLong {
            len: seed.len(),
            max: usize::from(u8::MAX),
        })?;
        out.push(len);
        out.extend_from_slice(seed);
    }
    Ok(out)
}

// =============================================================================
// PROGRAM DERIVED ADDRESSES
// =============================================================================

/// Derives an address from `seeds` and `program_id`.
///
/// `address = sha256(seeds ‖ program_id ‖ "ProgramDerivedAddress")`, rejected
/// when it lies on the ed25519 curve.
pub fn create_program_address(seeds: &[&[u8]], program_id: &Pubkey) -> Result<Pubkey, SeedError> {
    if seeds.len() > MAX_SEEDS {
        return Err(SeedError::TooManySeeds {
            count: seeds.len(),
            max: MAX_SEEDS,
        });
    }

    let mut hasher = Sha256::new();
    for seed in seeds {
        if seed.len() > MAX_SEED_LEN {
            return Err(SeedError::SeedTooLong {
                len: seed.len(),
                max: MAX_SEED_LEN,
            });
        }
        hasher.update(seed);
    }
    hasher.update(program_id.as_bytes());
    hasher.update(PDA_MARKER);

    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&hasher.finalize());
    let address = Pubkey::new(bytes);

    if address.is_on_curve() {
        return Err(SeedError::OnCurve);
    }
    Ok(address)
}

/// Finds the first off-curve address for `salt` followed by a bump byte.
///
/// Bumps are tried from 0 upwards; the returned seed includes the bump.
pub fn find_program_address(
    salt: &[u8],
    program_id: &Pubkey,
) -> Result<ProgramDerivedAddress, SeedError> {
    if salt.len() >= MAX_SEED_LEN {
        return Err(SeedError::SeedTooLong {
            len: salt.len() + 1,
            max: MAX_SEED_LEN,
        });
    }

    let mut seed = Vec::with_capacity(salt.len() + 1);
    seed.extend_from_slice(salt);
    seed.push(0);
    let bump_at = salt.len();

    for bump in 0..=u8::MAX {
        seed[bump_at] = bump;
        let derived = create_program_address(&[seed.as_slice()], program_id);
        match derived {
            Ok(account) => return Ok(ProgramDerivedAddress { account, seed }),
            Err(SeedError::OnCurve) => continue,
            Err(e) => return Err(e),
        }
    }
    Err(SeedError::NoViableBump)
}

/// Renders a key as `0x`-prefixed lowercase hex.
#[must_use]
pub fn pubkey_to_hex(key: &Pubkey) -> String {
    format!("0x{}", hex::encode(key.as_bytes()))
}

// =============================================================================
// TESTS
// =============================================================================
