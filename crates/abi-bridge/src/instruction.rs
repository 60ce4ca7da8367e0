//! # Instruction Builder
//!
//! Lays out the payload and account list of a deploy or call instruction.
//!
//! ## Payload
//!
//! | Field | Size | Content |
//! |-------|------|---------|
//! | storage | 32 | contract storage account |
//! | caller | 32 | calling account |
//! | value | 8 | transferred value, little-endian |
//! | selector | 4 | `keccak256(contract name)[..4]` on deploy, zero on call |
//! | seeds | 1 + Σ(1 + len) | derived-address seeds |
//! | input | rest | constructor args, or function selector + args |
//!
//! ## Accounts
//!
//! Derived addresses (writable), storage (writable), read-only extras,
//! writable extras. The deployed module indexes this list positionally.

use crate::codec::TypeCodec;
use crate::domain::abi::{param_types, FunctionDescriptor, Param};
use crate::domain::entities::CallOptions;
use crate::domain::services::{constructor_selector, encode_seeds};
use crate::domain::value_objects::{AbiValue, Selector};
use crate::errors::{AbiError, ContractError};
use shared_types::{AccountMeta, Instruction, Pubkey};
use tracing::trace;

/// Selector slot of an ordinary call.
pub const CALL_SELECTOR: Selector = [0u8; 4];

/// Fixed-size prefix of every payload: storage, caller, value, selector.
pub const HEADER_LEN: usize = 32 + 32 + 8 + 4;

/// Payload and accounts of one instruction, before it is bound to a program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltInstruction {
    /// Raw instruction data.
    pub data: Vec<u8>,
    /// Ordered account references.
    pub accounts: Vec<AccountMeta>,
}

impl BuiltInstruction {
    /// Binds the instruction to `program_id`.
    #[must_use]
    pub fn into_instruction(self, program_id: Pubkey) -> Instruction {
        Instruction {
            program_id,
            accounts: self.accounts,
            data: self.data,
        }
    }
}

/// Builds instructions against one storage account.
#[derive(Debug, Clone, Copy)]
pub struct InstructionBuilder<'a> {
    storage: Pubkey,
    codec: &'a dyn TypeCodec,
}

impl<'a> InstructionBuilder<'a> {
    /// Creates a builder for the instance at `storage`, encoding arguments with `codec`.
    #[must_use]
    pub fn new(storage: Pubkey, codec: &'a dyn TypeCodec) -> Self {
        Self { storage, codec }
    }

    /// Builds the constructor instruction for `contract_name`.
    pub fn deploy(
        &self,
        contract_name: &str,
        constructor_inputs: &[Param],
        args: &[AbiValue],
        caller: Pubkey,
        options: &CallOptions,
    ) -> Result<BuiltInstruction, ContractError> {
        check_argument_count(constructor_inputs.len(), args.len())?;
        let input = self.codec.encode(&param_types(constructor_inputs), args)?;
        self.assemble(caller, constructor_selector(contract_name), &input, options)
    }

    /// Builds a call of `function`.
    ///
    /// The header selector stays zero; the function is identified by its own
    /// selector at the front of the input.
    pub fn call(
        &self,
        function: &FunctionDescriptor,
        args: &[AbiValue],
        caller: Pubkey,
        options: &CallOptions,
    ) -> Result<BuiltInstruction, ContractError> {
        check_argument_count(function.inputs.len(), args.len())?;
        let encoded = self.codec.encode(&function.input_types(), args)?;

        let mut input = Vec::with_capacity(4 + encoded.len());
        input.extend_from_slice(&function.selector);
        input.extend_from_slice(&encoded);
        self.assemble(caller, CALL_SELECTOR, &input, options)
    }

    fn assemble(
        &self,
        caller: Pubkey,
        selector: Selector,
        input: &[u8],
        options: &CallOptions,
    ) -> Result<BuiltInstruction, ContractError> {
        let seeds: Vec<Vec<u8>> = options
            .program_derived_addresses
            .iter()
            .map(|pda| pda.seed.clone())
            .collect();
        let seed_block = encode_seeds(&seeds)?;

        let mut data = Vec::with_capacity(HEADER_LEN + seed_block.len() + input.len());
        data.extend_from_slice(self.storage.as_bytes());
        data.extend_from_slice(caller.as_bytes());
        data.extend_from_slice(&options.value.to_le_bytes());
        data.extend_from_slice(&selector);
        data.extend_from_slice(&seed_block);
        data.extend_from_slice(input);

        let accounts: Vec<AccountMeta> = options
            .program_derived_addresses
            .iter()
            .map(|pda| AccountMeta::writable(pda.account))
            .chain(std::iter::once(AccountMeta::writable(self.storage)))
            .chain(options.accounts.iter().copied().map(AccountMeta::readonly))
            .chain(
                options
                    .writable_accounts
                    .iter()
                    .copied()
                    .map(AccountMeta::writable),
            )
            .collect();

        trace!(
            len = data.len(),
            accounts = accounts.len(),
            selector = %hex::encode(selector),
            "instruction assembled"
        );
        Ok(BuiltInstruction { data, accounts })
    }
}

fn check_argument_count(expected: usize, found: usize) -> Result<(), AbiError> {
    if expected == found {
        Ok(())
    } else {
        Err(AbiError::ArgumentCount { expected, found })
    }
}

// =============================================================================
// TESTS
// =============================================================================
