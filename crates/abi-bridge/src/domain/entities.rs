//! # Domain Entities
//!
//! Invocation options and results exchanged with the contract façade.

use crate::domain::value_objects::{AbiValue, ProgramDerivedAddress};
use shared_types::{Keypair, Pubkey, Signature};

// =============================================================================
// DECODED EVENT
// =============================================================================

/// An event decoded against a contract interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedEvent {
    /// Event name.
    pub name: String,
    /// Canonical signature.
    pub signature: String,
    /// Argument values in declaration order.
    pub args: Vec<AbiValue>,
    /// Argument names in declaration order.
    pub arg_names: Vec<String>,
}

impl DecodedEvent {
    /// Returns the argument with the given name.
    #[must_use]
    pub fn arg(&self, name: &str) -> Option<&AbiValue> {
        self.arg_names
            .iter()
            .position(|n| n == name)
            .and_then(|i| self.args.get(i))
    }
}

// =============================================================================
// CALL OPTIONS
// =============================================================================

/// Per-invocation options for deploys and calls.
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    /// Caller address placed in the payload header. Defaults to the payer.
    pub caller: Option<Pubkey>,
    /// Value to transfer, in the ledger's smallest unit.
    pub value: u64,
    /// Simulate instead of sending. Always on for read-only functions.
    pub simulate: bool,
    /// Extra read-only accounts.
    pub accounts: Vec<Pubkey>,
    /// Extra writable accounts.
    pub writable_accounts: Vec<Pubkey>,
    /// Derived addresses the contract may create or sign for.
    pub program_derived_addresses: Vec<ProgramDerivedAddress>,
    /// Additional signers after the payer.
    pub signers: Vec<Keypair>,
    /// When set, must equal the instance's storage account.
    pub storage: Option<Pubkey>,
    /// When set, must equal the instance's program account.
    pub program: Option<Pubkey>,
}

impl CallOptions {
    /// Sets the caller address.
    #[must_use]
    pub fn with_caller(mut self, caller: Pubkey) -> Self {
        self.caller = Some(caller);
        self
    }

    /// Sets the value to transfer.
    #[must_use]
    pub fn with_value(mut self, value: u64) -> Self {
        self.value = value;
        self
    }

    /// Requests simulation only.
    #[must_use]
    pub fn simulated(mut self) -> Self {
        self.simulate = true;
        self
    }

    /// Adds a read-only account.
    #[must_use]
    pub fn with_account(mut self, account: Pubkey) -> Self {
        self.accounts.push(account);
        self
    }

    /// Adds a writable account.
    #[must_use]
    pub fn with_writable_account(mut self, account: Pubkey) -> Self {
        self.writable_accounts.push(account);
        self
    }

    /// Adds a derived address.
    #[must_use]
    pub fn with_program_derived_address(mut self, pda: ProgramDerivedAddress) -> Self {
        self.program_derived_addresses.push(pda);
        self
    }

    /// Adds a signer.
    #[must_use]
    pub fn with_signer(mut self, signer: Keypair) -> Self {
        self.signers.push(signer);
        self
    }
}

// =============================================================================
// CALL RESULT
// =============================================================================

/// Outcome of a successful call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallResult {
    /// Decoded return value. A single output is returned bare, several as a tuple.
    pub result: Option<AbiValue>,
    /// Full log output.
    pub logs: Vec<String>,
    /// Compute units consumed.
    pub compute_units_used: u64,
    /// Events emitted by this contract during the call.
    pub events: Vec<DecodedEvent>,
    /// Transaction signature, for sent (not simulated) calls.
    pub signature: Option<Signature>,
}

// =============================================================================
// TESTS
// =============================================================================
