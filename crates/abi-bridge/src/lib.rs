//! # ABI Bridge - Contract Invocation Layer
//!
//! Calls Solang-compiled contracts on a Solana-style ledger using the
//! Ethereum ABI calling convention.
//!
//! ## Purpose
//!
//! The ABI describes arguments, returns and events in a rich type system;
//! the ledger accepts opaque instruction bytes and reports outcomes as a
//! stream of text log lines. This crate bridges the two: it encodes typed
//! arguments into the instruction payload, submits or simulates the
//! transaction, and turns the resulting logs back into typed return values,
//! decoded events and classified errors.
//!
//! ## Components
//!
//! | Component | Location | Purpose |
//! |-----------|----------|---------|
//! | TypeCodec | `codec/` | Borsh and Ethereum ABI encoders |
//! | InstructionBuilder | `instruction.rs` | Payload and account layout |
//! | LogScanner | `logs/scanner.rs` | Last-wins extraction from log lines |
//! | ErrorClassifier | `logs/classifier.rs` | Failure reason precedence |
//! | TransactionExecutor | `executor.rs` | Send, simulate, resimulate on failure |
//! | EventDispatcher | `dispatcher.rs` | Listener registry over one log subscription |
//! | Contract / Program | `service.rs` | Caller-facing façade |
//!
//! ## Outbound Dependencies
//!
//! | Port | Purpose |
//! |------|---------|
//! | `LedgerTransport` | Send, simulate, fetch confirmed logs, subscribe to logs |
//!
//! ## Usage Example
//!
//! ```ignore
//! use abi_bridge::prelude::*;
//!
//! let program = Arc::new(Program::new(transport, program_id, Some(payer), BridgeConfig::from_env()));
//! let contract = program.contract(abi_json, storage)?;
//!
//! let result = contract.call("name", &[], CallOptions::default()).await?;
//! println!("{:?} in {} CU", result.result, result.compute_units_used);
//! ```

// Crate-level lints
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

// =============================================================================
// MODULES
// =============================================================================

pub mod adapters;
pub mod codec;
pub mod config;
pub mod dispatcher;
pub mod domain;
pub mod errors;
pub mod executor;
pub mod instruction;
pub mod logs;
pub mod ports;
pub mod service;

// =============================================================================
// PRELUDE
// =============================================================================

/// Convenient re-exports for common usage.
pub mod prelude {
    // ABI model
    pub use crate::domain::abi::{
        AbiType, ConstructorDescriptor, EventDescriptor, FunctionDescriptor, Interface, Param,
        StateMutability,
    };

    // Domain entities and values
    pub use crate::domain::entities::{CallOptions, CallResult, DecodedEvent};
    pub use crate::domain::value_objects::{
        AbiValue, EventData, ListenerId, ProgramDerivedAddress, Selector, Topic,
    };

    // Domain services
    pub use crate::domain::services::{
        constructor_selector, create_program_address, event_topic, find_program_address,
        function_selector, keccak256, pubkey_to_hex, REVERT_SELECTOR,
    };

    // Codecs
    pub use crate::codec::{BorshCodec, Encoding, EthAbiCodec, TypeCodec};

    // Logs
    pub use crate::logs::{ErrorClassifier, LogRecord, LogScanner, ScanResult};

    // Execution and events
    pub use crate::dispatcher::{EventCallback, EventDispatcher, LogCallback};
    pub use crate::executor::{ExecutionMode, ExecutionReport, ExecutorState, TransactionExecutor};
    pub use crate::instruction::{BuiltInstruction, InstructionBuilder};

    // Ports
    pub use crate::ports::inbound::ContractApi;
    pub use crate::ports::outbound::{
        Commitment, ConfirmedTransaction, LedgerTransport, LogSubscription, SendOptions,
        SimulationResult, SubscriptionId,
    };

    // Service
    pub use crate::config::BridgeConfig;
    pub use crate::service::{Contract, DeployOptions, DeployResult, Program};

    // Errors
    pub use crate::errors::{
        AbiError, CodecError, ContractError, DispatchError, ExecutionError, SeedError,
        TransportError,
    };

    // Adapters
    pub use crate::adapters::{InMemoryLedger, ProgramOutcome};
}
