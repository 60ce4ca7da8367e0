//! # Shared Types Crate
//!
//! Ledger primitives used by every crate in the workspace: account keys,
//! signatures, instructions, transactions and the log batches a ledger node
//! pushes to log subscribers.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: All cross-crate ledger types are defined here.
//! - **Opaque Payloads**: Instruction data is a raw byte buffer; interpreting
//!   it is the job of the bridge crate, never of the transport.

pub mod entities;
pub mod errors;

pub use entities::*;
pub use errors::*;
