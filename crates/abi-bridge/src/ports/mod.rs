//! # Ports Layer (Middle Hexagon)
//!
//! Trait definitions for contract invocation.
//!
//! - **Driving Port (Inbound)**: `ContractApi`
//! - **Driven Port (Outbound)**: `LedgerTransport`
//! - No concrete implementations in this module

pub mod inbound;
pub mod outbound;

pub use inbound::*;
pub use outbound::*;
