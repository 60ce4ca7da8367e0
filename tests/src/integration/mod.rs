//! # Integration Tests
//!
//! Contract calls driven end to end through the in-memory ledger.

pub mod calls;
pub mod events;
pub mod fixtures;
