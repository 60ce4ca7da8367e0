//! # Domain Layer (Inner Hexagon)
//!
//! ABI model, value types and pure derivation functions.
//! NO I/O, NO async.

pub mod abi;
pub mod entities;
pub mod services;
pub mod value_objects;

pub use abi::*;
pub use entities::*;
pub use services::*;
pub use value_objects::*;
