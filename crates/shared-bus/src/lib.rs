//! # Shared Bus - Log Stream Bus
//!
//! Delivers the log output of executed transactions to any number of
//! subscribers, the way a ledger node pushes `logsSubscribe` notifications.
//!
//! ```text
//! ┌──────────────┐    publish()     ┌──────────────┐   recv()   ┌────────────┐
//! │ Ledger node  │ ───────────────▶ │ InMemoryLog  │ ─────────▶ │ Subscriber │
//! │ (or adapter) │    LogBatch      │     Bus      │  filtered  │            │
//! └──────────────┘                  └──────────────┘            └────────────┘
//! ```
//!
//! Each subscription carries a `LogFilter`; batches that do not mention the
//! filtered programs are skipped on the receiving side.

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod events;
pub mod publisher;
pub mod subscriber;

// Re-export main types
pub use events::LogFilter;
pub use publisher::{InMemoryLogBus, LogPublisher};
pub use subscriber::{LogStream, Subscription, SubscriptionError};

/// Maximum batches to buffer per subscriber before older ones are dropped.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;
