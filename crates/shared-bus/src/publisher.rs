//! # Log Publisher
//!
//! Defines the publishing side of the log bus.

use crate::events::LogFilter;
use crate::subscriber::{LogStream, Subscription};
use crate::DEFAULT_CHANNEL_CAPACITY;
use async_trait::async_trait;
use shared_types::LogBatch;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Trait for publishing transaction logs to the bus.
#[async_trait]
pub trait LogPublisher: Send + Sync {
    /// Publish one transaction's log batch.
    ///
    /// # Returns
    ///
    /// The number of active subscribers that received the batch.
    async fn publish(&self, batch: LogBatch) -> usize;

    /// Get the total number of batches published.
    fn batches_published(&self) -> u64;
}

/// In-memory implementation of the log bus.
///
/// Uses `tokio::sync::broadcast` for multi-producer, multi-consumer semantics.
pub struct InMemoryLogBus {
    /// Broadcast sender for batches.
    sender: broadcast::Sender<LogBatch>,

    /// Live subscription handles (shared with each `Subscription` for cleanup).
    active: Arc<AtomicUsize>,

    /// Total batches published.
    batches_published: AtomicU64,

    /// Channel capacity.
    capacity: usize,
}

impl InMemoryLogBus {
    /// Create a new in-memory log bus with default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a new in-memory log bus with specified capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            active: Arc::new(AtomicUsize::new(0)),
            batches_published: AtomicU64::new(0),
            capacity,
        }
    }

    /// Subscribe to batches matching a filter.
    #[must_use]
    pub fn subscribe(&self, filter: LogFilter) -> Subscription {
        let receiver = self.sender.subscribe();
        self.active.fetch_add(1, Ordering::SeqCst);

        debug!(mentions = filter.mentions.len(), "New log subscription created");

        Subscription::new(receiver, filter, self.active.clone())
    }

    /// Get a stream of batches matching a filter.
    #[must_use]
    pub fn log_stream(&self, filter: LogFilter) -> LogStream {
        LogStream::new(self.subscribe(filter))
    }

    /// Get the number of live subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Get the channel capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for InMemoryLogBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LogPublisher for InMemoryLogBus {
    async fn publish(&self, batch: LogBatch) -> usize {
        let signature = batch.signature;
        let lines = batch.logs.len();

        // Always increment counter (publish was attempted)
        self.batches_published.fetch_add(1, Ordering::Relaxed);

        match self.sender.send(batch) {
            Ok(receiver_count) => {
                debug!(
                    signature = %signature,
                    lines,
                    receivers = receiver_count,
                    "Log batch published"
                );
                receiver_count
            }
            Err(e) => {
                // No receivers - batch is dropped
                warn!(signature = %signature, error = %e, "Log batch dropped (no receivers)");
                0
            }
        }
    }

    fn batches_published(&self) -> u64 {
        self.batches_published.load(Ordering::Relaxed)
    }
}
