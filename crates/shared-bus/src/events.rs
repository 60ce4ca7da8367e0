//! # Log Filters
//!
//! Selects which transaction log batches a subscriber receives.

use shared_types::{LogBatch, Pubkey};

/// Filter for subscribing to specific log batches.
#[derive(Debug, Clone, Default)]
pub struct LogFilter {
    /// Programs that must be mentioned in the batch. Empty means all batches.
    pub mentions: Vec<Pubkey>,
    /// Whether batches of failed transactions are delivered.
    pub include_failed: bool,
}

impl LogFilter {
    /// Create a filter that accepts every batch, failed ones included.
    #[must_use]
    pub fn all() -> Self {
        Self {
            mentions: Vec::new(),
            include_failed: true,
        }
    }

    /// Create a filter for batches mentioning one program.
    #[must_use]
    pub fn program(program: Pubkey) -> Self {
        Self {
            mentions: vec![program],
            include_failed: true,
        }
    }

    /// Drop batches of failed transactions.
    #[must_use]
    pub fn successful_only(mut self) -> Self {
        self.include_failed = false;
        self
    }

    /// Check if a batch matches this filter.
    #[must_use]
    pub fn matches(&self, batch: &LogBatch) -> bool {
        let status_match = self.include_failed || batch.err.is_none();
        let program_match =
            self.mentions.is_empty() || self.mentions.iter().any(|p| batch.mentions(p));

        status_match && program_match
    }
}
