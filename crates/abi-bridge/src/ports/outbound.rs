//! # Driven Ports (SPI - Outbound)
//!
//! The ledger the bridge talks to. Adapters implement [`LedgerTransport`]
//! over RPC, or in memory for tests.
//!
//! The bridge never retries inside these calls; the only recovery it
//! performs is resimulating a failed send to recover its logs.

use crate::errors::TransportError;
use async_trait::async_trait;
use shared_types::{LogBatch, Pubkey, Signature, Transaction};
use std::fmt;
use std::str::FromStr;
use tokio::sync::mpsc;

/// Identifier of an open log subscription.
pub type SubscriptionId = u64;

// =============================================================================
// OPTIONS AND RESULTS
// =============================================================================

/// How final a transaction must be before the ledger reports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Commitment {
    /// Processed by the connected node.
    Processed,
    /// Voted on by a supermajority.
    #[default]
    Confirmed,
    /// Rooted.
    Finalized,
}

impl fmt::Display for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Processed => f.write_str("processed"),
            Self::Confirmed => f.write_str("confirmed"),
            Self::Finalized => f.write_str("finalized"),
        }
    }
}

impl FromStr for Commitment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "processed" => Ok(Self::Processed),
            "confirmed" => Ok(Self::Confirmed),
            "finalized" => Ok(Self::Finalized),
            other => Err(format!("unknown commitment: {other}")),
        }
    }
}

/// Submission options for a sent transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SendOptions {
    /// Skip the node's own preflight simulation.
    pub skip_preflight: bool,
    /// Commitment to wait for.
    pub commitment: Commitment,
}

/// Result of a simulation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimulationResult {
    /// Ledger-level error, if execution failed.
    pub err: Option<String>,
    /// Log lines produced.
    pub logs: Vec<String>,
}

/// A confirmed transaction's metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfirmedTransaction {
    /// Log lines produced.
    pub logs: Vec<String>,
    /// Compute units as reported by the ledger, when available.
    pub compute_units_consumed: Option<u64>,
}

/// An open push subscription over a program's logs.
#[derive(Debug)]
pub struct LogSubscription {
    /// Identifier used to close the subscription.
    pub id: SubscriptionId,
    /// Receives one batch per transaction mentioning the program.
    pub receiver: mpsc::UnboundedReceiver<LogBatch>,
}

// =============================================================================
// LEDGER TRANSPORT
// =============================================================================

/// Interface to a Solana-style ledger.
#[async_trait]
pub trait LedgerTransport: Send + Sync {
    /// Submits a signed transaction and waits for the requested commitment.
    ///
    /// Returns an error when the ledger rejects the transaction or its
    /// execution fails; the error carries no logs.
    async fn send_and_confirm(
        &self,
        tx: &Transaction,
        options: &SendOptions,
    ) -> Result<Signature, TransportError>;

    /// Fetches the logs of a confirmed transaction.
    async fn confirmed_logs(
        &self,
        signature: &Signature,
    ) -> Result<ConfirmedTransaction, TransportError>;

    /// Executes a transaction without committing it.
    async fn simulate(&self, tx: &Transaction) -> Result<SimulationResult, TransportError>;

    /// Opens a push subscription over logs mentioning `program_id`.
    async fn subscribe_logs(&self, program_id: Pubkey) -> Result<LogSubscription, TransportError>;

    /// Closes a subscription opened by [`subscribe_logs`](Self::subscribe_logs).
    async fn unsubscribe_logs(&self, id: SubscriptionId) -> Result<(), TransportError>;
}
