//! # In-Memory Ledger
//!
//! A [`LedgerTransport`] that runs registered program handlers in process.
//! Each handler maps an [`Instruction`] to a [`ProgramOutcome`]; the ledger
//! frames the outcome in the log lines a real node would produce and pushes
//! every executed transaction onto an [`InMemoryLogBus`].

use crate::domain::value_objects::Topic;
use crate::errors::TransportError;
use crate::ports::outbound::{
    ConfirmedTransaction, LedgerTransport, LogSubscription, SendOptions, SimulationResult,
    SubscriptionId,
};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use parking_lot::Mutex;
use shared_bus::{InMemoryLogBus, LogFilter, LogPublisher};
use shared_types::{Instruction, LogBatch, Pubkey, Signature, Transaction};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::StreamExt;
use tracing::{debug, warn};

/// Compute budget reported in `consumed N of M compute units` lines.
pub const COMPUTE_UNIT_LIMIT: u64 = 200_000;

/// Executes one instruction.
pub type ProgramHandler = Arc<dyn Fn(&Instruction) -> ProgramOutcome + Send + Sync>;

// =============================================================================
// PROGRAM OUTCOME
// =============================================================================

/// What a program did when invoked.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgramOutcome {
    /// Lines emitted by the program itself.
    pub logs: Vec<String>,
    /// Data set with `set_return_data`.
    pub return_data: Option<Vec<u8>>,
    /// Ledger-level error, if execution failed.
    pub err: Option<String>,
    /// Compute units consumed.
    pub compute_units: u64,
}

impl ProgramOutcome {
    /// A successful execution.
    #[must_use]
    pub fn success(compute_units: u64) -> Self {
        Self {
            compute_units,
            ..Self::default()
        }
    }

    /// A failed execution with the given ledger error.
    #[must_use]
    pub fn failure(compute_units: u64, err: impl Into<String>) -> Self {
        Self {
            err: Some(err.into()),
            compute_units,
            ..Self::default()
        }
    }

    /// Adds a `Program log:` line.
    #[must_use]
    pub fn with_log(mut self, text: &str) -> Self {
        self.logs.push(format!("Program log: {text}"));
        self
    }

    /// Adds a raw line.
    #[must_use]
    pub fn with_line(mut self, line: impl Into<String>) -> Self {
        self.logs.push(line.into());
        self
    }

    /// Adds a `Program data:` event line.
    #[must_use]
    pub fn with_event(mut self, topics: &[Topic], data: &[u8]) -> Self {
        self.logs.push(format!(
            "Program data: {} {}",
            STANDARD.encode(topics.concat()),
            STANDARD.encode(data)
        ));
        self
    }

    /// Sets the return data.
    #[must_use]
    pub fn with_return(mut self, data: Vec<u8>) -> Self {
        self.return_data = Some(data);
        self
    }
}

// =============================================================================
// LEDGER
// =============================================================================

#[derive(Default)]
struct LedgerState {
    programs: HashMap<Pubkey, ProgramHandler>,
    confirmed: HashMap<Signature, ConfirmedTransaction>,
    subscriptions: HashMap<SubscriptionId, JoinHandle<()>>,
    last_subscription: SubscriptionId,
    fail_next_send: Option<TransportError>,
    submitted: Vec<Transaction>,
    simulated: Vec<Transaction>,
    subscribe_calls: usize,
    unsubscribe_calls: usize,
}

struct Execution {
    logs: Vec<String>,
    err: Option<String>,
    compute_units: u64,
}

/// In-process ledger for tests and local runs.
pub struct InMemoryLedger {
    state: Mutex<LedgerState>,
    bus: Arc<InMemoryLogBus>,
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryLedger {
    /// Create an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(LedgerState::default()),
            bus: Arc::new(InMemoryLogBus::new()),
        }
    }

    /// Install `handler` as the program at `program_id`.
    pub fn register_program<F>(&self, program_id: Pubkey, handler: F)
    where
        F: Fn(&Instruction) -> ProgramOutcome + Send + Sync + 'static,
    {
        self.state.lock().programs.insert(program_id, Arc::new(handler));
    }

    /// Make the next `send_and_confirm` fail with `err` without executing.
    pub fn fail_next_send(&self, err: TransportError) {
        self.state.lock().fail_next_send = Some(err);
    }

    /// Transactions passed to `send_and_confirm`.
    #[must_use]
    pub fn submitted_count(&self) -> usize {
        self.state.lock().submitted.len()
    }

    /// Transactions passed to `simulate`.
    #[must_use]
    pub fn simulated_count(&self) -> usize {
        self.state.lock().simulated.len()
    }

    /// The most recently submitted transaction.
    #[must_use]
    pub fn last_submitted(&self) -> Option<Transaction> {
        self.state.lock().submitted.last().cloned()
    }

    /// Calls to `subscribe_logs`.
    #[must_use]
    pub fn subscribe_calls(&self) -> usize {
        self.state.lock().subscribe_calls
    }

    /// Calls to `unsubscribe_logs`.
    #[must_use]
    pub fn unsubscribe_calls(&self) -> usize {
        self.state.lock().unsubscribe_calls
    }

    /// Subscriptions currently open.
    #[must_use]
    pub fn open_subscriptions(&self) -> usize {
        self.state.lock().subscriptions.len()
    }

    /// The bus every executed transaction is published on.
    #[must_use]
    pub fn bus(&self) -> Arc<InMemoryLogBus> {
        Arc::clone(&self.bus)
    }

    fn run(&self, tx: &Transaction) -> Execution {
        let mut execution = Execution {
            logs: Vec::new(),
            err: None,
            compute_units: 0,
        };

        for instruction in &tx.message.instructions {
            let id = instruction.program_id;
            let handler = self.state.lock().programs.get(&id).cloned();
            execution.logs.push(format!("Program {id} invoke [1]"));

            let Some(handler) = handler else {
                execution.logs.push(format!("Program {id} failed: program not found"));
                execution.err = Some("ProgramAccountNotFound".to_string());
                break;
            };

            let outcome = handler(instruction);
            execution.compute_units += outcome.compute_units;
            execution.logs.extend(outcome.logs);
            execution.logs.push(format!(
                "Program {id} consumed {} of {COMPUTE_UNIT_LIMIT} compute units",
                outcome.compute_units
            ));
            if let Some(data) = outcome.return_data {
                execution
                    .logs
                    .push(format!("Program return: {id} {}", STANDARD.encode(data)));
            }
            if let Some(err) = outcome.err {
                execution.logs.push(format!("Program {id} failed: {err}"));
                execution.err = Some(err);
                break;
            }
            execution.logs.push(format!("Program {id} success"));
        }
        execution
    }
}

#[async_trait]
impl LedgerTransport for InMemoryLedger {
    async fn send_and_confirm(
        &self,
        tx: &Transaction,
        options: &SendOptions,
    ) -> Result<Signature, TransportError> {
        tx.verify()
            .map_err(|e| TransportError::Rejected(e.to_string()))?;

        let injected = {
            let mut state = self.state.lock();
            state.submitted.push(tx.clone());
            state.fail_next_send.take()
        };
        if let Some(err) = injected {
            return Err(err);
        }

        let signature = tx.id();
        let execution = self.run(tx);
        debug!(%signature, commitment = %options.commitment, lines = execution.logs.len(), "transaction executed");

        self.bus
            .publish(LogBatch {
                signature,
                err: execution.err.clone(),
                logs: execution.logs.clone(),
            })
            .await;

        if let Some(err) = execution.err {
            return Err(TransportError::Rejected(err));
        }

        self.state.lock().confirmed.insert(
            signature,
            ConfirmedTransaction {
                logs: execution.logs,
                compute_units_consumed: Some(execution.compute_units),
            },
        );
        Ok(signature)
    }

    async fn confirmed_logs(
        &self,
        signature: &Signature,
    ) -> Result<ConfirmedTransaction, TransportError> {
        self.state
            .lock()
            .confirmed
            .get(signature)
            .cloned()
            .ok_or_else(|| TransportError::NotFound(signature.to_string()))
    }

    async fn simulate(&self, tx: &Transaction) -> Result<SimulationResult, TransportError> {
        self.state.lock().simulated.push(tx.clone());
        let execution = self.run(tx);
        Ok(SimulationResult {
            err: execution.err,
            logs: execution.logs,
        })
    }

    async fn subscribe_logs(&self, program_id: Pubkey) -> Result<LogSubscription, TransportError> {
        let mut stream = self.bus.log_stream(LogFilter::program(program_id));
        let (sender, receiver) = mpsc::unbounded_channel();

        let forward = tokio::spawn(async move {
            while let Some(batch) = stream.next().await {
                if sender.send(batch).is_err() {
                    break;
                }
            }
        });

        let mut state = self.state.lock();
        state.subscribe_calls += 1;
        state.last_subscription += 1;
        let id = state.last_subscription;
        state.subscriptions.insert(id, forward);
        debug!(subscription = id, program = %program_id, "log subscription opened");
        Ok(LogSubscription { id, receiver })
    }

    async fn unsubscribe_logs(&self, id: SubscriptionId) -> Result<(), TransportError> {
        let mut state = self.state.lock();
        state.unsubscribe_calls += 1;
        match state.subscriptions.remove(&id) {
            Some(forward) => {
                forward.abort();
                Ok(())
            }
            None => {
                warn!(subscription = id, "unsubscribe of unknown subscription");
                Err(TransportError::NotFound(format!("subscription {id}")))
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
