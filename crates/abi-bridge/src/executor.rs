//! # Transaction Executor
//!
//! Submits or simulates one instruction and interprets the outcome.
//!
//! ```text
//! Idle ─▶ Submitting ─┬─▶ Confirmed
//!                     └─▶ Failed ─▶ Resimulating ─▶ Diagnosed
//! ```
//!
//! A failed send is never retried. The identical transaction is simulated
//! once, only to recover the logs the failed send did not return, and those
//! logs go through the [`ErrorClassifier`].

use crate::errors::{ContractError, TransportError};
use crate::logs::{ErrorClassifier, LogScanner, ScanResult};
use crate::ports::outbound::{LedgerTransport, SendOptions};
use shared_types::{Instruction, Keypair, Signature, Transaction};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Stage of one execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExecutorState {
    /// Nothing submitted yet.
    Idle,
    /// Sent or simulating.
    Submitting,
    /// Executed successfully.
    Confirmed,
    /// The ledger rejected the transaction.
    Failed,
    /// Simulating a failed send to recover its logs.
    Resimulating,
    /// The failure has been classified.
    Diagnosed,
}

impl fmt::Display for ExecutorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Submitting => "submitting",
            Self::Confirmed => "confirmed",
            Self::Failed => "failed",
            Self::Resimulating => "resimulating",
            Self::Diagnosed => "diagnosed",
        };
        f.write_str(name)
    }
}

/// Whether to commit the transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ExecutionMode {
    /// Dry run; nothing is committed.
    Simulate,
    /// Send and wait for confirmation.
    #[default]
    Send,
}

/// Outcome of a successful execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionReport {
    /// Full log output.
    pub logs: Vec<String>,
    /// What the scanner recovered from the logs.
    pub scan: ScanResult,
    /// Compute units consumed.
    pub compute_units_used: u64,
    /// Signature of a sent transaction; `None` when simulated.
    pub signature: Option<Signature>,
    /// Final state, always [`ExecutorState::Confirmed`] for a report.
    pub state: ExecutorState,
}

impl ExecutionReport {
    /// Return data of the execution, if any.
    #[must_use]
    pub fn return_data(&self) -> Option<&[u8]> {
        self.scan.return_data.as_deref()
    }
}

/// Drives instructions through a [`LedgerTransport`].
#[derive(Clone)]
pub struct TransactionExecutor {
    transport: Arc<dyn LedgerTransport>,
    classifier: ErrorClassifier,
    send_options: SendOptions,
}

impl TransactionExecutor {
    /// Creates an executor.
    #[must_use]
    pub fn new(
        transport: Arc<dyn LedgerTransport>,
        classifier: ErrorClassifier,
        send_options: SendOptions,
    ) -> Self {
        Self {
            transport,
            classifier,
            send_options,
        }
    }

    /// Executes `instruction`, paid and signed by `payer`, co-signed by `signers`.
    #[instrument(
        skip(self, instruction, payer, signers),
        fields(correlation_id = %Uuid::new_v4(), program = %instruction.program_id)
    )]
    pub async fn execute(
        &self,
        instruction: Instruction,
        payer: &Keypair,
        signers: &[Keypair],
        mode: ExecutionMode,
    ) -> Result<ExecutionReport, ContractError> {
        let mut all_signers: Vec<&Keypair> = Vec::with_capacity(1 + signers.len());
        all_signers.push(payer);
        all_signers.extend(signers);
        let tx = Transaction::new_signed(vec![instruction], &all_signers)?;

        let mut state = ExecutorState::Idle;
        advance(&mut state, ExecutorState::Submitting);

        match mode {
            ExecutionMode::Simulate => self.simulate(&tx, &mut state).await,
            ExecutionMode::Send => self.send(&tx, &mut state).await,
        }
    }

    async fn simulate(
        &self,
        tx: &Transaction,
        state: &mut ExecutorState,
    ) -> Result<ExecutionReport, ContractError> {
        let simulation = self.transport.simulate(tx).await?;
        let scan = LogScanner::scan(&simulation.logs);

        if let Some(err) = simulation.err {
            advance(state, ExecutorState::Failed);
            debug!(error = %err, "simulation reported failure");
            advance(state, ExecutorState::Diagnosed);
            return Err(self.classifier.classify_scan(&scan, &simulation.logs).into());
        }

        advance(state, ExecutorState::Confirmed);
        Ok(ExecutionReport {
            compute_units_used: scan.compute_units_used,
            logs: simulation.logs,
            scan,
            signature: None,
            state: *state,
        })
    }

    async fn send(
        &self,
        tx: &Transaction,
        state: &mut ExecutorState,
    ) -> Result<ExecutionReport, ContractError> {
        let signature = match self.transport.send_and_confirm(tx, &self.send_options).await {
            Ok(signature) => signature,
            Err(send_err) => {
                advance(state, ExecutorState::Failed);
                return Err(self.diagnose(tx, send_err, state).await);
            }
        };

        advance(state, ExecutorState::Confirmed);
        let confirmed = self.transport.confirmed_logs(&signature).await?;
        let scan = LogScanner::scan(&confirmed.logs);
        let compute_units_used = if scan.compute_units_used > 0 {
            scan.compute_units_used
        } else {
            confirmed.compute_units_consumed.unwrap_or(0)
        };

        info!(%signature, compute_units_used, "transaction confirmed");
        Ok(ExecutionReport {
            logs: confirmed.logs,
            scan,
            compute_units_used,
            signature: Some(signature),
            state: *state,
        })
    }

    async fn diagnose(
        &self,
        tx: &Transaction,
        send_err: TransportError,
        state: &mut ExecutorState,
    ) -> ContractError {
        warn!(error = %send_err, "send failed, resimulating for diagnostics");
        advance(state, ExecutorState::Resimulating);

        let simulation = match self.transport.simulate(tx).await {
            Ok(simulation) => simulation,
            Err(sim_err) => {
                warn!(error = %sim_err, "diagnostic simulation failed");
                return send_err.into();
            }
        };

        if simulation.err.is_none() {
            warn!("diagnostic simulation succeeded, reporting the send error");
            return send_err.into();
        }

        advance(state, ExecutorState::Diagnosed);
        let scan = LogScanner::scan(&simulation.logs);
        self.classifier
            .classify_scan(&scan, &simulation.logs)
            .into()
    }
}

fn advance(state: &mut ExecutorState, next: ExecutorState) {
    debug!(from = %state, to = %next, "executor state");
    *state = next;
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{InMemoryLedger, ProgramOutcome};
    use crate::codec::eth::encode_revert;
    use shared_types::Pubkey;

    fn instruction(program_id: Pubkey) -> Instruction {
        Instruction {
            program_id,
            accounts: Vec::new(),
            data: vec![1, 2, 3],
        }
    }

    fn executor(ledger: Arc<InMemoryLedger>) -> TransactionExecutor {
        TransactionExecutor::new(ledger, ErrorClassifier::default(), SendOptions::default())
    }

    #[tokio::test]
    async fn test_simulate_success() {
        let ledger = Arc::new(InMemoryLedger::new());
        let program = Pubkey::new_unique();
        ledger.register_program(program, |_| {
            ProgramOutcome::success(900).with_return(vec![7, 7])
        });

        let report = executor(ledger.clone())
            .execute(instruction(program), &Keypair::generate(), &[], ExecutionMode::Simulate)
            .await
            .unwrap();

        assert_eq!(report.return_data(), Some(&[7u8, 7][..]));
        assert_eq!(report.compute_units_used, 900);
        assert!(report.signature.is_none());
        assert_eq!(report.state, ExecutorState::Confirmed);
        assert_eq!(ledger.submitted_count(), 0);
    }

    #[tokio::test]
    async fn test_send_success_fetches_confirmed_logs() {
        let ledger = Arc::new(InMemoryLedger::new());
        let program = Pubkey::new_unique();
        ledger.register_program(program, |_| ProgramOutcome::success(1200).with_log("done"));

        let report = executor(ledger.clone())
            .execute(instruction(program), &Keypair::generate(), &[], ExecutionMode::Send)
            .await
            .unwrap();

        assert!(report.signature.is_some());
        assert_eq!(report.compute_units_used, 1200);
        assert_eq!(report.scan.log.as_deref(), Some("done"));
        assert_eq!(ledger.submitted_count(), 1);
        assert_eq!(ledger.simulated_count(), 0);
    }

    #[tokio::test]
    async fn test_send_failure_resimulates_once() {
        let ledger = Arc::new(InMemoryLedger::new());
        let program = Pubkey::new_unique();
        ledger.register_program(program, |_| {
            ProgramOutcome::failure(1023, "custom program error: 0x0")
                .with_return(encode_revert("Do the revert thing").unwrap_or_default())
        });

        let err = executor(ledger.clone())
            .execute(instruction(program), &Keypair::generate(), &[], ExecutionMode::Send)
            .await
            .unwrap_err();

        let ContractError::Execution(err) = err else {
            panic!("expected execution error, got {err:?}");
        };
        assert_eq!(err.message, "Do the revert thing");
        assert_eq!(err.compute_units_used, 1023);
        assert_eq!(ledger.submitted_count(), 1);
        assert_eq!(ledger.simulated_count(), 1);
    }

    #[tokio::test]
    async fn test_send_failure_with_clean_simulation_surfaces_transport_error() {
        let ledger = Arc::new(InMemoryLedger::new());
        let program = Pubkey::new_unique();
        ledger.register_program(program, |_| ProgramOutcome::success(10));
        ledger.fail_next_send(TransportError::Unavailable("node down".to_string()));

        let err = executor(ledger.clone())
            .execute(instruction(program), &Keypair::generate(), &[], ExecutionMode::Send)
            .await
            .unwrap_err();

        assert_eq!(
            err,
            ContractError::Transport(TransportError::Unavailable("node down".to_string()))
        );
        assert_eq!(ledger.simulated_count(), 1);
    }

    #[tokio::test]
    async fn test_simulation_failure_is_classified() {
        let ledger = Arc::new(InMemoryLedger::new());
        let program = Pubkey::new_unique();
        ledger.register_program(program, |_| {
            ProgramOutcome::failure(1438, "custom program error: 0x0")
                .with_log("denominator should not be zero")
        });

        let err = executor(ledger)
            .execute(instruction(program), &Keypair::generate(), &[], ExecutionMode::Simulate)
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "denominator should not be zero");
    }

    #[tokio::test]
    async fn test_unknown_program_reports_failure_reason() {
        let ledger = Arc::new(InMemoryLedger::new());
        let err = executor(ledger)
            .execute(
                instruction(Pubkey::new_unique()),
                &Keypair::generate(),
                &[],
                ExecutionMode::Simulate,
            )
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "program not found");
    }
}
