//! # Contract Service
//!
//! The façade callers use: a [`Program`] per program connection and a
//! [`Contract`] per deployed instance.
//!
//! ```text
//! Contract::call ─▶ InstructionBuilder ─▶ TransactionExecutor ─▶ LogScanner
//!                                                                  │
//!        CallResult ◀── TypeCodec::decode ◀── return data ◀────────┤
//!        ExecutionError ◀── ErrorClassifier ◀── failure ◀──────────┘
//! ```
//!
//! The program owns the event dispatcher, so every contract bound to the
//! same program shares one log subscription.

use crate::config::BridgeConfig;
use crate::dispatcher::{decode_events, EventCallback, EventDispatcher, LogCallback};
use crate::domain::abi::{FunctionDescriptor, Interface};
use crate::domain::entities::{CallOptions, CallResult, DecodedEvent};
use crate::domain::value_objects::{AbiValue, ListenerId};
use crate::errors::{ContractError, DispatchError};
use crate::executor::{ExecutionMode, ExecutionReport, TransactionExecutor};
use crate::instruction::{BuiltInstruction, InstructionBuilder};
use crate::ports::inbound::ContractApi;
use crate::ports::outbound::LedgerTransport;
use async_trait::async_trait;
use shared_types::{Keypair, Pubkey, Signature};
use std::sync::Arc;
use tracing::{debug, info, instrument};
use uuid::Uuid;

// =============================================================================
// PROGRAM
// =============================================================================

/// A connection to one deployed program.
pub struct Program {
    program_id: Pubkey,
    payer: Option<Keypair>,
    config: BridgeConfig,
    executor: TransactionExecutor,
    dispatcher: EventDispatcher,
}

impl Program {
    /// Connects to `program_id` through `transport`.
    ///
    /// Without a payer only event and log listening is possible.
    #[must_use]
    pub fn new(
        transport: Arc<dyn LedgerTransport>,
        program_id: Pubkey,
        payer: Option<Keypair>,
        config: BridgeConfig,
    ) -> Self {
        let executor = TransactionExecutor::new(
            Arc::clone(&transport),
            config.classifier(),
            config.send_options(),
        );
        let dispatcher =
            EventDispatcher::new(transport, program_id, config.event_encoding.codec());
        Self {
            program_id,
            payer,
            config,
            executor,
            dispatcher,
        }
    }

    /// The program account.
    #[must_use]
    pub fn program_id(&self) -> Pubkey {
        self.program_id
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// The fee payer.
    pub fn payer(&self) -> Result<&Keypair, ContractError> {
        self.payer.as_ref().ok_or(ContractError::MissingPayerAccount)
    }

    /// The program's event dispatcher.
    #[must_use]
    pub fn dispatcher(&self) -> &EventDispatcher {
        &self.dispatcher
    }

    /// Calls `callback` with the text of every `Program log:` line.
    pub async fn add_log_listener(
        &self,
        callback: LogCallback,
    ) -> Result<ListenerId, DispatchError> {
        self.dispatcher.add_log_listener(callback).await
    }

    /// Removes a log listener.
    pub async fn remove_log_listener(&self, id: ListenerId) -> Result<(), DispatchError> {
        self.dispatcher.remove_log_listener(id).await
    }

    /// Calls `callback` with every event `interface` can decode.
    pub async fn add_event_listener(
        &self,
        interface: Arc<Interface>,
        callback: EventCallback,
    ) -> Result<ListenerId, DispatchError> {
        self.dispatcher
            .add_event_listener(interface, None, callback)
            .await
    }

    /// Removes an event listener.
    pub async fn remove_event_listener(&self, id: ListenerId) -> Result<(), DispatchError> {
        self.dispatcher.remove_event_listener(id).await
    }

    /// Binds an already deployed instance.
    pub fn contract(
        self: &Arc<Self>,
        abi_json: &str,
        storage: Pubkey,
    ) -> Result<Contract, ContractError> {
        Contract::get(self, abi_json, storage)
    }

    /// Deploys a new instance.
    pub async fn deploy_contract(
        self: &Arc<Self>,
        options: DeployOptions,
    ) -> Result<DeployResult, ContractError> {
        Contract::deploy(self, options).await
    }

    async fn execute(
        &self,
        built: BuiltInstruction,
        signers: &[Keypair],
        simulate: bool,
    ) -> Result<ExecutionReport, ContractError> {
        let payer = self.payer()?;
        let mode = if simulate {
            ExecutionMode::Simulate
        } else {
            ExecutionMode::Send
        };
        self.executor
            .execute(built.into_instruction(self.program_id), payer, signers, mode)
            .await
    }
}

// =============================================================================
// DEPLOY
// =============================================================================

/// Parameters of a deployment.
#[derive(Debug, Clone)]
pub struct DeployOptions {
    /// Contract name, hashed into the constructor selector.
    pub name: String,
    /// JSON ABI of the contract.
    pub abi: String,
    /// Constructor arguments.
    pub constructor_args: Vec<AbiValue>,
    /// Storage account of the new instance. Must already exist.
    pub storage: Pubkey,
    /// Caller, value, accounts and signers.
    pub options: CallOptions,
}

/// Outcome of a deployment.
pub struct DeployResult {
    /// The new instance.
    pub contract: Contract,
    /// Full log output.
    pub logs: Vec<String>,
    /// Compute units consumed.
    pub compute_units_used: u64,
    /// Events emitted by the constructor.
    pub events: Vec<DecodedEvent>,
    /// Transaction signature, unless simulated.
    pub signature: Option<Signature>,
}

// =============================================================================
// CONTRACT
// =============================================================================

/// One contract instance: a program, a storage account and an interface.
#[derive(Clone)]
pub struct Contract {
    program: Arc<Program>,
    storage: Pubkey,
    interface: Arc<Interface>,
}

impl Contract {
    /// Deploys a new instance into `options.storage`.
    #[instrument(
        skip(program, options),
        fields(correlation_id = %Uuid::new_v4(), contract = %options.name, storage = %options.storage)
    )]
    pub async fn deploy(
        program: &Arc<Program>,
        options: DeployOptions,
    ) -> Result<DeployResult, ContractError> {
        let interface = Arc::new(Interface::from_json(&options.abi)?);
        let caller = match options.options.caller {
            Some(caller) => caller,
            None => program.payer()?.pubkey(),
        };
        let codec = program.config.encoding.codec();

        let built = InstructionBuilder::new(options.storage, codec).deploy(
            &options.name,
            interface.constructor_inputs(),
            &options.constructor_args,
            caller,
            &options.options,
        )?;
        let report = program
            .execute(built, &options.options.signers, options.options.simulate)
            .await?;

        let contract = Self::from_interface(program, interface, options.storage);
        let events = contract.parse_logs_events(&report.logs);
        info!(
            compute_units_used = report.compute_units_used,
            events = events.len(),
            "contract deployed"
        );

        Ok(DeployResult {
            contract,
            logs: report.logs,
            compute_units_used: report.compute_units_used,
            events,
            signature: report.signature,
        })
    }

    /// Binds an already deployed instance from its JSON ABI.
    pub fn get(
        program: &Arc<Program>,
        abi_json: &str,
        storage: Pubkey,
    ) -> Result<Self, ContractError> {
        let interface = Interface::from_json(abi_json)?;
        Ok(Self::from_interface(program, Arc::new(interface), storage))
    }

    /// Binds an already deployed instance from a parsed interface.
    #[must_use]
    pub fn from_interface(program: &Arc<Program>, interface: Arc<Interface>, storage: Pubkey) -> Self {
        Self {
            program: Arc::clone(program),
            storage,
            interface,
        }
    }

    /// The storage account.
    #[must_use]
    pub fn storage(&self) -> Pubkey {
        self.storage
    }

    /// The program this instance runs in.
    #[must_use]
    pub fn program(&self) -> &Arc<Program> {
        &self.program
    }

    /// The parsed interface.
    #[must_use]
    pub fn interface(&self) -> &Arc<Interface> {
        &self.interface
    }

    /// Fails unless `storage` is this instance's storage account.
    pub fn check_storage_account(&self, storage: &Pubkey) -> Result<(), ContractError> {
        if *storage == self.storage {
            Ok(())
        } else {
            Err(ContractError::InvalidStorageAccount {
                expected: self.storage,
                found: *storage,
            })
        }
    }

    /// Fails unless `program` is this instance's program account.
    pub fn check_program_account(&self, program: &Pubkey) -> Result<(), ContractError> {
        let expected = self.program.program_id;
        if *program == expected {
            Ok(())
        } else {
            Err(ContractError::InvalidProgramAccount {
                expected,
                found: *program,
            })
        }
    }

    /// Invokes `function` (bare name or signature) with `args`.
    #[instrument(
        skip(self, args, options),
        fields(correlation_id = %Uuid::new_v4(), storage = %self.storage)
    )]
    pub async fn call(
        &self,
        function: &str,
        args: &[AbiValue],
        options: CallOptions,
    ) -> Result<CallResult, ContractError> {
        if let Some(storage) = &options.storage {
            self.check_storage_account(storage)?;
        }
        if let Some(program) = &options.program {
            self.check_program_account(program)?;
        }

        let descriptor = self.interface.function(function)?;
        let caller = match options.caller {
            Some(caller) => caller,
            None => self.program.payer()?.pubkey(),
        };
        let simulate = options.simulate || descriptor.is_read_only();
        let codec = self.program.config.encoding.codec();

        let built =
            InstructionBuilder::new(self.storage, codec).call(descriptor, args, caller, &options)?;
        let report = self.program.execute(built, &options.signers, simulate).await?;

        let result = self.decode_result(descriptor, &report)?;
        let events = self.parse_logs_events(&report.logs);
        debug!(
            function = %descriptor.signature,
            simulate,
            compute_units_used = report.compute_units_used,
            "call completed"
        );

        Ok(CallResult {
            result,
            logs: report.logs,
            compute_units_used: report.compute_units_used,
            events,
            signature: report.signature,
        })
    }

    /// Decodes this contract's events out of a log sequence.
    #[must_use]
    pub fn parse_logs_events<S: AsRef<str>>(&self, logs: &[S]) -> Vec<DecodedEvent> {
        decode_events(
            &self.interface,
            self.program.config.event_encoding.codec(),
            logs,
        )
    }

    fn decode_result(
        &self,
        descriptor: &FunctionDescriptor,
        report: &ExecutionReport,
    ) -> Result<Option<AbiValue>, ContractError> {
        if descriptor.outputs.is_empty() {
            return Ok(None);
        }
        let data = report
            .return_data()
            .ok_or_else(|| ContractError::MissingReturnData {
                function: descriptor.signature.clone(),
            })?;

        let mut values = self
            .program
            .config
            .encoding
            .codec()
            .decode(&descriptor.output_types(), data)?;
        if values.len() == 1 {
            Ok(values.pop())
        } else {
            Ok(Some(AbiValue::Tuple(values)))
        }
    }
}

#[async_trait]
impl ContractApi for Contract {
    async fn call(
        &self,
        function: &str,
        args: &[AbiValue],
        options: CallOptions,
    ) -> Result<CallResult, ContractError> {
        Contract::call(self, function, args, options).await
    }

    async fn add_event_listener(
        &self,
        event: Option<&str>,
        callback: EventCallback,
    ) -> Result<ListenerId, DispatchError> {
        self.program
            .dispatcher
            .add_event_listener(Arc::clone(&self.interface), event, callback)
            .await
    }

    async fn remove_event_listener(&self, id: ListenerId) -> Result<(), DispatchError> {
        self.program.dispatcher.remove_event_listener(id).await
    }

    async fn add_log_listener(&self, callback: LogCallback) -> Result<ListenerId, DispatchError> {
        self.program.add_log_listener(callback).await
    }

    async fn remove_log_listener(&self, id: ListenerId) -> Result<(), DispatchError> {
        self.program.remove_log_listener(id).await
    }

    fn parse_logs_events(&self, logs: &[String]) -> Vec<DecodedEvent> {
        Contract::parse_logs_events(self, logs)
    }
}

// =============================================================================
// TESTS
// =============================================================================
