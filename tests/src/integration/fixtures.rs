//! # Test Fixtures
//!
//! A Solang-style program emulator for the in-memory ledger. It decodes the
//! instruction payload the bridge builds, routes on the constructor or
//! function selector, and answers with scripted log output.

use abi_bridge::adapters::{InMemoryLedger, ProgramOutcome};
use abi_bridge::config::BridgeConfig;
use abi_bridge::domain::services::function_selector;
use abi_bridge::domain::value_objects::Selector;
use abi_bridge::instruction::{CALL_SELECTOR, HEADER_LEN};
use abi_bridge::service::Program;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bridge_telemetry::{init_tracing, TelemetryConfig};
use shared_types::{Keypair, Pubkey};
use std::collections::HashMap;
use std::sync::Arc;

/// ABI return of `string "Solana"`, as logged by a real node.
pub const SOLANA_RETURN_B64: &str = "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAACAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAABlNvbGFuYQAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";

/// `Error("Do the revert thing")`, as logged by a real node.
pub const REVERT_RETURN_B64: &str = "CMN5oAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAgAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAABNEbyB0aGUgcmV2ZXJ0IHRoaW5nAAAAAAAAAAAAAAAAAA==";

/// `Second(int256 indexed a, bytes4 b, bytes c)` with a = 500332.
pub const SECOND_EVENT_LINE: &str = "Program data: PUBqMYpHInIBMuX3TXZKuYGHwf1juv3K+2eNQrEUqo4AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAeibA== QUJDRAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAQAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAEyv4BIwAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA=";

/// Decodes one of the base64 constants above.
#[must_use]
pub fn b64(data: &str) -> Vec<u8> {
    STANDARD.decode(data).unwrap_or_default()
}

/// Installs a tracing subscriber once per process; later calls are no-ops.
pub fn init_logging() {
    let _ = init_tracing(&TelemetryConfig::for_component("tests"));
}

// =============================================================================
// PAYLOAD DECODING
// =============================================================================

/// The fields of a bridge instruction payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    /// Storage account.
    pub storage: Pubkey,
    /// Caller.
    pub caller: Pubkey,
    /// Transferred value.
    pub value: u64,
    /// Header selector: contract-name hash on deploy, zero on call.
    pub selector: Selector,
    /// Derived-address seeds.
    pub seeds: Vec<Vec<u8>>,
    /// Constructor args, or function selector followed by args.
    pub input: Vec<u8>,
}

impl Payload {
    /// Splits an instruction payload into its fields.
    #[must_use]
    pub fn parse(data: &[u8]) -> Option<Self> {
        let header = data.get(..HEADER_LEN)?;
        let storage = Pubkey::try_from_slice(&header[..32]).ok()?;
        let caller = Pubkey::try_from_slice(&header[32..64]).ok()?;
        let value = u64::from_le_bytes(header[64..72].try_into().ok()?);
        let selector: Selector = header[72..76].try_into().ok()?;

        let mut at = HEADER_LEN;
        let count = *data.get(at)?;
        at += 1;
        let mut seeds = Vec::with_capacity(usize::from(count));
        for _ in 0..count {
            let len = usize::from(*data.get(at)?);
            at += 1;
            seeds.push(data.get(at..at + len)?.to_vec());
            at += len;
        }

        Some(Self {
            storage,
            caller,
            value,
            selector,
            seeds,
            input: data.get(at..)?.to_vec(),
        })
    }
}

// =============================================================================
// PROGRAM EMULATOR
// =============================================================================

type Handler = Arc<dyn Fn(&Payload) -> ProgramOutcome + Send + Sync>;

/// Routes payloads to scripted handlers.
#[derive(Default, Clone)]
pub struct SolangProgram {
    constructor: Option<Handler>,
    functions: HashMap<Selector, Handler>,
}

impl SolangProgram {
    /// Empty program: deploys succeed, every call fails.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts the constructor.
    #[must_use]
    pub fn on_deploy<F>(mut self, handler: F) -> Self
    where
        F: Fn(&Payload) -> ProgramOutcome + Send + Sync + 'static,
    {
        self.constructor = Some(Arc::new(handler));
        self
    }

    /// Scripts the function with canonical `signature`.
    #[must_use]
    pub fn on_call<F>(mut self, signature: &str, handler: F) -> Self
    where
        F: Fn(&Payload) -> ProgramOutcome + Send + Sync + 'static,
    {
        self.functions
            .insert(function_selector(signature), Arc::new(handler));
        self
    }

    fn run(&self, payload: &Payload) -> ProgramOutcome {
        if payload.selector != CALL_SELECTOR {
            return match &self.constructor {
                Some(handler) => handler(payload),
                None => ProgramOutcome::success(300),
            };
        }

        let handler = payload
            .input
            .get(..4)
            .and_then(|s| <Selector>::try_from(s).ok())
            .and_then(|selector| self.functions.get(&selector));
        match handler {
            Some(handler) => handler(payload),
            None => ProgramOutcome::failure(200, "custom program error: 0x0")
                .with_log("function not found"),
        }
    }

    /// Installs the program at `program_id`.
    pub fn install(self, ledger: &InMemoryLedger, program_id: Pubkey) {
        ledger.register_program(program_id, move |ix| match Payload::parse(&ix.data) {
            Some(payload) => self.run(&payload),
            None => ProgramOutcome::failure(0, "invalid instruction data"),
        });
    }
}

// =============================================================================
// HARNESS
// =============================================================================

/// A ledger with one installed program and a funded connection to it.
pub struct Harness {
    /// The ledger.
    pub ledger: Arc<InMemoryLedger>,
    /// Connection to the installed program.
    pub program: Arc<Program>,
}

impl Harness {
    /// Installs `solang` and connects to it with `config`.
    #[must_use]
    pub fn new(solang: SolangProgram, config: BridgeConfig) -> Self {
        init_logging();
        let ledger = Arc::new(InMemoryLedger::new());
        let program_id = Pubkey::new_unique();
        solang.install(&ledger, program_id);
        let program = Arc::new(Program::new(
            ledger.clone(),
            program_id,
            Some(Keypair::generate()),
            config,
        ));
        Self { ledger, program }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use abi_bridge::codec::BorshCodec;
    use abi_bridge::domain::entities::CallOptions;
    use abi_bridge::instruction::InstructionBuilder;

    #[test]
    fn test_payload_parse_reverses_builder() {
        let storage = Pubkey::new_unique();
        let caller = Pubkey::new_unique();
        let built = InstructionBuilder::new(storage, &BorshCodec)
            .deploy("Flipper", &[], &[], caller, &CallOptions::default().with_value(9))
            .unwrap();

        let payload = Payload::parse(&built.data).unwrap();
        assert_eq!(payload.storage, storage);
        assert_eq!(payload.caller, caller);
        assert_eq!(payload.value, 9);
        assert!(payload.seeds.is_empty());
        assert!(payload.input.is_empty());
    }

    #[test]
    fn test_sample_constants_decode() {
        assert_eq!(b64(SOLANA_RETURN_B64).len(), 96);
        assert_eq!(&b64(REVERT_RETURN_B64)[..4], &[0x08, 0xc3, 0x79, 0xa0]);
    }
}
