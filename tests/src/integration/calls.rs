//! # Contract Call Tests
//!
//! ```text
//! Contract::call ──▶ Program (in-memory ledger) ──▶ logs
//!                                                    │
//!        ┌────────────── success ◀──────────────────┤
//!        │                                           │
//!   decoded result                          failure: resimulate
//!                                                    │
//!                                            ErrorClassifier
//! ```
//!
//! ## Test Categories
//!
//! 1. **Return values**: simulated view calls, sent calls, tuples
//! 2. **Failures**: revert reasons, log diagnostics, runtime aborts
//! 3. **Recovery**: resimulation after a failed send
//! 4. **Accounts**: derived addresses and account ordering

#[cfg(test)]
mod tests {
    use crate::integration::fixtures::{
        b64, Harness, SolangProgram, REVERT_RETURN_B64, SOLANA_RETURN_B64,
    };
    use abi_bridge::codec::{BorshCodec, Encoding, TypeCodec};
    use abi_bridge::config::BridgeConfig;
    use abi_bridge::adapters::ProgramOutcome;
    use abi_bridge::domain::abi::AbiType;
    use abi_bridge::domain::entities::CallOptions;
    use abi_bridge::domain::services::find_program_address;
    use abi_bridge::domain::value_objects::AbiValue;
    use abi_bridge::errors::{ContractError, ExecutionError, TransportError};
    use abi_bridge::service::DeployOptions;
    use shared_types::{AccountMeta, Keypair, Pubkey};

    const NAMED_ABI: &str = r#"[
        {"type":"constructor","inputs":[],"stateMutability":"nonpayable"},
        {"type":"function","name":"name","inputs":[],
         "outputs":[{"name":"","type":"string"}],"stateMutability":"view"}
    ]"#;

    const ERRORS_ABI: &str = r#"[
        {"type":"function","name":"do_revert","inputs":[{"name":"yes","type":"bool"}],
         "outputs":[{"name":"","type":"int64"}],"stateMutability":"nonpayable"},
        {"type":"function","name":"divide","inputs":[{"name":"a","type":"uint64"},{"name":"b","type":"uint64"}],
         "outputs":[{"name":"","type":"uint64"}],"stateMutability":"pure"},
        {"type":"function","name":"trap","inputs":[],"outputs":[],"stateMutability":"nonpayable"}
    ]"#;

    const TOKEN_ABI: &str = r#"[
        {"type":"constructor","inputs":[{"name":"supply","type":"uint256"}]},
        {"type":"function","name":"balanceOf","inputs":[{"name":"owner","type":"address"}],
         "outputs":[{"name":"","type":"uint256"}],"stateMutability":"view"},
        {"type":"function","name":"split","inputs":[{"name":"x","type":"int128"}],
         "outputs":[{"name":"neg","type":"int128"},{"name":"label","type":"string"}],"stateMutability":"pure"},
        {"type":"function","name":"spawn","inputs":[],"outputs":[],"stateMutability":"nonpayable"}
    ]"#;

    fn eth_config() -> BridgeConfig {
        BridgeConfig {
            encoding: Encoding::EthAbi,
            ..BridgeConfig::default()
        }
    }

    fn execution_error(err: ContractError) -> ExecutionError {
        match err {
            ContractError::Execution(err) => err,
            other => panic!("expected an execution error, got {other:?}"),
        }
    }

    fn errors_program() -> SolangProgram {
        SolangProgram::new()
            .on_call("do_revert(bool)", |_| {
                ProgramOutcome::failure(1023, "custom program error: 0x0")
                    .with_return(b64(REVERT_RETURN_B64))
            })
            .on_call("divide(uint64,uint64)", |_| {
                ProgramOutcome::failure(1438, "custom program error: 0x0")
                    .with_log("denominator should not be zero")
            })
            .on_call("trap()", |_| {
                ProgramOutcome::failure(12, "Program failed to complete")
                    .with_line("Program failed to complete: divide by zero at instruction 8")
            })
    }

    // =========================================================================
    // RETURN VALUES
    // =========================================================================

    #[tokio::test]
    async fn test_view_call_returns_solana() {
        let solang = SolangProgram::new().on_call("name()", |_| {
            ProgramOutcome::success(837).with_return(b64(SOLANA_RETURN_B64))
        });
        let harness = Harness::new(solang, eth_config());
        let contract = harness
            .program
            .contract(NAMED_ABI, Pubkey::new_unique())
            .unwrap();

        let result = contract
            .call("name", &[], CallOptions::default())
            .await
            .unwrap();

        assert_eq!(result.result, Some(AbiValue::from("Solana")));
        assert!(result.compute_units_used > 0);
        assert_eq!(result.compute_units_used, 837);
        // view functions never reach send
        assert_eq!(harness.ledger.submitted_count(), 0);
        assert_eq!(harness.ledger.simulated_count(), 1);
    }

    #[tokio::test]
    async fn test_borsh_call_round_trip() {
        let solang = SolangProgram::new()
            .on_call("balanceOf(address)", |payload| {
                // echo the owner's first byte as the balance
                let owner = payload.input.get(4).copied().unwrap_or_default();
                let ret = BorshCodec
                    .encode(&[AbiType::UInt(256)], &[AbiValue::from(u64::from(owner) * 1000)])
                    .unwrap_or_default();
                ProgramOutcome::success(950).with_return(ret)
            })
            .on_call("split(int128)", |_| {
                let ret = BorshCodec
                    .encode(
                        &[AbiType::Int(128), AbiType::String],
                        &[AbiValue::from(-5i128), AbiValue::from("neg")],
                    )
                    .unwrap_or_default();
                ProgramOutcome::success(700).with_return(ret)
            });
        let harness = Harness::new(solang, BridgeConfig::default());
        let contract = harness
            .program
            .contract(TOKEN_ABI, Pubkey::new_unique())
            .unwrap();

        let balance = contract
            .call(
                "balanceOf",
                &[AbiValue::Address(Pubkey::new([7; 32]))],
                CallOptions::default(),
            )
            .await
            .unwrap();
        assert_eq!(balance.result, Some(AbiValue::from(7000u64)));

        let split = contract
            .call("split", &[AbiValue::from(5i128)], CallOptions::default())
            .await
            .unwrap();
        assert_eq!(
            split.result,
            Some(AbiValue::Tuple(vec![AbiValue::from(-5i128), AbiValue::from("neg")]))
        );
    }

    #[tokio::test]
    async fn test_deploy_then_call() {
        let solang = SolangProgram::new()
            .on_deploy(|payload| ProgramOutcome::success(4000).with_log("constructed"))
            .on_call("name()", |_| {
                ProgramOutcome::success(837).with_return(b64(SOLANA_RETURN_B64))
            });
        let harness = Harness::new(solang, eth_config());
        let storage = Pubkey::new_unique();

        let deployed = harness
            .program
            .deploy_contract(DeployOptions {
                name: "Named".to_string(),
                abi: NAMED_ABI.to_string(),
                constructor_args: Vec::new(),
                storage,
                options: CallOptions::default(),
            })
            .await
            .unwrap();

        assert_eq!(deployed.compute_units_used, 4000);
        assert!(deployed.logs.contains(&"Program log: constructed".to_string()));

        let result = deployed
            .contract
            .call("name()", &[], CallOptions::default())
            .await
            .unwrap();
        assert_eq!(result.result, Some(AbiValue::from("Solana")));
    }

    // =========================================================================
    // FAILURES
    // =========================================================================

    #[tokio::test]
    async fn test_revert_reason_after_failed_send() {
        let harness = Harness::new(errors_program(), eth_config());
        let contract = harness
            .program
            .contract(ERRORS_ABI, Pubkey::new_unique())
            .unwrap();

        let err = contract
            .call("do_revert", &[AbiValue::Bool(true)], CallOptions::default())
            .await
            .unwrap_err();

        let err = execution_error(err);
        assert_eq!(err.message, "Do the revert thing");
        assert!(err.compute_units_used > 0);
        assert_eq!(err.compute_units_used, 1023);
        assert!(!err.logs.is_empty());
        // one failed send, one diagnostic simulation, no retry
        assert_eq!(harness.ledger.submitted_count(), 1);
        assert_eq!(harness.ledger.simulated_count(), 1);
    }

    #[tokio::test]
    async fn test_revert_reason_when_simulated() {
        let harness = Harness::new(errors_program(), eth_config());
        let contract = harness
            .program
            .contract(ERRORS_ABI, Pubkey::new_unique())
            .unwrap();

        let err = contract
            .call(
                "do_revert",
                &[AbiValue::Bool(true)],
                CallOptions::default().simulated(),
            )
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Do the revert thing");
        assert_eq!(harness.ledger.submitted_count(), 0);
    }

    #[tokio::test]
    async fn test_log_line_is_the_error() {
        let harness = Harness::new(errors_program(), eth_config());
        let contract = harness
            .program
            .contract(ERRORS_ABI, Pubkey::new_unique())
            .unwrap();

        let err = contract
            .call(
                "divide",
                &[AbiValue::from(1u64), AbiValue::from(0u64)],
                CallOptions::default(),
            )
            .await
            .unwrap_err();

        let err = execution_error(err);
        assert_eq!(err.message, "denominator should not be zero");
        assert_eq!(err.compute_units_used, 1438);
    }

    #[tokio::test]
    async fn test_runtime_abort_is_the_error() {
        let harness = Harness::new(errors_program(), eth_config());
        let contract = harness
            .program
            .contract(ERRORS_ABI, Pubkey::new_unique())
            .unwrap();

        let err = contract
            .call("trap", &[], CallOptions::default())
            .await
            .unwrap_err();

        assert_eq!(
            execution_error(err).message,
            "divide by zero at instruction 8"
        );
    }

    #[tokio::test]
    async fn test_unknown_function_reports_failure_log() {
        // the ABI declares a function the program does not implement
        let harness = Harness::new(SolangProgram::new(), eth_config());
        let contract = harness
            .program
            .contract(ERRORS_ABI, Pubkey::new_unique())
            .unwrap();

        let err = contract
            .call("trap", &[], CallOptions::default())
            .await
            .unwrap_err();
        assert_eq!(execution_error(err).message, "function not found");
    }

    // =========================================================================
    // RECOVERY
    // =========================================================================

    #[tokio::test]
    async fn test_clean_resimulation_surfaces_transport_error() {
        let solang = SolangProgram::new().on_call("trap()", |_| ProgramOutcome::success(10));
        let harness = Harness::new(solang, eth_config());
        let contract = harness
            .program
            .contract(ERRORS_ABI, Pubkey::new_unique())
            .unwrap();
        harness
            .ledger
            .fail_next_send(TransportError::Unavailable("blockhash expired".to_string()));

        let err = contract
            .call("trap", &[], CallOptions::default())
            .await
            .unwrap_err();

        assert_eq!(
            err,
            ContractError::Transport(TransportError::Unavailable("blockhash expired".to_string()))
        );
        assert_eq!(harness.ledger.submitted_count(), 1);
        assert_eq!(harness.ledger.simulated_count(), 1);
    }

    // =========================================================================
    // ACCOUNTS
    // =========================================================================

    #[tokio::test]
    async fn test_derived_addresses_and_signers() {
        let solang = SolangProgram::new().on_call("spawn()", |payload| {
            if payload.seeds.len() == 1 {
                ProgramOutcome::success(2500)
            } else {
                ProgramOutcome::failure(10, "custom program error: 0x0").with_log("missing seed")
            }
        });
        let harness = Harness::new(solang, BridgeConfig::default());
        let storage = Pubkey::new_unique();
        let contract = harness.program.contract(TOKEN_ABI, storage).unwrap();

        let pda = find_program_address(b"child", &harness.program.program_id()).unwrap();
        let extra_signer = Keypair::generate();
        let readonly = Pubkey::new_unique();
        let options = CallOptions::default()
            .with_program_derived_address(pda.clone())
            .with_account(readonly)
            .with_signer(extra_signer.clone());

        contract.call("spawn", &[], options).await.unwrap();

        let tx = harness.ledger.last_submitted().unwrap();
        assert_eq!(
            tx.message.instructions[0].accounts,
            vec![
                AccountMeta::writable(pda.account),
                AccountMeta::writable(storage),
                AccountMeta::readonly(readonly),
            ]
        );
        let payer = harness.program.payer().unwrap().pubkey();
        assert_eq!(tx.message.payer, payer);
        assert_eq!(tx.signatures.len(), 2);
        assert_eq!(tx.signatures[1].0, extra_signer.pubkey());
    }
}
