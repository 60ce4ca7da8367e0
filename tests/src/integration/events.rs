//! # Event Delivery Tests
//!
//! Listeners registered through a contract receive events and log text from
//! sent transactions. The ledger subscription opens with the first listener
//! and closes exactly once when the last one goes.

#[cfg(test)]
mod tests {
    use crate::integration::fixtures::{Harness, SolangProgram, SECOND_EVENT_LINE};
    use abi_bridge::adapters::ProgramOutcome;
    use abi_bridge::config::BridgeConfig;
    use abi_bridge::dispatcher::{EventCallback, LogCallback};
    use abi_bridge::domain::entities::{CallOptions, DecodedEvent};
    use abi_bridge::domain::value_objects::AbiValue;
    use abi_bridge::errors::DispatchError;
    use abi_bridge::ports::inbound::ContractApi;
    use abi_bridge::service::Contract;
    use shared_types::Pubkey;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::mpsc;
    use tokio::time::timeout;

    const EMITTER_ABI: &str = r#"[
        {"type":"event","name":"First","anonymous":false,"inputs":[
            {"name":"a","type":"int32","indexed":true},
            {"name":"b","type":"bool","indexed":false}]},
        {"type":"event","name":"Second","anonymous":false,"inputs":[
            {"name":"a","type":"int256","indexed":true},
            {"name":"b","type":"bytes4","indexed":false},
            {"name":"c","type":"bytes","indexed":false}]},
        {"type":"function","name":"emitSecond","inputs":[],"outputs":[],"stateMutability":"nonpayable"},
        {"type":"function","name":"fail","inputs":[],"outputs":[],"stateMutability":"nonpayable"}
    ]"#;

    const WAIT: Duration = Duration::from_secs(2);

    fn emitter() -> (Harness, Contract) {
        let solang = SolangProgram::new()
            .on_call("emitSecond()", |_| {
                ProgramOutcome::success(1200)
                    .with_log("emitting")
                    .with_line(SECOND_EVENT_LINE)
            })
            .on_call("fail()", |_| {
                ProgramOutcome::failure(90, "custom program error: 0x0")
                    .with_line(SECOND_EVENT_LINE)
                    .with_log("gave up")
            });
        let harness = Harness::new(solang, BridgeConfig::default());
        let contract = harness
            .program
            .contract(EMITTER_ABI, Pubkey::new_unique())
            .unwrap();
        (harness, contract)
    }

    fn event_channel() -> (EventCallback, mpsc::UnboundedReceiver<DecodedEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let callback: EventCallback = Arc::new(move |event: &DecodedEvent| {
            let _ = tx.send(event.clone());
        });
        (callback, rx)
    }

    fn log_channel() -> (LogCallback, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let callback: LogCallback = Arc::new(move |text: &str| {
            let _ = tx.send(text.to_string());
        });
        (callback, rx)
    }

    fn assert_second_sample(event: &DecodedEvent) {
        assert_eq!(event.name, "Second");
        assert_eq!(event.arg("a"), Some(&AbiValue::from(500_332i64)));
        assert_eq!(event.arg("b"), Some(&AbiValue::FixedBytes(b"ABCD".to_vec())));
        assert_eq!(
            event.arg("c"),
            Some(&AbiValue::Bytes(vec![0xca, 0xfe, 0x01, 0x23]))
        );
    }

    // =========================================================================
    // DELIVERY
    // =========================================================================

    #[tokio::test]
    async fn test_only_matching_listener_fires() {
        let (_harness, contract) = emitter();
        // registered first so it sees every batch before the matching one
        let (first_cb, mut first_rx) = event_channel();
        let (second_cb, mut second_rx) = event_channel();
        contract
            .add_event_listener(Some("First"), first_cb)
            .await
            .unwrap();
        contract
            .add_event_listener(Some("Second"), second_cb)
            .await
            .unwrap();

        contract
            .call("emitSecond", &[], CallOptions::default())
            .await
            .unwrap();

        let event = timeout(WAIT, second_rx.recv()).await.unwrap().unwrap();
        assert_second_sample(&event);
        assert!(first_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_call_result_carries_events() {
        let (_harness, contract) = emitter();

        let result = contract
            .call("emitSecond", &[], CallOptions::default())
            .await
            .unwrap();

        assert_eq!(result.events.len(), 1);
        assert_second_sample(&result.events[0]);
        assert!(result.signature.is_some());
        assert_eq!(contract.parse_logs_events(&result.logs), result.events);
    }

    #[tokio::test]
    async fn test_log_listener_receives_text() {
        let (_harness, contract) = emitter();
        let (callback, mut rx) = log_channel();
        contract.add_log_listener(callback).await.unwrap();

        contract
            .call("emitSecond", &[], CallOptions::default())
            .await
            .unwrap();

        let text = timeout(WAIT, rx.recv()).await.unwrap().unwrap();
        assert_eq!(text, "emitting");
    }

    #[tokio::test]
    async fn test_failed_transaction_not_delivered() {
        let (_harness, contract) = emitter();
        let (fail_cb, mut fail_rx) = event_channel();
        let (ok_cb, mut ok_rx) = event_channel();
        contract.add_event_listener(None, fail_cb).await.unwrap();

        contract
            .call("fail", &[], CallOptions::default())
            .await
            .unwrap_err();

        // batches are delivered in order, so once the next success arrives
        // the failed one has already been skipped
        contract.add_event_listener(None, ok_cb).await.unwrap();
        contract
            .call("emitSecond", &[], CallOptions::default())
            .await
            .unwrap();
        timeout(WAIT, ok_rx.recv()).await.unwrap().unwrap();

        let first = fail_rx.try_recv().unwrap();
        assert_second_sample(&first);
        assert!(fail_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_unknown_event_name_rejected() {
        let (harness, contract) = emitter();
        let (callback, _rx) = event_channel();

        let err = contract
            .add_event_listener(Some("Third"), callback)
            .await
            .unwrap_err();

        assert_eq!(err, DispatchError::UnknownEvent("Third".to_string()));
        assert_eq!(harness.ledger.subscribe_calls(), 0);
    }

    // =========================================================================
    // SUBSCRIPTION LIFECYCLE
    // =========================================================================

    #[tokio::test]
    async fn test_concurrent_removal_tears_down_once() {
        let (harness, contract) = emitter();
        let dispatcher = harness.program.dispatcher();

        let (a, _a_rx) = event_channel();
        let (b, _b_rx) = event_channel();
        let (c, _c_rx) = log_channel();
        let a = contract.add_event_listener(None, a).await.unwrap();
        let b = contract.add_event_listener(Some("Second"), b).await.unwrap();
        let c = contract.add_log_listener(c).await.unwrap();
        assert_eq!(harness.ledger.subscribe_calls(), 1);
        assert_eq!(dispatcher.listener_count(), 3);

        let (ra, rb, rc) = tokio::join!(
            contract.remove_event_listener(a),
            contract.remove_event_listener(b),
            contract.remove_log_listener(c),
        );
        ra.unwrap();
        rb.unwrap();
        rc.unwrap();

        assert_eq!(dispatcher.teardown_count(), 1);
        assert_eq!(harness.ledger.unsubscribe_calls(), 1);
        assert_eq!(harness.ledger.open_subscriptions(), 0);
        assert!(!dispatcher.is_subscribed().await);
    }

    #[tokio::test]
    async fn test_resubscribe_after_teardown() {
        let (harness, contract) = emitter();
        let (first, _rx) = event_channel();
        let id = contract.add_event_listener(None, first).await.unwrap();
        contract.remove_event_listener(id).await.unwrap();

        let (second, mut rx) = event_channel();
        let next = contract.add_event_listener(None, second).await.unwrap();
        assert!(next > id);
        assert_eq!(harness.ledger.subscribe_calls(), 2);

        contract
            .call("emitSecond", &[], CallOptions::default())
            .await
            .unwrap();
        let event = timeout(WAIT, rx.recv()).await.unwrap().unwrap();
        assert_second_sample(&event);
    }

    #[tokio::test]
    async fn test_removal_checks_listener_kind() {
        let (_harness, contract) = emitter();
        let (callback, _rx) = log_channel();
        let id = contract.add_log_listener(callback).await.unwrap();

        assert_eq!(
            contract.remove_event_listener(id).await,
            Err(DispatchError::UnknownListener(id))
        );
        contract.remove_log_listener(id).await.unwrap();
        assert_eq!(
            contract.remove_log_listener(id).await,
            Err(DispatchError::UnknownListener(id))
        );
    }
}
