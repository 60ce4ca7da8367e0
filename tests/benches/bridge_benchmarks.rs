//! # ABI Bridge Benchmarks
//!
//! | Area | Operation |
//! |------|-----------|
//! | Codec | Borsh and Ethereum ABI encode/decode of a mixed argument list |
//! | Logs | Scanning a transaction's log output |
//! | Events | Decoding a `Program data:` line against an interface |

use abi_bridge::codec::{BorshCodec, EthAbiCodec, TypeCodec};
use abi_bridge::domain::abi::{AbiType, Interface};
use abi_bridge::domain::value_objects::AbiValue;
use abi_bridge::logs::{parse_log_topic, LogScanner};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use shared_types::Pubkey;
use std::time::Duration;

const SECOND_EVENT_LINE: &str = "Program data: PUBqMYpHInIBMuX3TXZKuYGHwf1juv3K+2eNQrEUqo4AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAeibA== QUJDRAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAQAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAEyv4BIwAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA=";

const SECOND_ABI: &str = r#"[{"type":"event","name":"Second","anonymous":false,"inputs":[
    {"name":"a","type":"int256","indexed":true},
    {"name":"b","type":"bytes4","indexed":false},
    {"name":"c","type":"bytes","indexed":false}]}]"#;

fn mixed_arguments() -> (Vec<AbiType>, Vec<AbiValue>) {
    let types = vec![
        AbiType::UInt(256),
        AbiType::Int(64),
        AbiType::Bool,
        AbiType::String,
        AbiType::Address,
        AbiType::Array(Box::new(AbiType::UInt(32)), None),
    ];
    let values = vec![
        AbiValue::from(u128::MAX),
        AbiValue::from(-42i64),
        AbiValue::Bool(true),
        AbiValue::from("benchmark payload"),
        AbiValue::Address(Pubkey::new([3; 32])),
        AbiValue::Array((0u32..16).map(AbiValue::from).collect()),
    ];
    (types, values)
}

fn transaction_logs(log_lines: usize) -> Vec<String> {
    let program = "9cgeQC4fKNtL4vAk59UBjJwyAgXocDVwZCcnNq5gHrqk";
    let mut logs = vec![format!("Program {program} invoke [1]")];
    for i in 0..log_lines {
        logs.push(format!("Program log: step {i}"));
        logs.push(SECOND_EVENT_LINE.to_string());
    }
    logs.push(format!("Program {program} consumed 1438 of 200000 compute units"));
    logs.push(format!("Program return: {program} AAAAAAAAAAA="));
    logs.push(format!("Program {program} success"));
    logs
}

// ============================================================================
// CODEC
// ============================================================================

fn bench_codecs(c: &mut Criterion) {
    let mut group = c.benchmark_group("codec");
    group.measurement_time(Duration::from_secs(5));

    let (types, values) = mixed_arguments();
    let codecs: [(&str, &dyn TypeCodec); 2] = [("borsh", &BorshCodec), ("ethabi", &EthAbiCodec)];

    for (name, codec) in codecs {
        let Ok(encoded) = codec.encode(&types, &values) else {
            continue;
        };
        group.throughput(Throughput::Bytes(encoded.len() as u64));

        group.bench_function(BenchmarkId::new("encode", name), |b| {
            b.iter(|| black_box(codec.encode(black_box(&types), black_box(&values))))
        });
        group.bench_function(BenchmarkId::new("decode", name), |b| {
            b.iter(|| black_box(codec.decode(black_box(&types), black_box(&encoded))))
        });
    }

    group.finish();
}

// ============================================================================
// LOGS
// ============================================================================

fn bench_log_scanner(c: &mut Criterion) {
    let mut group = c.benchmark_group("log-scanner");

    for size in [1usize, 16, 128] {
        let logs = transaction_logs(size);
        group.throughput(Throughput::Elements(logs.len() as u64));
        group.bench_with_input(BenchmarkId::new("scan", size), &logs, |b, logs| {
            b.iter(|| black_box(LogScanner::scan(black_box(logs))))
        });
    }

    group.finish();
}

// ============================================================================
// EVENTS
// ============================================================================

fn bench_event_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("events");
    let Ok(interface) = Interface::from_json(SECOND_ABI) else {
        return;
    };

    group.bench_function("parse_and_decode_second", |b| {
        b.iter(|| {
            parse_log_topic(black_box(SECOND_EVENT_LINE))
                .map(|event| interface.decode_event(&event, &EthAbiCodec))
        })
    });

    group.finish();
}

criterion_group!(benches, bench_codecs, bench_log_scanner, bench_event_decode);
criterion_main!(benches);
