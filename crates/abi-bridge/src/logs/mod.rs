//! # Transaction Logs
//!
//! Recognizes the structured lines a program emits during execution.
//!
//! | Line | Meaning |
//! |------|---------|
//! | `Program return: <pubkey> <base64>` | return data |
//! | `Program log: <text>` | diagnostic text |
//! | `Program failed to complete: <text>` | runtime abort reason |
//! | `Program data: <base64 topics> <base64 data>` | event |
//! | `... consumed <n> of <m> compute units` | metering |
//! | `Program <id> failed: <reason>` | ledger-level failure |
//!
//! Prefixes match case-sensitively at the start of the line.

pub mod classifier;
pub mod scanner;

pub use classifier::ErrorClassifier;
pub use scanner::{LogScanner, ScanResult};

use crate::domain::value_objects::{EventData, Topic};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tracing::debug;

/// Prefix of a return-data line.
pub const LOG_RETURN_PREFIX: &str = "Program return: ";
/// Prefix of a diagnostic log line.
pub const LOG_LOG_PREFIX: &str = "Program log: ";
/// Prefix of a runtime abort line.
pub const LOG_FAILED_TO_COMPLETE_PREFIX: &str = "Program failed to complete: ";
/// Prefix of an event line.
pub const LOG_DATA_PREFIX: &str = "Program data: ";

const PROGRAM_PREFIX: &str = "Program ";
const FAILED_MARKER: &str = "failed: ";

/// One recognized log line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogRecord {
    /// Decoded return data.
    Return(Vec<u8>),
    /// Diagnostic text.
    Log(String),
    /// Runtime abort text.
    FailedToComplete(String),
    /// Event payload.
    Event(EventData),
    /// Compute units consumed.
    ComputeUnits(u64),
}

impl LogRecord {
    /// Everything a single line carries.
    ///
    /// Prefixes are mutually exclusive, but a compute-units figure is looked
    /// for on every line, so a `Program log:` line may yield two records.
    #[must_use]
    pub fn parse_all(line: &str) -> Vec<Self> {
        let mut records = Vec::new();
        if let Some(data) = parse_log_return(line) {
            records.push(Self::Return(data));
        }
        if let Some(text) = parse_log_log(line) {
            records.push(Self::Log(text.to_string()));
        }
        if let Some(text) = parse_log_failed_to_complete(line) {
            records.push(Self::FailedToComplete(text.to_string()));
        }
        if let Some(event) = parse_log_topic(line) {
            records.push(Self::Event(event));
        }
        if let Some(units) = parse_log_compute_units(line) {
            records.push(Self::ComputeUnits(units));
        }
        records
    }
}

/// Decodes the base64 payload of a `Program return:` line.
#[must_use]
pub fn parse_log_return(line: &str) -> Option<Vec<u8>> {
    let rest = line.strip_prefix(LOG_RETURN_PREFIX)?;
    let mut fields = rest.split_whitespace();
    let program = fields.next()?;
    STANDARD
        .decode(fields.next()?)
        .map_err(|e| debug!(program, error = %e, "skipping malformed return data"))
        .ok()
}

/// Text of a `Program log:` line.
#[must_use]
pub fn parse_log_log(line: &str) -> Option<&str> {
    line.strip_prefix(LOG_LOG_PREFIX)
}

/// Text of a `Program failed to complete:` line.
#[must_use]
pub fn parse_log_failed_to_complete(line: &str) -> Option<&str> {
    line.strip_prefix(LOG_FAILED_TO_COMPLETE_PREFIX)
}

/// Compute units from a `consumed <n> of <m> compute units` line (any case).
#[must_use]
pub fn parse_log_compute_units(line: &str) -> Option<u64> {
    let lower = line.to_ascii_lowercase();
    let mut search = lower.as_str();
    while let Some(at) = search.find("consumed ") {
        let rest = &search[at + "consumed ".len()..];
        if let Some(units) = parse_consumed(rest) {
            return Some(units);
        }
        search = rest;
    }
    None
}

fn parse_consumed(rest: &str) -> Option<u64> {
    let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
    let used = rest[..digits].parse::<u64>().ok()?;
    let rest = rest[digits..].strip_prefix(" of ")?;
    let limit_digits = rest.bytes().take_while(u8::is_ascii_digit).count();
    if limit_digits == 0 {
        return None;
    }
    rest[limit_digits..]
        .starts_with(" compute units")
        .then_some(used)
}

/// Topics and data of a `Program data:` line.
///
/// The first field must decode to whole 32-byte topics; the second is the
/// event data.
#[must_use]
pub fn parse_log_topic(line: &str) -> Option<EventData> {
    let rest = line.strip_prefix(LOG_DATA_PREFIX)?;
    let mut fields = rest.split(' ');
    let (topics_b64, data_b64) = (fields.next()?, fields.next()?);
    if fields.next().is_some() {
        return None;
    }

    let topic_bytes = STANDARD.decode(topics_b64).ok()?;
    let data = STANDARD.decode(data_b64).ok()?;
    if topic_bytes.is_empty() || topic_bytes.len() % 32 != 0 {
        return None;
    }

    let topics = topic_bytes
        .chunks_exact(32)
        .map(|chunk| {
            let mut topic: Topic = [0u8; 32];
            topic.copy_from_slice(chunk);
            topic
        })
        .collect();
    Some(EventData { topics, data })
}

/// Reason text of a `Program <id> failed: <reason>` or bare `failed: <reason>` line.
#[must_use]
pub fn parse_log_failure(line: &str) -> Option<&str> {
    if let Some(reason) = line.strip_prefix(FAILED_MARKER) {
        return Some(reason);
    }
    let (program, rest) = line.strip_prefix(PROGRAM_PREFIX)?.split_once(' ')?;
    if program.is_empty() || !program.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return None;
    }
    rest.strip_prefix(FAILED_MARKER)
}

// =============================================================================
// TESTS
// =============================================================================
