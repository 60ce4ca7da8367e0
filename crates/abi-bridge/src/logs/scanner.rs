//! # Log Scanner
//!
//! Single left-to-right pass over a transaction's log lines. For every
//! category the last matching line wins.

use super::LogRecord;
use crate::domain::value_objects::EventData;
use tracing::trace;

/// What a scan recovered from a transaction's logs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanResult {
    /// Last `Program return:` payload.
    pub return_data: Option<Vec<u8>>,
    /// Last `Program log:` text.
    pub log: Option<String>,
    /// Last `Program failed to complete:` text.
    pub failed_to_complete: Option<String>,
    /// Last compute-units figure, or 0.
    pub compute_units_used: u64,
    /// Every event line, in order.
    pub events: Vec<EventData>,
}

impl ScanResult {
    /// Best diagnostic text: a runtime abort beats a contract log line.
    #[must_use]
    pub fn diagnostic(&self) -> Option<&str> {
        self.failed_to_complete
            .as_deref()
            .or(self.log.as_deref())
    }
}

/// Stateless log scanner.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogScanner;

impl LogScanner {
    /// Scans `lines` in order.
    pub fn scan<S: AsRef<str>>(lines: &[S]) -> ScanResult {
        let mut result = ScanResult::default();
        for record in lines.iter().flat_map(|line| LogRecord::parse_all(line.as_ref())) {
            trace!(?record, "log line recognized");
            match record {
                LogRecord::Return(data) => result.return_data = Some(data),
                LogRecord::Log(text) => result.log = Some(text),
                LogRecord::FailedToComplete(text) => result.failed_to_complete = Some(text),
                LogRecord::ComputeUnits(units) => result.compute_units_used = units,
                LogRecord::Event(event) => result.events.push(event),
            }
        }
        result
    }
}

// =============================================================================
// TESTS
// =============================================================================
