//! # Error Classifier
//!
//! Turns a failed execution's scan into an [`ExecutionError`].
//!
//! Precedence, highest first:
//!
//! 1. Diagnostic text (`Program failed to complete:` or `Program log:`).
//! 2. No return data: the reason on the last line's `failed:` marker, or
//!    `"return data or log not set"`.
//! 3. Return data: the `Error(string)` revert reason.

use super::{parse_log_failure, ScanResult};
use crate::codec::{decode_revert_reason, Encoding, TypeCodec};
use crate::domain::services::REVERT_SELECTOR;
use crate::errors::ExecutionError;
use tracing::{debug, warn};

/// Message used when nothing explains the failure.
pub const NO_REASON_MESSAGE: &str = "return data or log not set";

/// Message used when return data cannot be decoded as a revert.
pub const UNDECODABLE_REVERT_MESSAGE: &str = "undecodable revert payload";

/// Builds execution errors from log evidence.
#[derive(Debug, Clone, Copy)]
pub struct ErrorClassifier {
    /// Reject return data whose first four bytes are not the `Error(string)` selector.
    pub strict_revert_selector: bool,
    /// Decodes the string argument of a revert payload.
    pub codec: &'static dyn TypeCodec,
}

impl Default for ErrorClassifier {
    fn default() -> Self {
        Self::new(Encoding::EthAbi.codec(), false)
    }
}

impl ErrorClassifier {
    /// Creates a classifier decoding revert payloads with `codec`.
    #[must_use]
    pub fn new(codec: &'static dyn TypeCodec, strict_revert_selector: bool) -> Self {
        Self {
            strict_revert_selector,
            codec,
        }
    }

    /// Classifies from raw evidence.
    #[must_use]
    pub fn classify(
        &self,
        return_data: Option<&[u8]>,
        compute_units_used: u64,
        log: Option<&str>,
        logs: &[String],
    ) -> ExecutionError {
        let message = match (log, return_data) {
            (Some(text), _) => text.to_string(),
            (None, None) => logs
                .last()
                .and_then(|line| parse_log_failure(line))
                .map_or_else(|| NO_REASON_MESSAGE.to_string(), str::to_string),
            (None, Some(data)) => self.revert_reason(data),
        };

        debug!(%message, compute_units_used, "execution failure classified");

        ExecutionError {
            message,
            logs: logs.to_vec(),
            compute_units_used,
        }
    }

    /// Classifies from a scan of `logs`.
    #[must_use]
    pub fn classify_scan(&self, scan: &ScanResult, logs: &[String]) -> ExecutionError {
        self.classify(
            scan.return_data.as_deref(),
            scan.compute_units_used,
            scan.diagnostic(),
            logs,
        )
    }

    fn revert_reason(&self, data: &[u8]) -> String {
        let Some((selector, body)) = data.split_first_chunk::<4>() else {
            warn!(len = data.len(), "return data shorter than a selector");
            return UNDECODABLE_REVERT_MESSAGE.to_string();
        };

        if *selector != REVERT_SELECTOR {
            if self.strict_revert_selector {
                return format!("unexpected revert selector 0x{}", hex::encode(selector));
            }
            warn!(
                selector = %hex::encode(selector),
                "return data does not carry the Error(string) selector"
            );
        }

        decode_revert_reason(self.codec, body).unwrap_or_else(|e| {
            warn!(error = %e, "revert payload did not decode");
            UNDECODABLE_REVERT_MESSAGE.to_string()
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================
