//! Bridge configuration from environment variables.

use crate::codec::Encoding;
use crate::logs::ErrorClassifier;
use crate::ports::outbound::{Commitment, SendOptions};
use std::env;
use std::str::FromStr;
use tracing::warn;

/// Settings shared by every contract on one program connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BridgeConfig {
    /// Wire format of call arguments and return data.
    pub encoding: Encoding,

    /// Wire format of event data.
    pub event_encoding: Encoding,

    /// Commitment awaited on send.
    pub commitment: Commitment,

    /// Skip the node's preflight simulation on send.
    pub skip_preflight: bool,

    /// Reject revert payloads that lack the `Error(string)` selector.
    pub strict_revert_selector: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            encoding: Encoding::Borsh,
            event_encoding: Encoding::EthAbi,
            commitment: Commitment::Confirmed,
            skip_preflight: false,
            strict_revert_selector: false,
        }
    }
}

impl BridgeConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `BRIDGE_ENCODING`: `borsh` or `ethabi` (default: borsh)
    /// - `BRIDGE_EVENT_ENCODING`: `borsh` or `ethabi` (default: ethabi)
    /// - `BRIDGE_COMMITMENT`: processed, confirmed, finalized (default: confirmed)
    /// - `BRIDGE_SKIP_PREFLIGHT`: true/false (default: false)
    /// - `BRIDGE_STRICT_REVERT_SELECTOR`: true/false (default: false)
    ///
    /// Unparseable values keep their default and are reported with `warn!`.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env), reading through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            encoding: parsed(&lookup, "BRIDGE_ENCODING", defaults.encoding),
            event_encoding: parsed(&lookup, "BRIDGE_EVENT_ENCODING", defaults.event_encoding),
            commitment: parsed(&lookup, "BRIDGE_COMMITMENT", defaults.commitment),
            skip_preflight: flag(&lookup, "BRIDGE_SKIP_PREFLIGHT", defaults.skip_preflight),
            strict_revert_selector: flag(
                &lookup,
                "BRIDGE_STRICT_REVERT_SELECTOR",
                defaults.strict_revert_selector,
            ),
        }
    }

    /// Options for sent transactions.
    #[must_use]
    pub fn send_options(&self) -> SendOptions {
        SendOptions {
            skip_preflight: self.skip_preflight,
            commitment: self.commitment,
        }
    }

    /// Classifier for failed executions.
    #[must_use]
    pub fn classifier(&self) -> ErrorClassifier {
        ErrorClassifier::new(self.event_encoding.codec(), self.strict_revert_selector)
    }
}

fn parsed<T, F>(lookup: &F, key: &str, default: T) -> T
where
    T: FromStr<Err = String>,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|e: String| {
            warn!(key, value = %raw, error = %e, "invalid setting, using default");
            default
        }),
    }
}

fn flag<F>(lookup: &F, key: &str, default: bool) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return default;
    };
    match raw.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" => true,
        "false" | "0" | "no" => false,
        _ => {
            warn!(key, value = %raw, "invalid flag, using default");
            default
        }
    }
}
