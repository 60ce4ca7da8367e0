//! # Bridge Telemetry
//!
//! Structured logging for the ABI bridge and its tools.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use bridge_telemetry::{init_tracing, TelemetryConfig};
//!
//! let config = TelemetryConfig::from_env();
//! init_tracing(&config)?;
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `BRIDGE_SERVICE_NAME` | `abi-bridge` | Service name in log records |
//! | `BRIDGE_LOG_LEVEL` / `RUST_LOG` | `info` | Log level filter |
//! | `BRIDGE_CONSOLE_OUTPUT` | `true` | Emit to stdout at all |
//! | `BRIDGE_JSON_LOGS` | `false` | JSON instead of pretty output |

#![warn(missing_docs)]

mod config;
mod tracing_setup;

pub use config::TelemetryConfig;
pub use tracing_setup::init_tracing;

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    /// The subscriber could not be installed (usually: already installed).
    #[error("Failed to initialize tracing subscriber: {0}")]
    TracerInit(String),

    /// The log filter directive is invalid.
    #[error("Invalid configuration: {0}")]
    Config(String),
}
