//! # Driving Ports (API - Inbound)
//!
//! The surface a bound contract instance exposes to callers.

use crate::dispatcher::{EventCallback, LogCallback};
use crate::domain::entities::{CallOptions, CallResult, DecodedEvent};
use crate::domain::value_objects::{AbiValue, ListenerId};
use crate::errors::{ContractError, DispatchError};
use async_trait::async_trait;

/// Operations on one deployed contract instance.
#[async_trait]
pub trait ContractApi: Send + Sync {
    /// Invokes `function` (a bare name or a full signature).
    ///
    /// Read-only functions are always simulated. Failures come back as
    /// [`ContractError::Execution`] carrying the classified reason, the logs
    /// and the compute units consumed.
    async fn call(
        &self,
        function: &str,
        args: &[AbiValue],
        options: CallOptions,
    ) -> Result<CallResult, ContractError>;

    /// Registers a callback for this contract's events.
    ///
    /// With `event` set, only that event (name or signature) is delivered.
    async fn add_event_listener(
        &self,
        event: Option<&str>,
        callback: EventCallback,
    ) -> Result<ListenerId, DispatchError>;

    /// Removes an event listener. Removing an unknown id is an error.
    async fn remove_event_listener(&self, id: ListenerId) -> Result<(), DispatchError>;

    /// Registers a callback for every `Program log:` line of the program.
    async fn add_log_listener(&self, callback: LogCallback) -> Result<ListenerId, DispatchError>;

    /// Removes a log listener. Removing an unknown id is an error.
    async fn remove_log_listener(&self, id: ListenerId) -> Result<(), DispatchError>;

    /// Decodes this contract's events out of a log sequence.
    fn parse_logs_events(&self, logs: &[String]) -> Vec<DecodedEvent>;
}
