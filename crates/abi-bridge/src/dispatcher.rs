//! # Event Dispatcher
//!
//! Fans a program's pushed log stream out to registered listeners.
//!
//! ```text
//! ┌────────────┐  LogBatch   ┌──────────┐  snapshot   ┌───────────────┐
//! │ Transport  │ ──────────▶ │   pump   │ ──────────▶ │ event / log   │
//! │ subscription│            │  task    │             │  callbacks    │
//! └────────────┘             └──────────┘             └───────────────┘
//! ```
//!
//! One transport subscription is shared by all listeners. It is opened when
//! the first listener registers and closed exactly once when the last one
//! is removed. Callbacks run against a snapshot of the registry, so a
//! callback may register or remove listeners without deadlocking.

use crate::codec::TypeCodec;
use crate::domain::abi::Interface;
use crate::domain::entities::DecodedEvent;
use crate::domain::value_objects::{ListenerId, Topic};
use crate::errors::{DispatchError, TransportError};
use crate::logs::{parse_log_log, parse_log_topic};
use crate::ports::outbound::{LedgerTransport, LogSubscription, SubscriptionId};
use parking_lot::Mutex;
use shared_types::{LogBatch, Pubkey};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

/// Callback invoked with each decoded event.
pub type EventCallback = Arc<dyn Fn(&DecodedEvent) + Send + Sync>;

/// Callback invoked with the text of each `Program log:` line.
pub type LogCallback = Arc<dyn Fn(&str) + Send + Sync>;

// =============================================================================
// REGISTRY
// =============================================================================

#[derive(Clone)]
struct EventListener {
    interface: Arc<Interface>,
    /// Only events with this signature topic; `None` accepts any event the
    /// interface can decode.
    topic: Option<Topic>,
    callback: EventCallback,
}

#[derive(Clone)]
enum Listener {
    Event(EventListener),
    Log(LogCallback),
}

impl Listener {
    fn is_event(&self) -> bool {
        matches!(self, Self::Event(_))
    }
}

#[derive(Default)]
struct Registry {
    last_id: ListenerId,
    listeners: BTreeMap<ListenerId, Listener>,
}

impl Registry {
    fn insert(&mut self, listener: Listener) -> ListenerId {
        self.last_id += 1;
        self.listeners.insert(self.last_id, listener);
        self.last_id
    }
}

struct ActiveSubscription {
    id: SubscriptionId,
    pump: JoinHandle<()>,
}

// =============================================================================
// DISPATCHER
// =============================================================================

/// Per-program listener registry and subscription owner.
pub struct EventDispatcher {
    transport: Arc<dyn LedgerTransport>,
    program_id: Pubkey,
    event_codec: &'static dyn TypeCodec,
    registry: Arc<Mutex<Registry>>,
    subscription: tokio::sync::Mutex<Option<ActiveSubscription>>,
    teardowns: AtomicU64,
}

impl EventDispatcher {
    /// Creates a dispatcher for `program_id`. Nothing is subscribed until the
    /// first listener registers.
    #[must_use]
    pub fn new(
        transport: Arc<dyn LedgerTransport>,
        program_id: Pubkey,
        event_codec: &'static dyn TypeCodec,
    ) -> Self {
        Self {
            transport,
            program_id,
            event_codec,
            registry: Arc::new(Mutex::new(Registry::default())),
            subscription: tokio::sync::Mutex::new(None),
            teardowns: AtomicU64::new(0),
        }
    }

    /// Registers an event listener.
    ///
    /// With `event` set, only that event (by name or signature) is delivered;
    /// otherwise every event `interface` can decode is.
    pub async fn add_event_listener(
        &self,
        interface: Arc<Interface>,
        event: Option<&str>,
        callback: EventCallback,
    ) -> Result<ListenerId, DispatchError> {
        let topic = match event {
            Some(key) => Some(
                interface
                    .event(key)
                    .map(|e| e.topic)
                    .ok_or_else(|| DispatchError::UnknownEvent(key.to_string()))?,
            ),
            None => None,
        };
        self.register(Listener::Event(EventListener {
            interface,
            topic,
            callback,
        }))
        .await
    }

    /// Removes an event listener.
    pub async fn remove_event_listener(&self, id: ListenerId) -> Result<(), DispatchError> {
        self.unregister(id, true).await
    }

    /// Registers a listener for `Program log:` text.
    pub async fn add_log_listener(
        &self,
        callback: LogCallback,
    ) -> Result<ListenerId, DispatchError> {
        self.register(Listener::Log(callback)).await
    }

    /// Removes a log listener.
    pub async fn remove_log_listener(&self, id: ListenerId) -> Result<(), DispatchError> {
        self.unregister(id, false).await
    }

    /// Number of registered listeners of either kind.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.registry.lock().listeners.len()
    }

    /// True while the transport subscription is open.
    pub async fn is_subscribed(&self) -> bool {
        self.subscription.lock().await.is_some()
    }

    /// How many times the transport subscription has been torn down.
    #[must_use]
    pub fn teardown_count(&self) -> u64 {
        self.teardowns.load(Ordering::Relaxed)
    }

    /// Delivers one batch to the current listeners.
    ///
    /// Returns the number of callback invocations.
    pub fn dispatch(&self, batch: &LogBatch) -> usize {
        dispatch_batch(&self.registry, self.event_codec, batch)
    }

    async fn register(&self, listener: Listener) -> Result<ListenerId, DispatchError> {
        let mut active = self.subscription.lock().await;
        let id = self.registry.lock().insert(listener);

        if active.is_none() {
            match self.open().await {
                Ok(subscription) => *active = Some(subscription),
                Err(e) => {
                    self.registry.lock().listeners.remove(&id);
                    warn!(error = %e, program = %self.program_id, "log subscription failed to open");
                    return Err(e.into());
                }
            }
        }

        debug!(listener = id, "listener registered");
        Ok(id)
    }

    async fn unregister(&self, id: ListenerId, event: bool) -> Result<(), DispatchError> {
        let mut active = self.subscription.lock().await;
        let now_empty = {
            let mut registry = self.registry.lock();
            match registry.listeners.get(&id) {
                Some(listener) if listener.is_event() == event => {}
                _ => return Err(DispatchError::UnknownListener(id)),
            }
            registry.listeners.remove(&id);
            registry.listeners.is_empty()
        };
        debug!(listener = id, "listener removed");

        if now_empty {
            if let Some(subscription) = active.take() {
                subscription.pump.abort();
                self.teardowns.fetch_add(1, Ordering::Relaxed);
                self.transport.unsubscribe_logs(subscription.id).await?;
                info!(subscription = subscription.id, program = %self.program_id, "log subscription closed");
            }
        }
        Ok(())
    }

    async fn open(&self) -> Result<ActiveSubscription, TransportError> {
        let LogSubscription { id, mut receiver } =
            self.transport.subscribe_logs(self.program_id).await?;

        let registry = Arc::clone(&self.registry);
        let codec = self.event_codec;
        let pump = tokio::spawn(async move {
            while let Some(batch) = receiver.recv().await {
                dispatch_batch(&registry, codec, &batch);
            }
            debug!(subscription = id, "log stream ended");
        });

        info!(subscription = id, program = %self.program_id, "log subscription opened");
        Ok(ActiveSubscription { id, pump })
    }
}

impl Drop for EventDispatcher {
    fn drop(&mut self) {
        if let Some(subscription) = self.subscription.get_mut().take() {
            subscription.pump.abort();
            warn!(
                subscription = subscription.id,
                "dispatcher dropped with an open subscription"
            );
        }
    }
}

fn dispatch_batch(
    registry: &Mutex<Registry>,
    codec: &dyn TypeCodec,
    batch: &LogBatch,
) -> usize {
    if batch.err.is_some() {
        trace!(signature = %batch.signature, "skipping logs of failed transaction");
        return 0;
    }

    let snapshot: Vec<Listener> = registry.lock().listeners.values().cloned().collect();
    if snapshot.is_empty() {
        return 0;
    }

    let mut delivered = 0;
    for line in &batch.logs {
        if let Some(event) = parse_log_topic(line) {
            for listener in &snapshot {
                let Listener::Event(listener) = listener else {
                    continue;
                };
                if listener
                    .topic
                    .is_some_and(|topic| event.topics.first() != Some(&topic))
                {
                    continue;
                }
                match listener.interface.decode_event(&event, codec) {
                    Ok(decoded) => {
                        (listener.callback)(&decoded);
                        delivered += 1;
                    }
                    Err(e) => trace!(error = %e, "event not decodable by listener interface"),
                }
            }
        }

        if let Some(message) = parse_log_log(line) {
            for listener in &snapshot {
                if let Listener::Log(callback) = listener {
                    callback(message);
                    delivered += 1;
                }
            }
        }
    }
    delivered
}

/// Decodes every event in `logs` that `interface` declares, skipping the rest.
#[must_use]
pub fn decode_events<S: AsRef<str>>(
    interface: &Interface,
    codec: &dyn TypeCodec,
    logs: &[S],
) -> Vec<DecodedEvent> {
    logs.iter()
        .filter_map(|line| parse_log_topic(line.as_ref()))
        .filter_map(|event| match interface.decode_event(&event, codec) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                trace!(error = %e, "skipping undecodable event");
                None
            }
        })
        .collect()
}

// =============================================================================
// TESTS
// =============================================================================
