//! Tokio runtime bridge implementation.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::mpsc::{unbounded_channel, UnboundedSender};
use tracing::{debug, info};

use crate::core::{EventBridge, HandlerMap, Message, SchedulerError, Signal};
use crate::infra::bridge::memory::BridgeCounters;
use crate::infra::BridgeStats;

struct Shared {
    connected: Signal,
    disconnected: Signal,
    counters: BridgeCounters,
}

/// Loopback bridge whose delivery loop runs as a task on a tokio runtime.
///
/// Handlers are plain closures invoked from that task, so they must not block
/// for long; they run on a runtime worker, never on the scheduler thread.
pub struct TokioBridge {
    handle: Handle,
    shared: Arc<Shared>,
    inbound: Mutex<Option<UnboundedSender<Message>>>,
}

impl TokioBridge {
    /// Create a bridge delivering on the runtime behind `handle`.
    #[must_use]
    pub fn new(handle: Handle) -> Self {
        Self {
            handle,
            shared: Arc::new(Shared {
                connected: Signal::new(),
                disconnected: Signal::new_set(),
                counters: BridgeCounters::default(),
            }),
            inbound: Mutex::new(None),
        }
    }

    /// Create a bridge on the runtime of the calling context.
    ///
    /// # Errors
    ///
    /// `SchedulerError::Bridge` when called outside a tokio runtime.
    pub fn current() -> Result<Self, SchedulerError> {
        Handle::try_current()
            .map(Self::new)
            .map_err(|e| SchedulerError::Bridge(e.to_string()))
    }

    /// Message counters.
    #[must_use]
    pub fn stats(&self) -> BridgeStats {
        self.shared.counters.snapshot()
    }
}

impl EventBridge for TokioBridge {
    fn connect(&self, handlers: Arc<HandlerMap>) -> Result<(), SchedulerError> {
        let mut inbound = self.inbound.lock();
        if inbound.is_some() {
            return Err(SchedulerError::Bridge("already connected".into()));
        }
        if !self.shared.disconnected.is_set() {
            return Err(SchedulerError::Bridge("previous session still draining".into()));
        }

        let (tx, mut rx) = unbounded_channel::<Message>();
        self.shared.disconnected.clear();
        let shared = Arc::clone(&self.shared);
        info!(topics = handlers.len(), "Tokio bridge connecting");

        self.handle.spawn(async move {
            shared.connected.set();
            debug!("Tokio bridge connected");
            while let Some(message) = rx.recv().await {
                shared.counters.record(handlers.dispatch(&message));
            }
            shared.connected.clear();
            shared.disconnected.set();
            debug!("Tokio bridge disconnected");
        });

        *inbound = Some(tx);
        Ok(())
    }

    fn is_connected(&self) -> &Signal {
        &self.shared.connected
    }

    fn disconnect(&self) -> Result<(), SchedulerError> {
        self.inbound.lock().take();
        Ok(())
    }

    fn is_disconnected(&self) -> &Signal {
        &self.shared.disconnected
    }

    fn publish(&self, topic: &str, payload: &[u8]) -> Result<(), SchedulerError> {
        if !self.shared.connected.is_set() {
            return Err(SchedulerError::Bridge("not connected".into()));
        }
        let inbound = self.inbound.lock();
        let Some(tx) = inbound.as_ref() else {
            return Err(SchedulerError::Bridge("not connected".into()));
        };
        tx.send(Message::new(topic, payload))
            .map_err(|_| SchedulerError::Bridge("delivery task gone".into()))?;
        self.shared.counters.record_published();
        Ok(())
    }
}
