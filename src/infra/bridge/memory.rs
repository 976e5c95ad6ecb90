//! In-process loopback bridge.
//!
//! Everything published is routed back to the handler registered for its
//! topic, on a dedicated delivery thread. Useful for development, tests, and
//! for wiring tasks that feed each other through topics.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::core::{Delivery, EventBridge, HandlerMap, Message, SchedulerError, Signal};

/// Message counters for a bridge.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeStats {
    /// Messages accepted by `publish`.
    pub published: u64,
    /// Messages a handler processed.
    pub delivered: u64,
    /// Messages with no handler for their topic.
    pub unrouted: u64,
    /// Messages whose handler panicked.
    pub handler_panics: u64,
}

#[derive(Debug, Default)]
pub(crate) struct BridgeCounters {
    published: AtomicU64,
    delivered: AtomicU64,
    unrouted: AtomicU64,
    handler_panics: AtomicU64,
}

impl BridgeCounters {
    pub(crate) fn record_published(&self) {
        self.published.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record(&self, delivery: Delivery) {
        let counter = match delivery {
            Delivery::Delivered => &self.delivered,
            Delivery::NoHandler => &self.unrouted,
            Delivery::HandlerPanicked => &self.handler_panics,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> BridgeStats {
        BridgeStats {
            published: self.published.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            unrouted: self.unrouted.load(Ordering::Relaxed),
            handler_panics: self.handler_panics.load(Ordering::Relaxed),
        }
    }
}

struct Shared {
    connected: Signal,
    disconnected: Signal,
    counters: BridgeCounters,
}

/// Loopback pub/sub bridge backed by a channel and a delivery thread.
pub struct InMemoryBridge {
    shared: Arc<Shared>,
    inbound: Mutex<Option<Sender<Message>>>,
    delivery: Mutex<Option<JoinHandle<()>>>,
    connect_delay: Duration,
    never_connect: bool,
}

impl Default for InMemoryBridge {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryBridge {
    /// Bridge that becomes ready as soon as it connects.
    #[must_use]
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                connected: Signal::new(),
                disconnected: Signal::new_set(),
                counters: BridgeCounters::default(),
            }),
            inbound: Mutex::new(None),
            delivery: Mutex::new(None),
            connect_delay: Duration::ZERO,
            never_connect: false,
        }
    }

    /// Delay readiness after `connect()`, simulating a slow broker.
    #[must_use]
    pub const fn with_connect_delay(mut self, delay: Duration) -> Self {
        self.connect_delay = delay;
        self
    }

    /// Never signal readiness, simulating an unreachable broker.
    #[must_use]
    pub const fn never_connects(mut self) -> Self {
        self.never_connect = true;
        self
    }

    /// Message counters.
    #[must_use]
    pub fn stats(&self) -> BridgeStats {
        self.shared.counters.snapshot()
    }
}

impl EventBridge for InMemoryBridge {
    fn connect(&self, handlers: Arc<HandlerMap>) -> Result<(), SchedulerError> {
        let mut inbound = self.inbound.lock();
        if inbound.is_some() {
            return Err(SchedulerError::Bridge("already connected".into()));
        }

        if !self.shared.disconnected.is_set() {
            return Err(SchedulerError::Bridge("previous session still draining".into()));
        }
        // Acknowledged: the previous delivery thread is past its last handler call
        if let Some(previous) = self.delivery.lock().take() {
            let _ = previous.join();
        }

        let (tx, rx) = unbounded();
        self.shared.disconnected.clear();

        let topics = handlers.len();
        let shared = Arc::clone(&self.shared);
        let delay = self.connect_delay;
        let never_connect = self.never_connect;
        let handle = thread::Builder::new()
            .name("bridge-delivery".into())
            .spawn(move || delivery_loop(&shared, &handlers, &rx, delay, never_connect))
            .map_err(|e| {
                self.shared.disconnected.set();
                SchedulerError::Bridge(format!("cannot spawn delivery thread: {e}"))
            })?;

        *inbound = Some(tx);
        *self.delivery.lock() = Some(handle);
        info!(topics = topics, "In-memory bridge connecting");
        Ok(())
    }

    fn is_connected(&self) -> &Signal {
        &self.shared.connected
    }

    fn disconnect(&self) -> Result<(), SchedulerError> {
        // Dropping the sender lets the delivery thread drain and exit
        if self.inbound.lock().take().is_none() {
            debug!("In-memory bridge already disconnected");
        }
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
            .map_err(|_| SchedulerError::Bridge("delivery thread gone".into()))?;
        self.shared.counters.record_published();
        Ok(())
    }
}

impl Drop for InMemoryBridge {
    fn drop(&mut self) {
        self.inbound.get_mut().take();
    }
}

fn delivery_loop(
    shared: &Shared,
    handlers: &HandlerMap,
    rx: &Receiver<Message>,
    delay: Duration,
    never_connect: bool,
) {
    if never_connect {
        warn!("In-memory bridge configured to never connect");
        while rx.recv().is_ok() {}
        shared.disconnected.set();
        return;
    }

    if !delay.is_zero() {
        thread::sleep(delay);
    }
    shared.connected.set();
    debug!("In-memory bridge connected");

    while let Ok(message) = rx.recv() {
        shared.counters.record(handlers.dispatch(&message));
    }

    shared.connected.clear();
    shared.disconnected.set();
    debug!("In-memory bridge disconnected");
}
