//! Contract between the scheduler and an external pub/sub channel.
//!
//! The scheduler needs exactly two things from a bridge: a readiness signal to
//! gate the cycle loop, and delivery of inbound messages to the handler
//! registered for their topic. Delivery happens on the bridge's own thread,
//! never on the scheduler thread.
//!
//! Handlers are collected into a [`HandlerMap`] before the bridge connects and
//! are then handed over as an `Arc<HandlerMap>`. From that point on the map is
//! shared and immutable, so registration after `connect()` is ruled out by
//! ownership rather than by a lock on the delivery path.

use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crate::core::{SchedulerError, Signal};

/// An inbound or outbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Topic the message was published on.
    pub topic: String,
    /// Raw payload.
    pub payload: Vec<u8>,
}

impl Message {
    /// Build a message.
    pub fn new(topic: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
        }
    }
}

/// Callback invoked on the bridge's delivery thread.
pub type Handler = Arc<dyn Fn(&Message) + Send + Sync>;

/// Result of routing one inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// A handler ran to completion.
    Delivered,
    /// No handler is registered for the topic.
    NoHandler,
    /// The handler panicked; the panic was contained.
    HandlerPanicked,
}

/// Topic to handler routing table.
#[derive(Clone, Default)]
pub struct HandlerMap {
    handlers: HashMap<String, Handler>,
}

impl HandlerMap {
    /// Empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a shared handler for `topic`.
    ///
    /// # Errors
    ///
    /// `SchedulerError::Config` if the topic already has a handler.
    pub fn insert(&mut self, topic: impl Into<String>, handler: Handler) -> Result<(), SchedulerError> {
        let topic = topic.into();
        if self.handlers.contains_key(&topic) {
            return Err(SchedulerError::config(format!(
                "topic `{topic}` already has a handler"
            )));
        }
        self.handlers.insert(topic, handler);
        Ok(())
    }

    /// Register a closure for `topic`.
    ///
    /// # Errors
    ///
    /// `SchedulerError::Config` if the topic already has a handler.
    pub fn register<F>(&mut self, topic: impl Into<String>, handler: F) -> Result<(), SchedulerError>
    where
        F: Fn(&Message) + Send + Sync + 'static,
    {
        self.insert(topic, Arc::new(handler))
    }

    /// Handler for `topic`.
    #[must_use]
    pub fn get(&self, topic: &str) -> Option<&Handler> {
        self.handlers.get(topic)
    }

    /// Registered topics, unordered.
    pub fn topics(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }

    /// Number of registered topics.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Whether no topic is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Route a message to its handler, containing handler panics.
    pub fn dispatch(&self, message: &Message) -> Delivery {
        let Some(handler) = self.handlers.get(&message.topic) else {
            tracing::debug!(topic = %message.topic, "No handler for topic, dropping message");
            return Delivery::NoHandler;
        };
        match panic::catch_unwind(AssertUnwindSafe(|| handler(message))) {
            Ok(()) => Delivery::Delivered,
            Err(_) => {
                tracing::error!(topic = %message.topic, "Message handler panicked");
                Delivery::HandlerPanicked
            }
        }
    }
}

impl fmt::Debug for HandlerMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.handlers.keys()).finish()
    }
}

/// Asynchronous inbound channel the scheduler depends on.
///
/// Retry and reconnect policy belong to the implementation; the scheduler
/// only waits on the two signals, each with a bounded timeout.
pub trait EventBridge: Send + Sync {
    /// Begin connecting and install the routing table.
    ///
    /// Must not block until the connection is up; readiness is reported
    /// through [`EventBridge::is_connected`].
    ///
    /// # Errors
    ///
    /// `SchedulerError::Bridge` if connecting cannot even be attempted.
    fn connect(&self, handlers: Arc<HandlerMap>) -> Result<(), SchedulerError>;

    /// Set once the bridge can deliver and publish.
    fn is_connected(&self) -> &Signal;

    /// Begin disconnecting. Acknowledged through [`EventBridge::is_disconnected`].
    ///
    /// # Errors
    ///
    /// `SchedulerError::Bridge` if disconnecting cannot be attempted.
    fn disconnect(&self) -> Result<(), SchedulerError>;

    /// Set while the bridge is fully disconnected.
    fn is_disconnected(&self) -> &Signal;

    /// Publish a payload on a topic.
    ///
    /// # Errors
    ///
    /// `SchedulerError::Bridge` if the bridge is not connected.
    fn publish(&self, topic: &str, payload: &[u8]) -> Result<(), SchedulerError>;
}

impl<B: EventBridge + ?Sized> EventBridge for Arc<B> {
    fn connect(&self, handlers: Arc<HandlerMap>) -> Result<(), SchedulerError> {
        (**self).connect(handlers)
    }

    fn is_connected(&self) -> &Signal {
        (**self).is_connected()
    }

    fn disconnect(&self) -> Result<(), SchedulerError> {
        (**self).disconnect()
    }

    fn is_disconnected(&self) -> &Signal {
        (**self).is_disconnected()
    }

    fn publish(&self, topic: &str, payload: &[u8]) -> Result<(), SchedulerError> {
        (**self).publish(topic, payload)
    }
}
