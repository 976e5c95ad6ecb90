//! Event bridge backends.

pub mod memory;

pub use memory::{BridgeStats, InMemoryBridge};
