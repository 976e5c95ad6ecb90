//! Infrastructure adapters: event bridges and mailboxes.

pub mod bridge;
pub mod mailbox;
pub use bridge::{BridgeStats, InMemoryBridge};
pub use mailbox::SnapshotMailbox;
