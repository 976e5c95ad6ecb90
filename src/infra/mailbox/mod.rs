//! Mailboxes carrying bridge-delivered data to task callables.

pub mod snapshot;

pub use snapshot::SnapshotMailbox;
