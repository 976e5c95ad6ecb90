//! Tests for the snapshot mailbox

use prometheus_cycle_scheduler::infra::SnapshotMailbox;
use std::sync::Arc;
use std::thread;

#[test]
fn test_snapshot_mailbox_publish_and_read() {
    let mailbox = SnapshotMailbox::<Vec<f64>>::new();
    assert!(mailbox.latest().is_none());
    assert_eq!(mailbox.version(), 0);

    assert_eq!(mailbox.publish(vec![21.5]), 1);
    assert_eq!(mailbox.latest().unwrap().as_slice(), &[21.5]);
}

#[test]
fn test_reader_keeps_its_snapshot_across_writes() {
    let mailbox = SnapshotMailbox::new();
    mailbox.publish(vec![1.0, 2.0]);
    let held = mailbox.latest().unwrap();

    mailbox.publish(vec![9.0]);
    assert_eq!(held.as_slice(), &[1.0, 2.0]);
    assert_eq!(mailbox.latest().unwrap().as_slice(), &[9.0]);
}

#[test]
fn test_clear_advances_version() {
    let mailbox = SnapshotMailbox::new();
    mailbox.publish("a".to_string());
    assert_eq!(mailbox.clear(), 2);
    let (version, value) = mailbox.latest_versioned();
    assert_eq!(version, 2);
    assert!(value.is_none());
}

#[test]
fn test_concurrent_updates_are_not_lost() {
    let mailbox = Arc::new(SnapshotMailbox::<Vec<u32>>::new());
    let handles: Vec<_> = (0..4)
        .map(|writer| {
            let mailbox = Arc::clone(&mailbox);
            thread::spawn(move || {
                for i in 0..50 {
                    mailbox.update(|current| {
                        let mut next = current.cloned().unwrap_or_default();
                        next.push(writer * 100 + i);
                        next
                    });
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(mailbox.version(), 200);
    assert_eq!(mailbox.latest().unwrap().len(), 200);
}
