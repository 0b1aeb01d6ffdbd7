//! A simulation thread feeding a [`SharedTracker`] while readers snapshot it.

use std::sync::mpsc::RecvTimeoutError;
use std::thread;
use std::time::Duration;

use stackviz::test_harness::*;
use stackviz::{ChangeKind, MemorySource, SharedTracker, Subscriber};

const PUSHES: u32 = 200;

#[test]
fn test_readers_never_observe_half_applied_events() {
    let tracker = SharedTracker::new(default_tracker());

    let writer = {
        let tracker = tracker.clone();
        thread::spawn(move || {
            for depth in 1..=PUSHES {
                let sp = STACK_POINTER_INIT - depth * WORD;
                tracker.on_event(&sp_write(sp));
                tracker.on_event(&sw(0x0040_0000, "$s0"));
                tracker.on_event(&stack_write(sp, depth));
            }
        })
    };

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let tracker = tracker.clone();
            thread::spawn(move || {
                for _ in 0..100 {
                    let snapshot = tracker.snapshot_all();
                    assert_eq!(snapshot.rows.len(), snapshot.row_count);
                    assert!(snapshot.boundary.row < snapshot.row_count);
                    // rows above the boundary were all written before the pointer moved on
                    for row in snapshot.rows.iter().take(snapshot.boundary.row).skip(1) {
                        assert_eq!(row.register, "$s0");
                    }
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }

    let snapshot = tracker.snapshot_all();
    assert_eq!(snapshot.boundary.row, PUSHES as usize);
    assert_eq!(snapshot.row(PUSHES as usize).unwrap().word, PUSHES);
}

#[test]
fn test_subscriber_receives_ordered_notices() {
    let tracker = SharedTracker::new(tracker_with_symbols(&[("fact", 0x0040_0040)]));
    let notices = tracker.subscribe();

    let worker = {
        let tracker = tracker.clone();
        thread::spawn(move || {
            tracker.on_event(&jal(0x0040_0000, 0x0040_0040));
            tracker.on_event(&sp_write(STACK_POINTER_INIT - 4));
            tracker.on_event(&stack_write(STACK_POINTER_INIT - 4, 1));
            tracker.on_event(&jr_ra(0x0040_0050));
        })
    };
    worker.join().unwrap();

    let received: Vec<_> = notices.try_iter().collect();
    let generations: Vec<u64> = received.iter().map(|notice| notice.generation).collect();
    assert_eq!(generations, vec![1, 2, 3, 4]);
    assert_eq!(received[0].kind, ChangeKind::CallsChanged);
    assert!(matches!(received[1].kind, ChangeKind::BoundaryMoved(_)));
    assert!(matches!(received[2].kind, ChangeKind::RowWritten { row: 1, .. }));

    assert_eq!(
        notices.recv_timeout(Duration::from_millis(10)),
        Err(RecvTimeoutError::Timeout)
    );
}

struct Filled(u32);

impl MemorySource for Filled {
    fn read_word(&self, _address: u32) -> Option<u32> {
        Some(self.0)
    }
}

#[test]
fn test_refresh_rereads_every_row() {
    let tracker = SharedTracker::new(default_tracker());
    let notice = tracker.refresh(&Filled(0xdead_beef));
    assert_eq!(notice.kind, ChangeKind::Refreshed);

    let snapshot = tracker.snapshot(0..36);
    assert!(snapshot.rows.iter().all(|row| row.word == 0xdead_beef));
    // attribution is untouched
    assert!(snapshot.rows.iter().all(|row| row.register.is_empty()));
}
