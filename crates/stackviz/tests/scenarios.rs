//! End-to-end stack tracking scenarios on the MARS default layout.

use stackviz::test_harness::*;
use stackviz::{ChangeKind, Event, PointerMove, RowState, StackLayout};

// =============================================================================
// Attribution and pop clearing
// =============================================================================

#[test]
fn test_store_then_pop_clears_attribution() {
    let mut tracker = default_tracker();
    feed(
        &mut tracker,
        &[sw(0x0040_0000, "$a0"), stack_write(STACK_POINTER_INIT, 7)],
    );

    let row = tracker.rows().get(STACK_POINTER_INIT).unwrap();
    assert_eq!(row.register, "$a0");
    assert_eq!(row.word, 7);

    let notice = tracker.process(&sp_write(STACK_POINTER_INIT + 4)).unwrap();
    let ChangeKind::BoundaryMoved(change) = notice.kind else {
        panic!("expected a boundary move, got {:?}", notice.kind);
    };
    assert_eq!(change.kind, PointerMove::Pop);

    let row = tracker.rows().get(STACK_POINTER_INIT).unwrap();
    assert_eq!(row.register, "");
    assert_eq!(row.frame_label, "");
    // the value itself is still in memory
    assert_eq!(row.word, 7);
}

#[test]
fn test_pop_leaves_live_words_alone() {
    let mut tracker = default_tracker();
    feed(
        &mut tracker,
        &[
            sp_write(row_address(3)),
            sw(0x0040_0000, "$s0"),
            stack_write(row_address(1), 1),
            sw(0x0040_0004, "$s1"),
            stack_write(row_address(3), 2),
            sp_write(row_address(2)),
        ],
    );
    assert_eq!(tracker.rows().get(row_address(3)).unwrap().register, "");
    assert_eq!(tracker.rows().get(row_address(1)).unwrap().register, "$s0");
}

#[test]
fn test_store_outside_stack_leaves_pending_untouched() {
    let mut tracker = tracker_with_symbols(&[("fact", 0x0040_0040)]);
    feed(
        &mut tracker,
        &[
            jal(0x0040_0000, 0x0040_0040),
            sw(0x0040_0040, "$t0"),
            Event::memory_write(0x1001_0000, 1, 4),
        ],
    );
    assert!(tracker.rows().is_empty());
    assert_eq!(
        tracker.frames().pending().frame_label.as_deref(),
        Some("fact (1)")
    );

    feed(
        &mut tracker,
        &[
            sp_write(STACK_POINTER_INIT - 4),
            sw(0x0040_0044, "$ra"),
            stack_write(STACK_POINTER_INIT - 4, 0x0040_0004),
        ],
    );
    let row = tracker.rows().get(STACK_POINTER_INIT - 4).unwrap();
    assert_eq!(row.register, "$ra");
    assert_eq!(row.frame_label, "fact (1)");
    assert!(tracker.frames().pending().is_empty());
}

#[test]
fn test_byte_store_merges_into_word() {
    let mut tracker = default_tracker();
    feed(
        &mut tracker,
        &[
            stack_write(STACK_POINTER_INIT, 0x1122_3344),
            sb(0x0040_0000, "$t1"),
            Event::memory_write(STACK_POINTER_INIT + 1, 0xAA, 1),
        ],
    );
    let row = tracker.rows().get(STACK_POINTER_INIT).unwrap();
    assert_eq!(row.word, 0x1122_AA44);
    assert_eq!(row.register, "$t1");
}

// =============================================================================
// Window growth
// =============================================================================

#[test]
fn test_boundary_near_bottom_grows_before_next_store() {
    let mut tracker = default_tracker();
    assert_eq!(tracker.window().row_count(), 36);

    tracker.process(&sp_write(row_address(32)));
    assert_eq!(tracker.window().row_count(), 41);

    // every row the pointer can reach so far is materialized
    for row in 0..41 {
        let notice = tracker.process(&stack_write(row_address(row), row)).unwrap();
        assert_eq!(
            notice.kind,
            ChangeKind::RowWritten {
                row: row as usize,
                address: row_address(row)
            }
        );
    }
    assert_eq!(tracker.window().row_count(), 41);
}

#[test]
fn test_write_far_below_window_grows_with_lookahead() {
    let mut tracker = default_tracker();
    tracker.process(&stack_write(row_address(100), 1)).unwrap();
    assert_eq!(tracker.window().row_count(), 110);
}

#[test]
fn test_overshoot_above_initial_pointer_renumbers_rows() {
    let mut tracker = default_tracker();
    feed(
        &mut tracker,
        &[sw(0x0040_0000, "$a0"), stack_write(STACK_POINTER_INIT, 5)],
    );

    tracker.process(&sp_write(STACK_POINTER_INIT + 8)).unwrap();
    assert_eq!(tracker.window().high_water_mark(), STACK_POINTER_INIT + 8);
    assert_eq!(tracker.window().row_count(), 38);
    assert_eq!(tracker.boundary().row, 0);

    let snapshot = tracker.snapshot_all();
    let row = snapshot.row_at(STACK_POINTER_INIT).unwrap();
    assert_eq!(row.index, 2);
    assert_eq!(row.word, 5);
    assert_eq!(row.state, RowState::Free);
}

#[test]
fn test_overshoot_is_capped_at_stack_base() {
    let mut tracker = default_tracker();
    tracker.process(&sp_write(STACK_BASE_ADDRESS)).unwrap();
    assert_eq!(tracker.window().high_water_mark(), STACK_BASE_ADDRESS);

    // past the base is outside the segment: dropped, nothing moves
    assert_eq!(tracker.process(&sp_write(STACK_BASE_ADDRESS + 4)), None);
    assert_eq!(tracker.boundary().address, STACK_BASE_ADDRESS);
}

#[test]
fn test_stack_limit_is_never_crossed() {
    let mut tracker = default_tracker();
    assert_eq!(tracker.process(&sp_write(STACK_LIMIT_ADDRESS)), None);
    assert!(tracker.process(&sp_write(STACK_LIMIT_ADDRESS + 4)).is_some());
    assert_eq!(
        tracker.window().row_count(),
        tracker.window().capacity(),
        "window fills the whole segment below the pointer"
    );
}

// =============================================================================
// Reset
// =============================================================================

#[test]
fn test_reset_clears_attribution_and_reanchors() {
    let mut tracker = tracker_with_symbols(&[("fact", 0x0040_0020)]);
    feed(
        &mut tracker,
        &[
            sp_write(STACK_POINTER_INIT + 16),
            sp_write(row_address(60)),
            jal(0x0040_0000, 0x0040_0020),
            sw(0x0040_0020, "$ra"),
            stack_write(row_address(60), 0x0040_0004),
        ],
    );
    assert_ne!(tracker.window().high_water_mark(), STACK_POINTER_INIT);

    let notice = tracker.process(&Event::SimulationReset).unwrap();
    assert_eq!(notice.kind, ChangeKind::Reset);

    assert!(tracker.rows().is_empty());
    assert!(tracker.return_addresses().is_empty());
    assert_eq!(tracker.active_calls().count("fact"), 0);
    assert_eq!(tracker.window().high_water_mark(), STACK_POINTER_INIT);
    assert_eq!(tracker.window().row_count(), 36);
    assert_eq!(tracker.boundary().row, 0);
}

#[test]
fn test_layout_change_moves_the_window() {
    let mut tracker = default_tracker();
    let layout = StackLayout::new(0x0000_3ffc, 0x0000_2000, 0x0000_3ffc);
    tracker.change_layout(layout).unwrap();

    assert_eq!(tracker.window().high_water_mark(), 0x0000_3ffc);
    assert_eq!(tracker.process(&sp_write(STACK_POINTER_INIT)), None);
    assert!(tracker.process(&sp_write(0x0000_3ff0)).is_some());
    assert_eq!(tracker.boundary().row, 3);
}
