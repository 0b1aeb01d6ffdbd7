use crate::Result;
use crate::layout::align_down;
use crate::rows::StackRowStore;
use crate::window::{AddressWindow, RowIndex};

/// Where `$sp` currently points inside the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Boundary {
    pub row: RowIndex,
    pub column: usize,
    pub address: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerMove {
    /// Moved to a lower address: new stack space.
    Push,
    /// Moved to a higher address: space released.
    Pop,
    Unchanged,
}

/// Result of applying one stack pointer write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundaryChange {
    pub from: Boundary,
    pub to: Boundary,
    pub kind: PointerMove,
    /// Rows added to the window while applying the write.
    pub grown: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackPointerTracker {
    boundary: Boundary,
    growth_batch: usize,
    growth_threshold: usize,
}

impl StackPointerTracker {
    /// Tracker positioned on `sp`, which must already be covered by `window`.
    pub fn new(
        sp: u32,
        window: &mut AddressWindow,
        growth_batch: usize,
        growth_threshold: usize,
    ) -> Result<Self> {
        let row = window.row_for_address(sp)?;
        Ok(Self {
            boundary: Boundary {
                row,
                column: window.column_for_address(sp),
                address: sp,
            },
            growth_batch,
            growth_threshold,
        })
    }

    #[must_use]
    pub const fn boundary(&self) -> Boundary {
        self.boundary
    }

    #[must_use]
    pub const fn value(&self) -> u32 {
        self.boundary.address
    }

    /// Apply a `$sp` write. On a pop, attribution of the released words is
    /// cleared. Writes that do not move the pointer are still reported.
    pub fn on_write(
        &mut self,
        sp: u32,
        window: &mut AddressWindow,
        rows: &mut StackRowStore,
    ) -> Result<BoundaryChange> {
        let rows_before = window.row_count();
        let row = window.row_for_address(sp)?;

        let word_size = window.word_size();
        let old_word = align_down(self.boundary.address, word_size);
        let new_word = align_down(sp, word_size);
        let kind = match new_word.cmp(&old_word) {
            std::cmp::Ordering::Less => PointerMove::Push,
            std::cmp::Ordering::Greater => PointerMove::Pop,
            std::cmp::Ordering::Equal => PointerMove::Unchanged,
        };
        if kind == PointerMove::Pop {
            rows.bulk_clear(old_word..new_word);
        }

        if row + self.growth_threshold > window.row_count() {
            window.grow(self.growth_batch);
        }

        // the old boundary is renumbered if the window top moved
        let from = Boundary {
            row: window.peek_row(self.boundary.address).unwrap_or(self.boundary.row),
            ..self.boundary
        };
        let to = Boundary {
            row,
            column: window.column_for_address(sp),
            address: sp,
        };
        self.boundary = to;

        tracing::trace!(
            sp = format_args!("0x{sp:08x}"),
            row,
            ?kind,
            "stack pointer moved"
        );

        Ok(BoundaryChange {
            from,
            to,
            kind,
            grown: window.row_count() - rows_before,
        })
    }

    /// Re-position after the window was re-anchored.
    pub fn reset(&mut self, sp: u32, window: &mut AddressWindow) -> Result<()> {
        let row = window.row_for_address(sp)?;
        self.boundary = Boundary {
            row,
            column: window.column_for_address(sp),
            address: sp,
        };
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{STACK_POINTER_INIT, StackLayout};

    fn setup() -> (StackPointerTracker, AddressWindow, StackRowStore) {
        let mut window = AddressWindow::new(StackLayout::default(), 4, 36, 10);
        let sp = StackPointerTracker::new(STACK_POINTER_INIT, &mut window, 5, 5).unwrap();
        (sp, window, StackRowStore::new())
    }

    #[test]
    fn test_push_then_pop_restores_row() {
        let (mut sp, mut window, mut rows) = setup();
        let push = sp.on_write(STACK_POINTER_INIT - 12, &mut window, &mut rows).unwrap();
        assert_eq!(push.kind, PointerMove::Push);
        assert_eq!(push.to.row, 3);
        let pop = sp.on_write(STACK_POINTER_INIT, &mut window, &mut rows).unwrap();
        assert_eq!(pop.kind, PointerMove::Pop);
        assert_eq!(pop.to.row, 0);
        assert_eq!(pop.from.row, 3);
    }

    #[test]
    fn test_pop_clears_released_words() {
        let (mut sp, mut window, mut rows) = setup();
        sp.on_write(STACK_POINTER_INIT - 8, &mut window, &mut rows).unwrap();
        rows.set_register(STACK_POINTER_INIT - 8, "$ra");
        rows.set_register(STACK_POINTER_INIT - 4, "$a0");
        rows.set_register(STACK_POINTER_INIT, "$s0");

        sp.on_write(STACK_POINTER_INIT - 4, &mut window, &mut rows).unwrap();
        assert_eq!(rows.get(STACK_POINTER_INIT - 8).unwrap().register, "");
        assert_eq!(rows.get(STACK_POINTER_INIT - 4).unwrap().register, "$a0");
        assert_eq!(rows.get(STACK_POINTER_INIT).unwrap().register, "$s0");
    }

    #[test]
    fn test_same_value_is_reported() {
        let (mut sp, mut window, mut rows) = setup();
        let change = sp.on_write(STACK_POINTER_INIT, &mut window, &mut rows).unwrap();
        assert_eq!(change.kind, PointerMove::Unchanged);
        assert_eq!(change.from, change.to);
    }

    #[test]
    fn test_threshold_grows_window() {
        let (mut sp, mut window, mut rows) = setup();
        let change = sp.on_write(STACK_POINTER_INIT - 31 * 4, &mut window, &mut rows).unwrap();
        assert_eq!(change.grown, 0);
        let change = sp.on_write(STACK_POINTER_INIT - 32 * 4, &mut window, &mut rows).unwrap();
        assert_eq!(change.to.row, 32);
        assert_eq!(change.grown, 5);
        assert_eq!(window.row_count(), 41);
    }

    #[test]
    fn test_unaligned_pointer_column() {
        let (mut sp, mut window, mut rows) = setup();
        let change = sp.on_write(STACK_POINTER_INIT - 3, &mut window, &mut rows).unwrap();
        assert_eq!(change.to.row, 1);
        assert_eq!(change.to.column, 2);
    }

    #[test]
    fn test_out_of_segment_keeps_boundary() {
        let (mut sp, mut window, mut rows) = setup();
        assert!(sp.on_write(0x1001_0000, &mut window, &mut rows).is_err());
        assert_eq!(sp.value(), STACK_POINTER_INIT);
        assert_eq!(sp.boundary().row, 0);
    }
}
