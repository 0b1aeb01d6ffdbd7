//! Address to row mapping for the tracked part of the stack segment.
//!
//! Row 0 is always the word at the high-water mark; row `n` is the word
//! `n * word_size` bytes below it. Row contents are keyed by absolute address
//! elsewhere, so moving the high-water mark up only renumbers rows.

use crate::layout::{StackLayout, align_down};
use crate::{Error, Result};

pub type RowIndex = usize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressWindow {
    layout: StackLayout,
    word_size: u32,
    high_water_mark: u32,
    row_count: usize,
    lookahead: usize,
}

impl AddressWindow {
    /// Window anchored at the layout's initial stack pointer.
    #[must_use]
    pub fn new(layout: StackLayout, word_size: u32, initial_rows: usize, lookahead: usize) -> Self {
        let mut window = Self {
            layout,
            word_size,
            high_water_mark: align_down(layout.initial_sp, word_size),
            row_count: 0,
            lookahead,
        };
        window.grow(initial_rows);
        window
    }

    #[must_use]
    pub const fn high_water_mark(&self) -> u32 {
        self.high_water_mark
    }

    #[must_use]
    pub const fn row_count(&self) -> usize {
        self.row_count
    }

    #[must_use]
    pub const fn word_size(&self) -> u32 {
        self.word_size
    }

    #[must_use]
    pub const fn layout(&self) -> &StackLayout {
        &self.layout
    }

    /// Most rows the window may hold without crossing the stack limit.
    #[must_use]
    pub fn capacity(&self) -> usize {
        (self.high_water_mark.saturating_sub(self.layout.stack_limit) / self.word_size) as usize
    }

    /// Add up to `n` rows at the bottom of the window. Returns the number of
    /// rows actually added; requests past the stack limit are truncated.
    pub fn grow(&mut self, n: usize) -> usize {
        let remaining = self.capacity().saturating_sub(self.row_count);
        let granted = n.min(remaining);
        if granted < n {
            tracing::debug!(
                "{}",
                Error::WindowCapacityExceeded {
                    requested: n,
                    granted,
                }
            );
        }
        if granted == 0 {
            return 0;
        }
        self.row_count += granted;
        tracing::trace!(added = granted, rows = self.row_count, "window grew");
        granted
    }

    /// Resolve `addr` to its row, growing the window first when the row is
    /// not materialized yet. An address above the high-water mark raises it.
    pub fn row_for_address(&mut self, addr: u32) -> Result<RowIndex> {
        if !self.layout.contains(addr) {
            return Err(self.out_of_segment(addr));
        }

        let aligned = align_down(addr, self.word_size);
        if aligned > self.high_water_mark {
            self.raise_high_water_mark(aligned);
        }

        let row = ((self.high_water_mark - aligned) / self.word_size) as usize;
        if row >= self.row_count {
            self.grow(row - self.row_count + self.lookahead);
        }
        if row >= self.row_count {
            return Err(Error::WindowCapacityExceeded {
                requested: row + 1,
                granted: self.row_count,
            });
        }
        Ok(row)
    }

    /// Row of `addr` under the current numbering, without growing anything.
    #[must_use]
    pub fn peek_row(&self, addr: u32) -> Option<RowIndex> {
        if !self.layout.contains(addr) {
            return None;
        }
        let aligned = align_down(addr, self.word_size);
        let offset = self.high_water_mark.checked_sub(aligned)?;
        let row = (offset / self.word_size) as usize;
        (row < self.row_count).then_some(row)
    }

    /// Byte column of `addr` inside its row; the lowest address of a word
    /// sits in the right-most column.
    #[must_use]
    pub const fn column_for_address(&self, addr: u32) -> usize {
        (self.word_size - 1 - addr % self.word_size) as usize
    }

    /// Word address shown at `row`, if the row is materialized.
    #[must_use]
    pub fn address_of(&self, row: RowIndex) -> Option<u32> {
        if row >= self.row_count {
            return None;
        }
        let offset = u32::try_from(row).ok()?.checked_mul(self.word_size)?;
        self.high_water_mark.checked_sub(offset)
    }

    /// Drop all growth and re-anchor at `layout.initial_sp`.
    pub fn reanchor(&mut self, layout: StackLayout, initial_rows: usize) {
        self.layout = layout;
        self.high_water_mark = align_down(layout.initial_sp, self.word_size);
        self.row_count = 0;
        self.grow(initial_rows);
    }

    fn raise_high_water_mark(&mut self, aligned: u32) {
        let ceiling = align_down(self.layout.stack_base, self.word_size);
        let new_mark = aligned.min(ceiling);
        let added = ((new_mark - self.high_water_mark) / self.word_size) as usize;
        if added == 0 {
            return;
        }
        tracing::debug!(
            from = format_args!("0x{:08x}", self.high_water_mark),
            to = format_args!("0x{new_mark:08x}"),
            "stack pointer overshot the high-water mark"
        );
        self.high_water_mark = new_mark;
        self.grow(added);
    }

    fn out_of_segment(&self, address: u32) -> Error {
        Error::OutOfSegment {
            address,
            limit: self.layout.stack_limit,
            base: self.layout.stack_base,
        }
    }
}
