//! Per-word state of the tracked stack rows.
//!
//! The store is keyed by word address, not by display row: the window may
//! renumber rows when the high-water mark moves, but an address keeps its
//! data. Words that were never written simply have no entry.

use std::collections::BTreeMap;
use std::ops::Range;

use crate::layout::{Endianness, align_down};

/// Reads current word contents from simulated memory.
pub trait MemorySource {
    fn read_word(&self, address: u32) -> Option<u32>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StackRow {
    pub word: u32,
    pub register: String,
    pub frame_label: String,
}

impl StackRow {
    #[must_use]
    pub fn is_attributed(&self) -> bool {
        !self.register.is_empty() || !self.frame_label.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct StackRowStore {
    rows: BTreeMap<u32, StackRow>,
}

impl StackRowStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, address: u32) -> Option<&StackRow> {
        self.rows.get(&address)
    }

    /// Word value at `address`, zero if nothing was observed there.
    #[must_use]
    pub fn word(&self, address: u32) -> u32 {
        self.rows.get(&address).map_or(0, |row| row.word)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn set_word(&mut self, address: u32, value: u32) {
        self.row_mut(address).word = value;
    }

    pub fn set_register(&mut self, address: u32, name: &str) {
        set_if_changed(&mut self.row_mut(address).register, name);
    }

    pub fn set_frame_label(&mut self, address: u32, label: &str) {
        set_if_changed(&mut self.row_mut(address).frame_label, label);
    }

    /// Merge a `length`-byte store at byte address `address` into its word.
    pub fn write_bytes(
        &mut self,
        address: u32,
        value: u32,
        length: u32,
        word_size: u32,
        endianness: Endianness,
    ) {
        let word_address = align_down(address, word_size);
        if length >= word_size {
            self.set_word(word_address, value);
            return;
        }

        let offset = address - word_address;
        let length = length.min(word_size - offset);
        let shift = match endianness {
            Endianness::Little => offset * 8,
            Endianness::Big => (word_size - offset - length) * 8,
        };
        let mask = (1u32 << (length * 8)).wrapping_sub(1) << shift;

        let row = self.row_mut(word_address);
        row.word = (row.word & !mask) | ((value << shift) & mask);
    }

    /// Forget the register and frame attribution of one word.
    pub fn clear(&mut self, address: u32) {
        if let Some(row) = self.rows.get_mut(&address) {
            row.register.clear();
            row.frame_label.clear();
        }
    }

    /// Forget attribution of every word address in `range`.
    pub fn bulk_clear(&mut self, range: Range<u32>) {
        if range.is_empty() {
            return;
        }
        for row in self.rows.range_mut(range).map(|(_, row)| row) {
            row.register.clear();
            row.frame_label.clear();
        }
    }

    /// Re-read word values for `addresses` from simulated memory.
    pub fn refresh(&mut self, memory: &dyn MemorySource, addresses: impl IntoIterator<Item = u32>) {
        for address in addresses {
            match memory.read_word(address) {
                Some(word) => self.set_word(address, word),
                None => tracing::trace!(address = format_args!("0x{address:08x}"), "unreadable word"),
            }
        }
    }

    pub fn reset(&mut self) {
        self.rows.clear();
    }

    fn row_mut(&mut self, address: u32) -> &mut StackRow {
        self.rows.entry(address).or_default()
    }
}

fn set_if_changed(slot: &mut String, value: &str) {
    if slot != value {
        value.clone_into(slot);
    }
}
