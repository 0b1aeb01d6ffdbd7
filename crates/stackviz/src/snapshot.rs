use crate::pointer::Boundary;
use crate::window::RowIndex;

/// Where a row sits relative to the stack pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowState {
    /// Above the pointer: live stack data.
    Used,
    /// The word the pointer is in.
    Boundary,
    /// Below the pointer: free space.
    Free,
}

impl RowState {
    #[must_use]
    pub fn of(row: RowIndex, boundary_row: RowIndex) -> Self {
        match row.cmp(&boundary_row) {
            std::cmp::Ordering::Less => Self::Used,
            std::cmp::Ordering::Equal => Self::Boundary,
            std::cmp::Ordering::Greater => Self::Free,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowView {
    pub index: RowIndex,
    pub address: u32,
    pub word: u32,
    pub register: String,
    pub frame_label: String,
    pub state: RowState,
}

/// Read-only copy of the window handed to presentation code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    /// Rows in window order, highest address first.
    pub rows: Vec<RowView>,
    pub boundary: Boundary,
    pub high_water_mark: u32,
    pub row_count: usize,
    pub word_size: u32,
    pub generation: u64,
}

impl Snapshot {
    #[must_use]
    pub fn row(&self, index: RowIndex) -> Option<&RowView> {
        self.rows.iter().find(|row| row.index == index)
    }

    #[must_use]
    pub fn row_at(&self, address: u32) -> Option<&RowView> {
        self.rows.iter().find(|row| row.address == address)
    }
}
