//! Text rendering of snapshots.

use std::fmt::{self, Write};

use crate::snapshot::{RowState, RowView, Snapshot};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NumberBase {
    #[default]
    Hexadecimal,
    Decimal,
}

/// `0x7fffeffc`, or the address reinterpreted as a signed integer.
#[must_use]
pub fn format_address(address: u32, base: NumberBase) -> String {
    match base {
        NumberBase::Hexadecimal => format!("0x{address:08x}"),
        NumberBase::Decimal => (address as i32).to_string(),
    }
}

/// Zero-padded hex without prefix, or signed decimal.
#[must_use]
pub fn format_word(word: u32, word_size: u32, base: NumberBase) -> String {
    match base {
        NumberBase::Hexadecimal => {
            let width = (word_size * 2) as usize;
            format!("{word:0width$x}")
        }
        NumberBase::Decimal => sign_extend(word, word_size).to_string(),
    }
}

/// Bytes of `word`, most significant first. This is the column order of the
/// window, so entry `i` is column `i`.
#[must_use]
pub fn word_bytes(word: u32, word_size: u32) -> Vec<u8> {
    (0..word_size)
        .rev()
        .map(|offset| (word >> (offset * 8)) as u8)
        .collect()
}

#[must_use]
pub fn format_byte(byte: u8, base: NumberBase) -> String {
    match base {
        NumberBase::Hexadecimal => format!("{byte:02x}"),
        NumberBase::Decimal => (byte as i8).to_string(),
    }
}

fn sign_extend(word: u32, word_size: u32) -> i64 {
    let bits = word_size * 8;
    if bits >= 32 {
        return i64::from(word as i32);
    }
    let shift = 64 - bits;
    (i64::from(word) << shift) >> shift
}

/// Renders a [`Snapshot`] as a fixed-width table.
///
/// ```text
/// Address     Data      Stored Reg  Call Layout
/// 0x7ffffffc  00000000
/// 0x7fffeffc  00000005  $a0         fact (1)     <-- $sp
/// ```
#[derive(Debug, Clone, Copy)]
pub struct SnapshotTable<'a> {
    snapshot: &'a Snapshot,
    base: NumberBase,
    per_byte: bool,
}

impl<'a> SnapshotTable<'a> {
    #[must_use]
    pub fn new(snapshot: &'a Snapshot) -> Self {
        Self {
            snapshot,
            base: NumberBase::default(),
            per_byte: false,
        }
    }

    #[must_use]
    pub fn with_base(mut self, base: NumberBase) -> Self {
        self.base = base;
        self
    }

    /// Show each byte of a word separately and mark the byte `$sp` points at.
    #[must_use]
    pub fn per_byte(mut self, per_byte: bool) -> Self {
        self.per_byte = per_byte;
        self
    }

    fn data_cell(&self, row: &RowView) -> String {
        let word_size = self.snapshot.word_size;
        if !self.per_byte {
            return format_word(row.word, word_size, self.base);
        }
        let boundary_column =
            (row.state == RowState::Boundary).then_some(self.snapshot.boundary.column);
        let mut cell = String::new();
        for (column, byte) in word_bytes(row.word, word_size).into_iter().enumerate() {
            if column > 0 {
                cell.push(' ');
            }
            let byte = format_byte(byte, self.base);
            if boundary_column == Some(column) {
                let _ = write!(cell, "[{byte}]");
            } else {
                cell.push_str(&byte);
            }
        }
        cell
    }
}

impl fmt::Display for SnapshotTable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cells: Vec<[String; 4]> = self
            .snapshot
            .rows
            .iter()
            .map(|row| {
                [
                    format_address(row.address, self.base),
                    self.data_cell(row),
                    row.register.clone(),
                    row.frame_label.clone(),
                ]
            })
            .collect();

        let header = ["Address", "Data", "Stored Reg", "Call Layout"];
        let mut widths = header.map(str::len);
        for row in &cells {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(cell.len());
            }
        }

        write_line(f, &header, &widths, "")?;
        for (row, cells) in self.snapshot.rows.iter().zip(&cells) {
            let marker = if row.state == RowState::Boundary {
                "<-- $sp"
            } else {
                ""
            };
            write_line(f, cells, &widths, marker)?;
        }
        Ok(())
    }
}

fn write_line<S: AsRef<str>>(
    f: &mut fmt::Formatter<'_>,
    cells: &[S; 4],
    widths: &[usize; 4],
    marker: &str,
) -> fmt::Result {
    let mut line = String::new();
    for (cell, width) in cells.iter().zip(widths) {
        let _ = write!(line, "{:<width$}  ", cell.as_ref());
    }
    line.push_str(marker);
    writeln!(f, "{}", line.trim_end())
}
