use std::fmt;
use std::ops::Range;

use crate::abi::{RETURN_ADDR_REG, STACK_POINTER_REG};
use crate::config::TrackerConfig;
use crate::event::{AccessKind, Event, Instruction};
use crate::frames::{ActiveCallStats, CallFrameTracker, FrameEffect, ReturnAddressStack};
use crate::layout::{StackLayout, align_down};
use crate::pointer::{Boundary, BoundaryChange, StackPointerTracker};
use crate::rows::{MemorySource, StackRowStore};
use crate::snapshot::{RowState, RowView, Snapshot};
use crate::symbols::SymbolResolver;
use crate::window::{AddressWindow, RowIndex};
use crate::{Error, Result};

/// What a processed event changed, batched per event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeKind {
    RowWritten { row: RowIndex, address: u32 },
    BoundaryMoved(BoundaryChange),
    CallsChanged,
    Refreshed,
    Reset,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeNotice {
    pub generation: u64,
    pub kind: ChangeKind,
}

/// The stack tracking engine. Owns the window, both trackers and the row
/// store, and applies simulator events to them one at a time.
pub struct StackTracker {
    config: TrackerConfig,
    window: AddressWindow,
    pointer: StackPointerTracker,
    frames: CallFrameTracker,
    rows: StackRowStore,
    symbols: Box<dyn SymbolResolver>,
    generation: u64,
}

impl StackTracker {
    pub fn new(config: TrackerConfig, symbols: impl SymbolResolver + 'static) -> Result<Self> {
        config.validate()?;

        let mut window = AddressWindow::new(
            config.layout,
            config.word_size,
            config.initial_rows,
            config.lookahead_rows,
        );
        let pointer = StackPointerTracker::new(
            config.layout.initial_sp,
            &mut window,
            config.growth_batch,
            config.growth_threshold,
        )?;
        let frames = CallFrameTracker::new(
            config.word_size,
            config.detect_jal_equivalents,
            config.ra_only_returns,
        );

        Ok(Self {
            config,
            window,
            pointer,
            frames,
            rows: StackRowStore::new(),
            symbols: Box::new(symbols),
            generation: 0,
        })
    }

    #[must_use]
    pub const fn config(&self) -> &TrackerConfig {
        &self.config
    }

    #[must_use]
    pub const fn window(&self) -> &AddressWindow {
        &self.window
    }

    #[must_use]
    pub const fn rows(&self) -> &StackRowStore {
        &self.rows
    }

    #[must_use]
    pub const fn frames(&self) -> &CallFrameTracker {
        &self.frames
    }

    #[must_use]
    pub const fn active_calls(&self) -> &ActiveCallStats {
        self.frames.active_calls()
    }

    #[must_use]
    pub const fn return_addresses(&self) -> &ReturnAddressStack {
        self.frames.return_addresses()
    }

    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Current pointer position, renumbered if the window top moved since
    /// the pointer was last written.
    #[must_use]
    pub fn boundary(&self) -> Boundary {
        let boundary = self.pointer.boundary();
        Boundary {
            row: self.window.peek_row(boundary.address).unwrap_or(boundary.row),
            ..boundary
        }
    }

    pub fn set_symbols(&mut self, symbols: impl SymbolResolver + 'static) {
        self.symbols = Box::new(symbols);
    }

    /// Apply one event. Returns a notice when tracked state changed.
    ///
    /// Never fails: an event that cannot be applied is logged and dropped.
    pub fn process(&mut self, event: &Event) -> Option<ChangeNotice> {
        match self.handle(event) {
            Ok(Some(kind)) => Some(self.bump(kind)),
            Ok(None) => None,
            Err(err) => {
                log_dropped(&err);
                None
            }
        }
    }

    /// Clear calls and attribution and re-anchor the window at the initial
    /// stack pointer.
    pub fn reset(&mut self) -> ChangeNotice {
        self.reset_state();
        self.bump(ChangeKind::Reset)
    }

    /// Switch to a new memory configuration. Implies a reset.
    pub fn change_layout(&mut self, layout: StackLayout) -> Result<ChangeNotice> {
        self.apply_layout(layout)?;
        Ok(self.bump(ChangeKind::Reset))
    }

    /// Re-read every materialized word from simulated memory.
    pub fn refresh(&mut self, memory: &dyn MemorySource) -> ChangeNotice {
        let addresses: Vec<u32> = (0..self.window.row_count())
            .filter_map(|row| self.window.address_of(row))
            .collect();
        self.rows.refresh(memory, addresses);
        self.bump(ChangeKind::Refreshed)
    }

    /// Rows `range` of the window; the range is clamped to the row count.
    #[must_use]
    pub fn snapshot(&self, range: Range<RowIndex>) -> Snapshot {
        let end = range.end.min(self.window.row_count());
        let start = range.start.min(end);
        let boundary = self.boundary();

        let rows = (start..end)
            .filter_map(|index| {
                let address = self.window.address_of(index)?;
                let row = self.rows.get(address);
                Some(RowView {
                    index,
                    address,
                    word: row.map_or(0, |row| row.word),
                    register: row.map(|row| row.register.clone()).unwrap_or_default(),
                    frame_label: row.map(|row| row.frame_label.clone()).unwrap_or_default(),
                    state: RowState::of(index, boundary.row),
                })
            })
            .collect();

        Snapshot {
            rows,
            boundary,
            high_water_mark: self.window.high_water_mark(),
            row_count: self.window.row_count(),
            word_size: self.window.word_size(),
            generation: self.generation,
        }
    }

    #[must_use]
    pub fn snapshot_all(&self) -> Snapshot {
        self.snapshot(0..self.window.row_count())
    }

    fn handle(&mut self, event: &Event) -> Result<Option<ChangeKind>> {
        match event {
            Event::MemoryAccess { kind: AccessKind::Read, .. }
            | Event::RegisterAccess { kind: AccessKind::Read, .. } => Ok(None),
            Event::MemoryAccess {
                address,
                value,
                length,
                kind: AccessKind::Write,
            } => self.on_memory_write(*address, *value, *length).map(Some),
            Event::RegisterAccess {
                register,
                value,
                kind: AccessKind::Write,
            } => self.on_register_write(*register, *value),
            Event::InstructionDecoded(instr) => self.on_instruction(instr),
            Event::SimulationReset => {
                self.reset_state();
                Ok(Some(ChangeKind::Reset))
            }
            Event::LayoutChanged(layout) => {
                self.apply_layout(*layout)?;
                Ok(Some(ChangeKind::Reset))
            }
        }
    }

    fn reset_state(&mut self) {
        self.frames.reset();
        self.rows.reset();
        self.window.reanchor(self.config.layout, self.config.initial_rows);
        if let Err(err) = self.pointer.reset(self.config.layout.initial_sp, &mut self.window) {
            tracing::warn!("stack pointer could not be re-anchored: {err}");
        }
        tracing::debug!(
            high_water_mark = format_args!("0x{:08x}", self.window.high_water_mark()),
            "tracker reset"
        );
    }

    fn apply_layout(&mut self, layout: StackLayout) -> Result<()> {
        layout.validate().map_err(Error::InvalidConfig)?;
        if layout != self.config.layout {
            tracing::debug!(
                base = format_args!("0x{:08x}", layout.stack_base),
                "memory configuration changed"
            );
        }
        self.config.layout = layout;
        self.reset_state();
        Ok(())
    }

    fn on_memory_write(&mut self, address: u32, value: u32, length: u32) -> Result<ChangeKind> {
        // writes outside the stack leave the pending slot for the next stack store
        let row = self.window.row_for_address(address)?;
        let pending = self.frames.take_pending();

        let word_size = self.window.word_size();
        let word_address = align_down(address, word_size);
        self.rows
            .write_bytes(address, value, length, word_size, self.config.endianness);
        self.rows
            .set_register(word_address, pending.register.as_deref().unwrap_or_default());
        self.rows.set_frame_label(
            word_address,
            pending.frame_label.as_deref().unwrap_or_default(),
        );

        tracing::trace!(
            address = format_args!("0x{address:08x}"),
            row,
            register = pending.register.as_deref().unwrap_or("-"),
            "stack write"
        );
        Ok(ChangeKind::RowWritten {
            row,
            address: word_address,
        })
    }

    fn on_register_write(&mut self, register: u8, value: u32) -> Result<Option<ChangeKind>> {
        match register {
            STACK_POINTER_REG => {
                let change = self.pointer.on_write(value, &mut self.window, &mut self.rows)?;
                Ok(Some(ChangeKind::BoundaryMoved(change)))
            }
            RETURN_ADDR_REG => {
                self.frames.note_return_address_write();
                Ok(None)
            }
            _ => Ok(None),
        }
    }

    fn on_instruction(&mut self, instr: &Instruction) -> Result<Option<ChangeKind>> {
        let kind = match self.frames.on_instruction(instr, self.symbols.as_ref())? {
            FrameEffect::Call { .. } | FrameEffect::Return { .. } => Some(ChangeKind::CallsChanged),
            FrameEffect::StorePending { .. } | FrameEffect::None => None,
        };
        Ok(kind)
    }

    fn bump(&mut self, kind: ChangeKind) -> ChangeNotice {
        self.generation += 1;
        ChangeNotice {
            generation: self.generation,
            kind,
        }
    }
}

impl fmt::Debug for StackTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StackTracker")
            .field("config", &self.config)
            .field("window", &self.window)
            .field("pointer", &self.pointer)
            .field("frames", &self.frames)
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}

fn log_dropped(err: &Error) {
    match err {
        Error::OutOfSegment { .. } => tracing::debug!("event dropped: {err}"),
        Error::UnresolvedSymbol { .. } => tracing::debug!("{err}"),
        Error::UnmatchedReturn { .. }
        | Error::WindowCapacityExceeded { .. }
        | Error::MalformedInstruction { .. }
        | Error::InvalidConfig(_) => tracing::warn!("event dropped: {err}"),
    }
}
