//! Test harness for stackviz tests
//!
//! Builders for the events a MIPS simulator would publish, plus trackers
//! preloaded with the MARS default layout.
//!
//! # Example
//!
//! ```rust
//! use stackviz::test_harness::*;
//!
//! let mut tracker = tracker_with_symbols(&[("fact", 0x0040_0020)]);
//! feed(&mut tracker, &[
//!     sp_write(STACK_POINTER_INIT - 8),
//!     jal(0x0040_0000, 0x0040_0020),
//!     sw(0x0040_0020, "$ra"),
//!     stack_write(STACK_POINTER_INIT - 8, 0x0040_0004),
//! ]);
//!
//! let row = tracker.rows().get(STACK_POINTER_INIT - 8).unwrap();
//! assert_eq!(row.register, "$ra");
//! assert_eq!(row.frame_label, "fact (1)");
//! ```

#![allow(
    clippy::must_use_candidate,
    clippy::missing_panics_doc,
    clippy::cast_possible_wrap
)]

use crate::abi::{RETURN_ADDR_REG, STACK_POINTER_REG, register_number};
use crate::config::TrackerConfig;
use crate::event::{Event, Instruction, Mnemonic};
use crate::symbols::{NoSymbols, SymbolTable};
use crate::tracker::{ChangeNotice, StackTracker};

pub use crate::layout::{STACK_BASE_ADDRESS, STACK_LIMIT_ADDRESS, STACK_POINTER_INIT};

/// Word size of the default layout.
pub const WORD: u32 = 4;

fn reg(name: &str) -> i32 {
    let number = register_number(name).unwrap_or_else(|| panic!("unknown register {name}"));
    i32::from(number)
}

/// `sw <register>, 0($sp)` decoded at `pc`.
pub fn sw(pc: u32, register: &str) -> Event {
    Event::InstructionDecoded(Instruction::new(
        pc,
        Mnemonic::Sw,
        vec![reg(register), 0, i32::from(STACK_POINTER_REG)],
    ))
}

/// `sb <register>, 0($sp)` decoded at `pc`.
pub fn sb(pc: u32, register: &str) -> Event {
    Event::InstructionDecoded(Instruction::new(
        pc,
        Mnemonic::Sb,
        vec![reg(register), 0, i32::from(STACK_POINTER_REG)],
    ))
}

/// `jal target` decoded at `pc`. The operand is the word index of `target`.
pub fn jal(pc: u32, target: u32) -> Event {
    Event::InstructionDecoded(Instruction::new(pc, Mnemonic::Jal, vec![(target / WORD) as i32]))
}

pub fn j(pc: u32, target: u32) -> Event {
    Event::InstructionDecoded(Instruction::new(pc, Mnemonic::J, vec![(target / WORD) as i32]))
}

pub fn jr_ra(pc: u32) -> Event {
    jr(pc, "$ra")
}

pub fn jr(pc: u32, register: &str) -> Event {
    Event::InstructionDecoded(Instruction::new(pc, Mnemonic::Jr, vec![reg(register)]))
}

pub fn nop(pc: u32) -> Event {
    Event::InstructionDecoded(Instruction::new(pc, Mnemonic::Other("nop".to_string()), vec![]))
}

pub fn sp_write(value: u32) -> Event {
    Event::register_write(STACK_POINTER_REG, value)
}

pub fn ra_write(value: u32) -> Event {
    Event::register_write(RETURN_ADDR_REG, value)
}

/// Full-word store of `value` at `address`.
pub fn stack_write(address: u32, value: u32) -> Event {
    Event::memory_write(address, value, WORD)
}

/// Tracker with the default configuration and no symbols.
pub fn default_tracker() -> StackTracker {
    StackTracker::new(TrackerConfig::default(), NoSymbols).expect("default config is valid")
}

pub fn symbols(entries: &[(&str, u32)]) -> SymbolTable {
    entries
        .iter()
        .map(|&(label, address)| (address, label))
        .collect()
}

pub fn tracker_with_symbols(entries: &[(&str, u32)]) -> StackTracker {
    StackTracker::new(TrackerConfig::default(), symbols(entries)).expect("default config is valid")
}

/// Process every event in order and collect the notices produced.
pub fn feed(tracker: &mut StackTracker, events: &[Event]) -> Vec<ChangeNotice> {
    events.iter().filter_map(|event| tracker.process(event)).collect()
}

/// Address of window row `row` in the default layout.
pub const fn row_address(row: u32) -> u32 {
    STACK_POINTER_INIT - row * WORD
}
