#![allow(
    clippy::cast_possible_truncation, // row indices and byte offsets always fit the 32-bit address space
    clippy::cast_possible_wrap, // addresses and words are shown as signed MIPS integers
    clippy::cast_sign_loss, // instruction operands are i32 but name registers and word indices
    clippy::missing_errors_doc // every fallible operation returns the crate Error
)]

pub mod abi;
pub mod config;
pub mod display;
pub mod error;
pub mod event;
pub mod frames;
pub mod layout;
pub mod pointer;
pub mod rows;
pub mod shared;
pub mod snapshot;
pub mod symbols;
pub mod tracker;
pub mod window;

/// Event builders and preconfigured trackers for tests.
///
/// This module is only available when running tests or when the
/// `test-harness` feature is enabled.
#[cfg(any(test, feature = "test-harness"))]
pub mod test_harness;

pub use config::TrackerConfig;
pub use display::{NumberBase, SnapshotTable};
pub use error::{Error, Result};
pub use event::{AccessKind, Event, Instruction, Mnemonic};
pub use layout::{Endianness, StackLayout};
pub use pointer::{Boundary, BoundaryChange, PointerMove};
pub use rows::{MemorySource, StackRow};
pub use shared::{SharedTracker, Subscriber};
pub use snapshot::{RowState, RowView, Snapshot};
pub use symbols::{NoSymbols, SymbolResolver, SymbolTable};
pub use tracker::{ChangeKind, ChangeNotice, StackTracker};
