//! MIPS stack segment layout.
//!
//! Defaults mirror the simulator's stock memory configuration:
//!
//! ```text
//!   0x7FFFFFFC          Stack base (highest word of the segment)
//!   0x7FFFEFFC          Initial stack pointer
//!   ...                 (stack grows downward)
//!   0x7FBFFFFC          Stack limit (exclusive lower bound)
//! ```
//!
//! A byte address `a` is inside the segment when `limit < a <= base`.

/// MIPS word length in bytes.
pub const WORD_LENGTH_BYTES: u32 = 4;

/// Highest word-aligned address of the stack segment.
pub const STACK_BASE_ADDRESS: u32 = 0x7FFF_FFFC;

/// Value of `$sp` when a program starts.
pub const STACK_POINTER_INIT: u32 = 0x7FFF_EFFC;

/// Exclusive lower bound of the stack segment.
pub const STACK_LIMIT_ADDRESS: u32 = 0x7FBF_FFFC;

/// Round `addr` down to the word that contains it.
///
/// `word_size` must be a power of two.
#[must_use]
pub const fn align_down(addr: u32, word_size: u32) -> u32 {
    addr & !(word_size - 1)
}

#[must_use]
pub const fn is_word_aligned(addr: u32, word_size: u32) -> bool {
    addr & (word_size - 1) == 0
}

/// Byte order used when merging sub-word stores into a word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Endianness {
    #[default]
    Little,
    Big,
}

/// Bounds of the stack segment plus the pointer value a run starts from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StackLayout {
    pub stack_base: u32,
    pub stack_limit: u32,
    pub initial_sp: u32,
}

impl StackLayout {
    #[must_use]
    pub const fn new(stack_base: u32, stack_limit: u32, initial_sp: u32) -> Self {
        Self {
            stack_base,
            stack_limit,
            initial_sp,
        }
    }

    #[must_use]
    pub const fn contains(&self, addr: u32) -> bool {
        addr > self.stack_limit && addr <= self.stack_base
    }

    /// Check that the segment is non-empty and the initial pointer lies in it.
    pub fn validate(&self) -> Result<(), String> {
        if self.stack_limit >= self.stack_base {
            return Err(format!(
                "stack limit 0x{:08x} must be below stack base 0x{:08x}",
                self.stack_limit, self.stack_base
            ));
        }
        if !self.contains(self.initial_sp) {
            return Err(format!(
                "initial stack pointer 0x{:08x} is outside (0x{:08x}, 0x{:08x}]",
                self.initial_sp, self.stack_limit, self.stack_base
            ));
        }
        Ok(())
    }
}

impl Default for StackLayout {
    fn default() -> Self {
        Self::new(STACK_BASE_ADDRESS, STACK_LIMIT_ADDRESS, STACK_POINTER_INIT)
    }
}
