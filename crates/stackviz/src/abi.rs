//! MIPS32 register file conventions.
//!
//! Register numbers arrive in access notices and instruction operands; the
//! tracker only ever shows their conventional `$name` form.

/// Conventional names of the 32 general purpose registers, by number.
pub const REGISTER_NAMES: [&str; 32] = [
    "$zero", "$at", "$v0", "$v1", "$a0", "$a1", "$a2", "$a3", "$t0", "$t1", "$t2", "$t3", "$t4",
    "$t5", "$t6", "$t7", "$s0", "$s1", "$s2", "$s3", "$s4", "$s5", "$s6", "$s7", "$t8", "$t9",
    "$k0", "$k1", "$gp", "$sp", "$fp", "$ra",
];

/// Stack pointer register (`$sp`).
pub const STACK_POINTER_REG: u8 = 29;

/// Return address register (`$ra`), written by `jal`.
pub const RETURN_ADDR_REG: u8 = 31;

/// Name of register `number`, or `None` outside the general purpose file.
#[must_use]
pub fn register_name(number: u8) -> Option<&'static str> {
    REGISTER_NAMES.get(usize::from(number)).copied()
}

/// Inverse of [`register_name`]. Accepts names with or without the `$`.
#[must_use]
pub fn register_number(name: &str) -> Option<u8> {
    let name = name.strip_prefix('$').unwrap_or(name);
    REGISTER_NAMES
        .iter()
        .position(|candidate| &candidate[1..] == name)
        .and_then(|index| u8::try_from(index).ok())
}
