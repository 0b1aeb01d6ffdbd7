use std::fmt;
use std::str::FromStr;

use crate::layout::StackLayout;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessKind {
    Read,
    Write,
}

/// Mnemonics the call-frame tracker reacts to. Everything else decodes to
/// [`Mnemonic::Other`] and is ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mnemonic {
    Sw,
    Sh,
    Sb,
    Sc,
    J,
    Jal,
    Jr,
    Other(String),
}

impl Mnemonic {
    #[must_use]
    pub const fn is_store(&self) -> bool {
        matches!(self, Self::Sw | Self::Sh | Self::Sb | Self::Sc)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Sw => "sw",
            Self::Sh => "sh",
            Self::Sb => "sb",
            Self::Sc => "sc",
            Self::J => "j",
            Self::Jal => "jal",
            Self::Jr => "jr",
            Self::Other(name) => name,
        }
    }
}

impl FromStr for Mnemonic {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "sw" => Self::Sw,
            "sh" => Self::Sh,
            "sb" => Self::Sb,
            "sc" => Self::Sc,
            "j" => Self::J,
            "jal" => Self::Jal,
            "jr" => Self::Jr,
            other => Self::Other(other.to_string()),
        })
    }
}

impl fmt::Display for Mnemonic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A basic instruction as the simulator decoded it.
///
/// Operands use the simulator's encoding: register operands are register
/// numbers, and the J-format target is a word index (`target / word_size`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    pub address: u32,
    pub mnemonic: Mnemonic,
    pub operands: Vec<i32>,
}

impl Instruction {
    #[must_use]
    pub fn new(address: u32, mnemonic: Mnemonic, operands: Vec<i32>) -> Self {
        Self {
            address,
            mnemonic,
            operands,
        }
    }

    #[must_use]
    pub fn operand(&self, index: usize) -> Option<i32> {
        self.operands.get(index).copied()
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}: {}", self.address, self.mnemonic)?;
        for (i, operand) in self.operands.iter().enumerate() {
            let sep = if i == 0 { " " } else { ", " };
            write!(f, "{sep}{operand}")?;
        }
        Ok(())
    }
}

/// Notices delivered by the simulator, in execution order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    MemoryAccess {
        address: u32,
        value: u32,
        /// Access width in bytes.
        length: u32,
        kind: AccessKind,
    },
    RegisterAccess {
        register: u8,
        value: u32,
        kind: AccessKind,
    },
    InstructionDecoded(Instruction),
    SimulationReset,
    /// The simulator switched memory configuration; implies a reset.
    LayoutChanged(StackLayout),
}

impl Event {
    #[must_use]
    pub const fn memory_write(address: u32, value: u32, length: u32) -> Self {
        Self::MemoryAccess {
            address,
            value,
            length,
            kind: AccessKind::Write,
        }
    }

    #[must_use]
    pub const fn register_write(register: u8, value: u32) -> Self {
        Self::RegisterAccess {
            register,
            value,
            kind: AccessKind::Write,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mnemonic_parse() {
        assert_eq!("sw".parse::<Mnemonic>().unwrap(), Mnemonic::Sw);
        assert_eq!(" JAL ".parse::<Mnemonic>().unwrap(), Mnemonic::Jal);
        assert_eq!(
            "addiu".parse::<Mnemonic>().unwrap(),
            Mnemonic::Other("addiu".to_string())
        );
        assert!(Mnemonic::Sc.is_store());
        assert!(!Mnemonic::Jr.is_store());
    }

    #[test]
    fn test_instruction_display() {
        let instr = Instruction::new(0x0040_0000, Mnemonic::Sw, vec![4, 0, 29]);
        assert_eq!(instr.to_string(), "0x00400000: sw 4, 0, 29");
    }
}
