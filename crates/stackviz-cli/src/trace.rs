//! JSON Lines simulator traces.
//!
//! ```text
//! {"type":"instruction","address":"0x00400000","mnemonic":"jal","operands":[1048592]}
//! {"type":"register","register":"$sp","value":"0x7fffeff4"}
//! {"type":"memory","address":"0x7fffeff8","value":4194308,"length":4}
//! {"type":"reset"}
//! {"type":"layout","stack_base":"0x00003ffc","stack_limit":"0x00002000","initial_sp":"0x00003ffc"}
//! ```
//!
//! Numbers may be JSON integers or `0x`-prefixed strings.

use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use stackviz::abi::register_number;
use stackviz::{AccessKind, Event, Instruction, Mnemonic, StackLayout};

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum Record {
    Memory {
        address: Number,
        value: Number,
        #[serde(default = "default_length")]
        length: u32,
        #[serde(default)]
        access: Access,
    },
    Register {
        register: Register,
        value: Number,
        #[serde(default)]
        access: Access,
    },
    Instruction {
        address: Number,
        mnemonic: String,
        #[serde(default)]
        operands: Vec<i32>,
    },
    Reset,
    Layout {
        stack_base: Number,
        stack_limit: Number,
        initial_sp: Number,
    },
}

const fn default_length() -> u32 {
    4
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
enum Access {
    Read,
    #[default]
    Write,
}

impl From<Access> for AccessKind {
    fn from(access: Access) -> Self {
        match access {
            Access::Read => Self::Read,
            Access::Write => Self::Write,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Number {
    Int(i64),
    Text(String),
}

impl Number {
    #[allow(clippy::cast_sign_loss)]
    fn to_u32(&self) -> Result<u32> {
        match self {
            // negative values are the two's complement word
            Self::Int(value) => i32::try_from(*value)
                .map(|value| value as u32)
                .or_else(|_| u32::try_from(*value))
                .map_err(|_| anyhow!("{value} does not fit in 32 bits")),
            Self::Text(text) => parse_u32(text),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Register {
    Number(u8),
    Name(String),
}

impl Register {
    fn to_number(&self) -> Result<u8> {
        match self {
            Self::Number(number) => Ok(*number),
            Self::Name(name) => {
                register_number(name).ok_or_else(|| anyhow!("unknown register '{name}'"))
            }
        }
    }
}

/// Parse `0x`-prefixed hex or plain decimal.
pub fn parse_u32(text: &str) -> Result<u32> {
    let text = text.trim();
    let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(&hex.replace('_', ""), 16),
        None => text.parse(),
    };
    parsed.with_context(|| format!("invalid number '{text}'"))
}

/// Decode one trace line. Blank lines and `#` comments yield `None`.
pub fn parse_line(line: &str) -> Result<Option<Event>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let record: Record = serde_json::from_str(line)?;
    let event = match record {
        Record::Memory {
            address,
            value,
            length,
            access,
        } => Event::MemoryAccess {
            address: address.to_u32()?,
            value: value.to_u32()?,
            length,
            kind: access.into(),
        },
        Record::Register {
            register,
            value,
            access,
        } => Event::RegisterAccess {
            register: register.to_number()?,
            value: value.to_u32()?,
            kind: access.into(),
        },
        Record::Instruction {
            address,
            mnemonic,
            operands,
        } => Event::InstructionDecoded(Instruction::new(
            address.to_u32()?,
            mnemonic.parse::<Mnemonic>().unwrap_or_else(|never| match never {}),
            operands,
        )),
        Record::Reset => Event::SimulationReset,
        Record::Layout {
            stack_base,
            stack_limit,
            initial_sp,
        } => Event::LayoutChanged(StackLayout::new(
            stack_base.to_u32()?,
            stack_limit.to_u32()?,
            initial_sp.to_u32()?,
        )),
    };
    Ok(Some(event))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_memory_record() {
        let event = parse_line(r#"{"type":"memory","address":"0x7fffeffc","value":-1}"#)
            .unwrap()
            .unwrap();
        assert_eq!(event, Event::memory_write(0x7fff_effc, 0xffff_ffff, 4));
    }

    #[test]
    fn test_parse_register_by_name_and_number() {
        let by_name = parse_line(r#"{"type":"register","register":"$sp","value":16}"#).unwrap();
        let by_number = parse_line(r#"{"type":"register","register":29,"value":"0x10"}"#).unwrap();
        assert_eq!(by_name, by_number);
        assert_eq!(by_name, Some(Event::register_write(29, 16)));
    }

    #[test]
    fn test_parse_instruction_record() {
        let event = parse_line(
            r#"{"type":"instruction","address":4194304,"mnemonic":"JAL","operands":[1048592]}"#,
        )
        .unwrap()
        .unwrap();
        assert_eq!(
            event,
            Event::InstructionDecoded(Instruction::new(0x0040_0000, Mnemonic::Jal, vec![1_048_592]))
        );
    }

    #[test]
    fn test_reads_and_resets() {
        let read = parse_line(r#"{"type":"memory","address":8,"value":0,"access":"read"}"#)
            .unwrap()
            .unwrap();
        assert!(matches!(read, Event::MemoryAccess { kind: AccessKind::Read, .. }));
        assert_eq!(parse_line(r#"{"type":"reset"}"#).unwrap(), Some(Event::SimulationReset));
    }

    #[test]
    fn test_parse_layout_record() {
        let event = parse_line(
            r#"{"type":"layout","stack_base":"0x3ffc","stack_limit":8192,"initial_sp":"0x3ff0"}"#,
        )
        .unwrap();
        assert_eq!(
            event,
            Some(Event::LayoutChanged(StackLayout::new(0x3ffc, 0x2000, 0x3ff0)))
        );
        assert!(parse_line(r#"{"type":"layout","stack_base":"0x3ffc"}"#).is_err());
    }

    #[test]
    fn test_comments_and_errors() {
        assert_eq!(parse_line("  # start").unwrap(), None);
        assert_eq!(parse_line("").unwrap(), None);
        assert!(parse_line(r#"{"type":"register","register":"$xx","value":0}"#).is_err());
        assert!(parse_line(r#"{"type":"memory","address":"0xzz","value":0}"#).is_err());
        assert!(parse_line(r#"{"type":"bogus"}"#).is_err());
    }

    #[test]
    fn test_parse_u32() {
        assert_eq!(parse_u32("0x7FFF_EFFC").unwrap(), 0x7fff_effc);
        assert_eq!(parse_u32("4096").unwrap(), 4096);
        assert!(parse_u32("-4").is_err());
    }
}
