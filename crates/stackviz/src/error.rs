#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("address 0x{address:08x} is outside the stack segment (0x{limit:08x}, 0x{base:08x}]")]
    OutOfSegment { address: u32, limit: u32, base: u32 },

    #[error("return at 0x{address:08x} has no matching call")]
    UnmatchedReturn { address: u32 },

    #[error("no symbol for jump target 0x{target:08x}")]
    UnresolvedSymbol { target: u32 },

    #[error("window growth of {requested} rows exceeds the stack segment ({granted} granted)")]
    WindowCapacityExceeded { requested: usize, granted: usize },

    #[error("malformed `{mnemonic}` at 0x{address:08x}: {reason}")]
    MalformedInstruction {
        mnemonic: String,
        address: u32,
        reason: &'static str,
    },

    #[error("Invalid tracker configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, Error>;
