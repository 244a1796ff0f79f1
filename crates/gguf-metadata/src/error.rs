use thiserror::Error;

use crate::types::GGUFValueType;

#[derive(Error, Debug)]
pub enum GGUFError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid GGUF magic: expected 0x{expected:08X}, got 0x{actual:08X}")]
    BadMagic { expected: u32, actual: u32 },

    #[error("Truncated header (file too small)")]
    TruncatedHeader,

    #[error("Truncated input at offset {offset}: need {needed} bytes, {remaining} remaining")]
    TruncatedInput {
        offset: u64,
        needed: u64,
        remaining: u64,
    },

    #[error("Invalid value type tag: {0}")]
    InvalidTag(u32),

    #[error("Value type {0:?} has no fixed width")]
    UnsupportedFixedWidth(GGUFValueType),

    #[error("Unsupported GGUF version: {0}")]
    UnsupportedVersion(u32),

    #[error("Array nesting exceeds {depth} levels")]
    NestingTooDeep { depth: usize },
}

impl GGUFError {
    /// Whether this error means the stream itself is malformed, as opposed
    /// to the underlying source failing.
    pub fn is_corrupt(&self) -> bool {
        !matches!(self, Self::Io(_) | Self::UnsupportedFixedWidth(_))
    }
}

pub type Result<T> = std::result::Result<T, GGUFError>;
