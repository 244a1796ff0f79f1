//! Value-type registry: byte width and numeric interpretation per tag.
//!
//! The lookups are exhaustive `match`es with no fallback arm, so a new tag in
//! [`GGUFValueType`] will not compile until it is classified here.

use serde::Serialize;

use crate::error::{GGUFError, Result};
use crate::types::GGUFValueType;

/// How the raw little-endian bytes of a fixed-width value are read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Interpretation {
    Unsigned,
    Signed,
    Float,
    Bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FixedWidthSpec {
    pub width: usize,
    pub interpretation: Interpretation,
}

const fn spec(width: usize, interpretation: Interpretation) -> Option<FixedWidthSpec> {
    Some(FixedWidthSpec {
        width,
        interpretation,
    })
}

/// `None` for the variable-length tags.
const fn lookup(tag: GGUFValueType) -> Option<FixedWidthSpec> {
    use Interpretation::*;
    match tag {
        GGUFValueType::Uint8 => spec(1, Unsigned),
        GGUFValueType::Int8 => spec(1, Signed),
        GGUFValueType::Uint16 => spec(2, Unsigned),
        GGUFValueType::Int16 => spec(2, Signed),
        GGUFValueType::Uint32 => spec(4, Unsigned),
        GGUFValueType::Int32 => spec(4, Signed),
        GGUFValueType::Float32 => spec(4, Float),
        GGUFValueType::Bool => spec(1, Bool),
        GGUFValueType::Uint64 => spec(8, Unsigned),
        GGUFValueType::Int64 => spec(8, Signed),
        GGUFValueType::Float64 => spec(8, Float),
        GGUFValueType::String | GGUFValueType::Array => None,
    }
}

pub fn fixed_width(tag: GGUFValueType) -> Result<FixedWidthSpec> {
    lookup(tag).ok_or(GGUFError::UnsupportedFixedWidth(tag))
}

/// Byte width of a fixed-width tag.
pub fn width_of(tag: GGUFValueType) -> Result<usize> {
    fixed_width(tag).map(|s| s.width)
}

pub fn interpretation_of(tag: GGUFValueType) -> Result<Interpretation> {
    fixed_width(tag).map(|s| s.interpretation)
}

pub fn is_fixed_width(tag: GGUFValueType) -> bool {
    lookup(tag).is_some()
}

/// Fewest bytes any encoded value of `tag` can occupy.
///
/// A string is at least its 8-byte length, an array at least its 4-byte
/// element tag plus 8-byte count.
pub fn min_encoded_size(tag: GGUFValueType) -> u64 {
    match lookup(tag) {
        Some(s) => s.width as u64,
        None if tag == GGUFValueType::String => 8,
        None => 12,
    }
}
