//! GGUF format types and constants.

use serde::{Deserialize, Serialize};

use crate::error::GGUFError;

/// Magic bytes `GGUF` (little-endian).
pub const GGUF_MAGIC: u32 = 0x4655_4747;

/// Oldest GGUF version we decode. Version 1 used 32-bit lengths.
pub const GGUF_VERSION_MIN: u32 = 2;

/// Maximum GGUF version we support.
pub const GGUF_VERSION_MAX: u32 = 3;

//  Value type tag

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum GGUFValueType {
    Uint8 = 0,
    Int8 = 1,
    Uint16 = 2,
    Int16 = 3,
    Uint32 = 4,
    Int32 = 5,
    Float32 = 6,
    Bool = 7,
    String = 8,
    Array = 9,
    Uint64 = 10,
    Int64 = 11,
    Float64 = 12,
}

impl GGUFValueType {
    /// Every tag, in code order.
    pub const ALL: [GGUFValueType; 13] = [
        Self::Uint8,
        Self::Int8,
        Self::Uint16,
        Self::Int16,
        Self::Uint32,
        Self::Int32,
        Self::Float32,
        Self::Bool,
        Self::String,
        Self::Array,
        Self::Uint64,
        Self::Int64,
        Self::Float64,
    ];

    pub fn code(self) -> u32 {
        self as u32
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Uint8 => "UINT8",
            Self::Int8 => "INT8",
            Self::Uint16 => "UINT16",
            Self::Int16 => "INT16",
            Self::Uint32 => "UINT32",
            Self::Int32 => "INT32",
            Self::Float32 => "FLOAT32",
            Self::Bool => "BOOL",
            Self::String => "STRING",
            Self::Array => "ARRAY",
            Self::Uint64 => "UINT64",
            Self::Int64 => "INT64",
            Self::Float64 => "FLOAT64",
        }
    }
}

impl TryFrom<u32> for GGUFValueType {
    type Error = GGUFError;
    fn try_from(v: u32) -> Result<Self, Self::Error> {
        match v {
            0 => Ok(Self::Uint8),
            1 => Ok(Self::Int8),
            2 => Ok(Self::Uint16),
            3 => Ok(Self::Int16),
            4 => Ok(Self::Uint32),
            5 => Ok(Self::Int32),
            6 => Ok(Self::Float32),
            7 => Ok(Self::Bool),
            8 => Ok(Self::String),
            9 => Ok(Self::Array),
            10 => Ok(Self::Uint64),
            11 => Ok(Self::Int64),
            12 => Ok(Self::Float64),
            _ => Err(GGUFError::InvalidTag(v)),
        }
    }
}

//  Header

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GGUFHeader {
    pub version: u32,
    pub tensor_count: u64,
    pub metadata_kv_count: u64,
}

//  Metadata KV

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GGUFMetadataKV {
    pub key: String,
    pub value_type: GGUFValueType,
    pub value: GGUFValue,
}

/// One decoded value.
///
/// Strings that are not valid UTF-8 are kept verbatim as [`GGUFValue::OpaqueBytes`]
/// rather than failing the parse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GGUFValue {
    Uint8(u8),
    Int8(i8),
    Uint16(u16),
    Int16(i16),
    Uint32(u32),
    Int32(i32),
    Float32(f32),
    Bool(bool),
    Text(String),
    OpaqueBytes(Vec<u8>),
    Array {
        element_type: GGUFValueType,
        values: Vec<GGUFValue>,
    },
    Uint64(u64),
    Int64(i64),
    Float64(f64),
}

impl GGUFValue {
    /// The wire tag this value was decoded from.
    pub fn value_type(&self) -> GGUFValueType {
        match self {
            Self::Uint8(_) => GGUFValueType::Uint8,
            Self::Int8(_) => GGUFValueType::Int8,
            Self::Uint16(_) => GGUFValueType::Uint16,
            Self::Int16(_) => GGUFValueType::Int16,
            Self::Uint32(_) => GGUFValueType::Uint32,
            Self::Int32(_) => GGUFValueType::Int32,
            Self::Float32(_) => GGUFValueType::Float32,
            Self::Bool(_) => GGUFValueType::Bool,
            Self::Text(_) | Self::OpaqueBytes(_) => GGUFValueType::String,
            Self::Array { .. } => GGUFValueType::Array,
            Self::Uint64(_) => GGUFValueType::Uint64,
            Self::Int64(_) => GGUFValueType::Int64,
            Self::Float64(_) => GGUFValueType::Float64,
        }
    }

    /// True for a string whose bytes failed UTF-8 decoding.
    pub fn is_opaque(&self) -> bool {
        matches!(self, Self::OpaqueBytes(_))
    }

    pub fn as_u32(&self) -> Option<u32> {
        match self {
            Self::Uint8(v) => Some(u32::from(*v)),
            Self::Uint16(v) => Some(u32::from(*v)),
            Self::Uint32(v) => Some(*v),
            Self::Int32(v) => u32::try_from(*v).ok(),
            Self::Uint64(v) => u32::try_from(*v).ok(),
            Self::Int64(v) => u32::try_from(*v).ok(),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Self::Uint64(v) => Some(*v),
            Self::Int64(v) => u64::try_from(*v).ok(),
            other => other.as_u32().map(u64::from),
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int8(v) => Some(i64::from(*v)),
            Self::Int16(v) => Some(i64::from(*v)),
            Self::Int32(v) => Some(i64::from(*v)),
            Self::Int64(v) => Some(*v),
            Self::Uint64(v) => i64::try_from(*v).ok(),
            other => other.as_u32().map(i64::from),
        }
    }

    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Self::Float32(v) => Some(*v),
            Self::Float64(v) => Some(*v as f32),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float32(v) => Some(f64::from(*v)),
            Self::Float64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Raw bytes of a string value, whether or not it decoded as text.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Text(s) => Some(s.as_bytes()),
            Self::OpaqueBytes(b) => Some(b.as_slice()),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[GGUFValue]> {
        match self {
            Self::Array { values, .. } => Some(values.as_slice()),
            _ => None,
        }
    }
}

//  File-type ↔ human name

/// Map a `general.file_type` value to a short quantisation name.
pub fn file_type_name(ft: u32) -> &'static str {
    match ft {
        0 => "F32",
        1 => "F16",
        2 => "Q4_0",
        3 => "Q4_1",
        7 => "Q8_0",
        8 => "Q5_0",
        9 => "Q5_1",
        10 => "Q2_K",
        11 => "Q3_K_S",
        12 => "Q3_K_M",
        13 => "Q3_K_L",
        14 => "Q4_K_S",
        15 => "Q4_K_M",
        16 => "Q5_K_S",
        17 => "Q5_K_M",
        18 => "Q6_K",
        19 => "IQ2_XXS",
        20 => "IQ2_XS",
        21 => "Q2_K_S",
        22 => "IQ3_XS",
        23 => "IQ3_XXS",
        24 => "IQ1_S",
        25 => "IQ4_NL",
        26 => "IQ3_S",
        27 => "IQ3_M",
        28 => "IQ2_S",
        29 => "IQ2_M",
        30 => "IQ4_XS",
        31 => "IQ1_M",
        32 => "BF16",
        _ => "Unknown",
    }
}
