//! Typed-value decoder over a seekable byte source.

use std::io::{self, Cursor, Read, Seek, SeekFrom};

use tracing::trace;

use crate::error::{GGUFError, Result};
use crate::registry::{min_encoded_size, width_of};
use crate::types::*;

/// Arrays nested deeper than this are rejected instead of recursing further.
pub const MAX_NESTING_DEPTH: usize = 32;

/// Upper bound on up-front `Vec` capacity for arrays; larger arrays grow as
/// elements actually decode.
const PREALLOC_LIMIT: usize = 1024;

/// A cursor over a GGUF byte stream.
///
/// Tracks its own position and the end of the source so that every read can
/// be checked against the bytes that remain before anything is consumed.
pub struct GGUFReader<R> {
    inner: R,
    pos: u64,
    end: u64,
}

impl<'a> GGUFReader<Cursor<&'a [u8]>> {
    /// Decode from an in-memory buffer, starting at its first byte.
    pub fn from_bytes(bytes: &'a [u8]) -> Self {
        Self {
            inner: Cursor::new(bytes),
            pos: 0,
            end: bytes.len() as u64,
        }
    }
}

impl<R: Read + Seek> GGUFReader<R> {
    /// Wrap `inner`, starting at its current stream position.
    pub fn new(mut inner: R) -> Result<Self> {
        let pos = inner.stream_position()?;
        let end = inner.seek(SeekFrom::End(0))?;
        inner.seek(SeekFrom::Start(pos))?;
        Ok(Self { inner, pos, end })
    }

    /// Wrap `inner`, starting at `offset` bytes from the beginning.
    pub fn with_offset(mut inner: R, offset: u64) -> Result<Self> {
        inner.seek(SeekFrom::Start(offset))?;
        Self::new(inner)
    }

    pub fn position(&self) -> u64 {
        self.pos
    }

    /// Bytes left between the cursor and the end of the source.
    pub fn remaining(&self) -> u64 {
        self.end.saturating_sub(self.pos)
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    //  Primitives

    fn truncated(&self, needed: u64) -> GGUFError {
        GGUFError::TruncatedInput {
            offset: self.pos,
            needed,
            remaining: self.remaining(),
        }
    }

    /// Fill `buf` completely or fail without moving the cursor.
    fn fill(&mut self, buf: &mut [u8]) -> Result<()> {
        let needed = buf.len() as u64;
        if needed > self.remaining() {
            return Err(self.truncated(needed));
        }
        self.inner.read_exact(buf).map_err(|e| {
            if e.kind() == io::ErrorKind::UnexpectedEof {
                self.truncated(needed)
            } else {
                GGUFError::Io(e)
            }
        })?;
        self.pos += needed;
        Ok(())
    }

    fn read_array_bytes<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut buf = [0u8; N];
        self.fill(&mut buf)?;
        Ok(buf)
    }

    pub(crate) fn read_u32(&mut self) -> Result<u32> {
        self.read_array_bytes().map(u32::from_le_bytes)
    }

    pub(crate) fn read_u64(&mut self) -> Result<u64> {
        self.read_array_bytes().map(u64::from_le_bytes)
    }

    //  Values

    /// Read a 4-byte tag code and resolve it against the 13 known tags.
    pub fn read_value_type(&mut self) -> Result<GGUFValueType> {
        GGUFValueType::try_from(self.read_u32()?)
    }

    /// Decode one value whose tag has already been read as a raw code.
    ///
    /// An unknown code fails with [`GGUFError::InvalidTag`] before any value
    /// bytes are touched.
    pub fn read_tagged_value(&mut self, raw_tag: u32) -> Result<GGUFValue> {
        let tag = GGUFValueType::try_from(raw_tag)?;
        self.read_value(tag)
    }

    /// Decode exactly one value of type `tag`.
    pub fn read_value(&mut self, tag: GGUFValueType) -> Result<GGUFValue> {
        self.read_value_nested(tag, 0)
    }

    fn read_value_nested(&mut self, tag: GGUFValueType, depth: usize) -> Result<GGUFValue> {
        match tag {
            GGUFValueType::String => self.read_string(),
            GGUFValueType::Array => self.read_array(depth),
            _ => self.read_fixed(tag),
        }
    }

    fn read_fixed(&mut self, tag: GGUFValueType) -> Result<GGUFValue> {
        let width = width_of(tag)?;
        let mut buf = [0u8; 8];
        self.fill(&mut buf[..width])?;

        let value = match tag {
            GGUFValueType::Uint8 => GGUFValue::Uint8(buf[0]),
            GGUFValueType::Int8 => GGUFValue::Int8(i8::from_le_bytes(le(&buf))),
            GGUFValueType::Uint16 => GGUFValue::Uint16(u16::from_le_bytes(le(&buf))),
            GGUFValueType::Int16 => GGUFValue::Int16(i16::from_le_bytes(le(&buf))),
            GGUFValueType::Uint32 => GGUFValue::Uint32(u32::from_le_bytes(le(&buf))),
            GGUFValueType::Int32 => GGUFValue::Int32(i32::from_le_bytes(le(&buf))),
            GGUFValueType::Float32 => GGUFValue::Float32(f32::from_le_bytes(le(&buf))),
            GGUFValueType::Bool => GGUFValue::Bool(buf[0] != 0),
            GGUFValueType::Uint64 => GGUFValue::Uint64(u64::from_le_bytes(buf)),
            GGUFValueType::Int64 => GGUFValue::Int64(i64::from_le_bytes(buf)),
            GGUFValueType::Float64 => GGUFValue::Float64(f64::from_le_bytes(buf)),
            GGUFValueType::String | GGUFValueType::Array => {
                return Err(GGUFError::UnsupportedFixedWidth(tag));
            }
        };
        Ok(value)
    }

    /// Length-prefixed byte string, without any text decoding.
    pub(crate) fn read_string_bytes(&mut self) -> Result<Vec<u8>> {
        let len = self.read_u64()?;
        if len > self.remaining() {
            return Err(self.truncated(len));
        }
        let len = usize::try_from(len).map_err(|_| self.truncated(len))?;
        let mut buf = vec![0u8; len];
        self.fill(&mut buf)?;
        Ok(buf)
    }

    fn read_string(&mut self) -> Result<GGUFValue> {
        let bytes = self.read_string_bytes()?;
        Ok(match String::from_utf8(bytes) {
            Ok(text) => GGUFValue::Text(text),
            Err(e) => {
                trace!(offset = self.pos, "string is not UTF-8, keeping raw bytes");
                GGUFValue::OpaqueBytes(e.into_bytes())
            }
        })
    }

    fn read_array(&mut self, depth: usize) -> Result<GGUFValue> {
        if depth >= MAX_NESTING_DEPTH {
            return Err(GGUFError::NestingTooDeep {
                depth: MAX_NESTING_DEPTH,
            });
        }

        let element_type = self.read_value_type()?;
        let count = self.read_u64()?;

        // Every element needs at least this many bytes, so a count the
        // stream cannot hold is rejected before allocating.
        let min_bytes = count.checked_mul(min_encoded_size(element_type));
        match min_bytes {
            Some(n) if n <= self.remaining() => {}
            Some(n) => return Err(self.truncated(n)),
            None => return Err(self.truncated(u64::MAX)),
        }

        trace!(offset = self.pos, ?element_type, count, "decoding array");

        let capacity = usize::try_from(count).unwrap_or(usize::MAX).min(PREALLOC_LIMIT);
        let mut values = Vec::with_capacity(capacity);
        for _ in 0..count {
            values.push(self.read_value_nested(element_type, depth + 1)?);
        }
        Ok(GGUFValue::Array {
            element_type,
            values,
        })
    }

    //  Key-value pairs

    /// Read one `(key, tag, value)` triple.
    ///
    /// Keys that are not valid UTF-8 are converted lossily.
    pub fn read_kv(&mut self) -> Result<GGUFMetadataKV> {
        let key = String::from_utf8_lossy(&self.read_string_bytes()?).into_owned();
        let value_type = self.read_value_type()?;
        let value = self.read_value(value_type)?;
        Ok(GGUFMetadataKV {
            key,
            value_type,
            value,
        })
    }
}

/// First `N` bytes of a scratch buffer.
fn le<const N: usize>(buf: &[u8; 8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&buf[..N]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn array_header(tag: GGUFValueType, count: u64) -> Vec<u8> {
        let mut buf = tag.code().to_le_bytes().to_vec();
        buf.extend_from_slice(&count.to_le_bytes());
        buf
    }

    #[test]
    fn fixed_width_values_consume_their_width() {
        let bytes = [0x34, 0x12, 0xff];
        let mut r = GGUFReader::from_bytes(&bytes);
        assert_eq!(r.read_value(GGUFValueType::Uint16).unwrap(), GGUFValue::Uint16(0x1234));
        assert_eq!(r.position(), 2);
        assert_eq!(r.read_value(GGUFValueType::Int8).unwrap(), GGUFValue::Int8(-1));
        assert_eq!(r.remaining(), 0);
    }

    #[test]
    fn short_scalar_does_not_advance() {
        let bytes = [1, 2, 3];
        let mut r = GGUFReader::from_bytes(&bytes);
        let err = r.read_value(GGUFValueType::Uint32).unwrap_err();
        assert!(matches!(
            err,
            GGUFError::TruncatedInput {
                offset: 0,
                needed: 4,
                remaining: 3
            }
        ));
        assert_eq!(r.position(), 0);
    }

    #[test]
    fn bool_is_any_non_zero_byte() {
        let bytes = [0, 1, 7];
        let mut r = GGUFReader::from_bytes(&bytes);
        assert_eq!(r.read_value(GGUFValueType::Bool).unwrap(), GGUFValue::Bool(false));
        assert_eq!(r.read_value(GGUFValueType::Bool).unwrap(), GGUFValue::Bool(true));
        assert_eq!(r.read_value(GGUFValueType::Bool).unwrap(), GGUFValue::Bool(true));
    }

    #[test]
    fn invalid_utf8_becomes_opaque_bytes() {
        let mut bytes = 2u64.to_le_bytes().to_vec();
        bytes.extend_from_slice(&[0xc3, 0x28]);
        let mut r = GGUFReader::from_bytes(&bytes);
        let value = r.read_value(GGUFValueType::String).unwrap();
        assert_eq!(value, GGUFValue::OpaqueBytes(vec![0xc3, 0x28]));
        assert_eq!(r.position(), 10);
    }

    #[test]
    fn string_with_short_length_prefix() {
        let bytes = [5, 0, 0];
        let mut r = GGUFReader::from_bytes(&bytes);
        assert!(matches!(
            r.read_value(GGUFValueType::String),
            Err(GGUFError::TruncatedInput { needed: 8, .. })
        ));
    }

    #[test]
    fn huge_array_count_is_rejected_before_allocating() {
        let bytes = array_header(GGUFValueType::Uint64, u64::MAX / 2);
        let mut r = GGUFReader::from_bytes(&bytes);
        assert!(matches!(
            r.read_value(GGUFValueType::Array),
            Err(GGUFError::TruncatedInput { .. })
        ));
    }

    #[test]
    fn array_count_overflowing_size_check() {
        let bytes = array_header(GGUFValueType::Float64, u64::MAX);
        let mut r = GGUFReader::from_bytes(&bytes);
        assert!(matches!(
            r.read_value(GGUFValueType::Array),
            Err(GGUFError::TruncatedInput { needed: u64::MAX, .. })
        ));
    }

    #[test]
    fn array_with_unknown_element_tag() {
        let mut bytes = 42u32.to_le_bytes().to_vec();
        bytes.extend_from_slice(&0u64.to_le_bytes());
        let mut r = GGUFReader::from_bytes(&bytes);
        assert!(matches!(
            r.read_value(GGUFValueType::Array),
            Err(GGUFError::InvalidTag(42))
        ));
    }

    #[test]
    fn empty_array_keeps_element_type() {
        let bytes = array_header(GGUFValueType::String, 0);
        let mut r = GGUFReader::from_bytes(&bytes);
        assert_eq!(
            r.read_value(GGUFValueType::Array).unwrap(),
            GGUFValue::Array {
                element_type: GGUFValueType::String,
                values: vec![],
            }
        );
        assert_eq!(r.position(), 12);
    }

    #[test]
    fn nested_arrays_decode_recursively() {
        // [[1u8, 2u8], []]
        let mut bytes = array_header(GGUFValueType::Array, 2);
        bytes.extend(array_header(GGUFValueType::Uint8, 2));
        bytes.extend_from_slice(&[1, 2]);
        bytes.extend(array_header(GGUFValueType::Uint8, 0));

        let mut r = GGUFReader::from_bytes(&bytes);
        let value = r.read_value(GGUFValueType::Array).unwrap();
        let outer = value.as_array().unwrap();
        assert_eq!(outer.len(), 2);
        assert_eq!(
            outer[0].as_array().unwrap(),
            &[GGUFValue::Uint8(1), GGUFValue::Uint8(2)]
        );
        assert!(outer[1].as_array().unwrap().is_empty());
        assert_eq!(r.remaining(), 0);
    }

    #[test]
    fn element_running_past_end_is_truncated() {
        // Two strings fit the count guard (2 * 8 <= 20), but the first one
        // declares 100 bytes.
        let mut bytes = array_header(GGUFValueType::String, 2);
        bytes.extend_from_slice(&100u64.to_le_bytes());
        bytes.extend_from_slice(&[b'x'; 12]);

        let mut r = GGUFReader::from_bytes(&bytes);
        let err = r.read_value(GGUFValueType::Array).unwrap_err();
        assert!(matches!(
            err,
            GGUFError::TruncatedInput {
                offset: 20,
                needed: 100,
                remaining: 12
            }
        ));
    }

    #[test]
    fn nested_element_truncation_propagates() {
        // [["<50 bytes declared, 4 present>"]]
        let mut bytes = array_header(GGUFValueType::Array, 1);
        bytes.extend(array_header(GGUFValueType::String, 1));
        bytes.extend_from_slice(&50u64.to_le_bytes());
        bytes.extend_from_slice(b"abcd");

        let mut r = GGUFReader::from_bytes(&bytes);
        let err = r.read_value(GGUFValueType::Array).unwrap_err();
        assert!(matches!(
            err,
            GGUFError::TruncatedInput {
                offset: 32,
                needed: 50,
                remaining: 4
            }
        ));
    }

    #[test]
    fn nesting_depth_is_capped() {
        let mut bytes = Vec::new();
        for _ in 0..MAX_NESTING_DEPTH {
            bytes.extend(array_header(GGUFValueType::Array, 1));
        }
        bytes.extend(array_header(GGUFValueType::Uint8, 0));

        let mut r = GGUFReader::from_bytes(&bytes);
        assert!(matches!(
            r.read_value(GGUFValueType::Array),
            Err(GGUFError::NestingTooDeep { .. })
        ));
    }

    #[test]
    fn reader_starts_at_offset() {
        let bytes = [0xaa, 0xbb, 9, 0, 0, 0];
        let mut r = GGUFReader::with_offset(Cursor::new(&bytes[..]), 2).unwrap();
        assert_eq!(r.remaining(), 4);
        assert_eq!(r.read_value(GGUFValueType::Int32).unwrap(), GGUFValue::Int32(9));
    }

    #[test]
    fn non_utf8_key_is_converted_lossily() {
        let mut bytes = 3u64.to_le_bytes().to_vec();
        bytes.extend_from_slice(b"a\xffb");
        bytes.extend_from_slice(&GGUFValueType::Bool.code().to_le_bytes());
        bytes.push(1);

        let mut r = GGUFReader::from_bytes(&bytes);
        let kv = r.read_kv().unwrap();
        assert_eq!(kv.key, "a\u{fffd}b");
        assert_eq!(kv.value, GGUFValue::Bool(true));
    }
}
