//! The metadata loop: header, then `metadata_kv_count` key-value pairs.

use std::collections::BTreeMap;
use std::io::{Read, Seek};

use serde::Serialize;
use tracing::debug;

use crate::error::{GGUFError, Result};
use crate::header::read_header;
use crate::reader::GGUFReader;
use crate::types::*;

/// Caller policy for [`read_metadata_with`].
#[derive(Debug, Clone, Copy, Default)]
pub struct MetadataOptions {
    /// Stop reading entries once the cursor passes this absolute offset.
    pub scan_limit: Option<u64>,
    /// On a truncated entry, return what was read so far instead of failing.
    pub keep_partial: bool,
}

impl MetadataOptions {
    /// Windowed, tolerant read used for fast catalogue scans.
    pub fn quick(scan_limit: u64) -> Self {
        Self {
            scan_limit: Some(scan_limit),
            keep_partial: true,
        }
    }
}

/// Why the entry loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ReadStop {
    /// All `metadata_kv_count` entries were read.
    Complete,
    /// The cursor passed the scan window before the next entry.
    ScanWindow { offset: u64 },
    /// The stream ended inside an entry. Only produced with `keep_partial`.
    Truncated {
        offset: u64,
        needed: u64,
        remaining: u64,
    },
}

impl ReadStop {
    /// The truncation as an error, for callers that treat it as fatal.
    pub fn truncation_error(&self) -> Option<GGUFError> {
        match *self {
            Self::Truncated {
                offset,
                needed,
                remaining,
            } => Some(GGUFError::TruncatedInput {
                offset,
                needed,
                remaining,
            }),
            _ => None,
        }
    }
}

/// Decoded header plus entries in file order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GGUFMetadata {
    pub header: GGUFHeader,
    pub entries: Vec<GGUFMetadataKV>,
    pub stop: ReadStop,
}

impl GGUFMetadata {
    /// True when every declared entry was read.
    pub fn is_complete(&self) -> bool {
        self.stop == ReadStop::Complete
    }

    /// First entry with `key`. Duplicate keys are not rejected.
    pub fn get(&self, key: &str) -> Option<&GGUFValue> {
        self.entries.iter().find(|kv| kv.key == key).map(|kv| &kv.value)
    }

    pub fn iter(&self) -> impl Iterator<Item = &GGUFMetadataKV> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Key to value, keeping the first occurrence of a repeated key.
    pub fn to_map(&self) -> BTreeMap<&str, &GGUFValue> {
        let mut map = BTreeMap::new();
        for kv in &self.entries {
            map.entry(kv.key.as_str()).or_insert(&kv.value);
        }
        map
    }

    /// Number of string values (including array elements) kept as raw bytes.
    pub fn opaque_count(&self) -> usize {
        fn count(v: &GGUFValue) -> usize {
            match v {
                GGUFValue::OpaqueBytes(_) => 1,
                GGUFValue::Array { values, .. } => values.iter().map(count).sum(),
                _ => 0,
            }
        }
        self.entries.iter().map(|kv| count(&kv.value)).sum()
    }
}

/// Strictly read the whole metadata section; any error aborts.
pub fn read_metadata<R: Read + Seek>(reader: &mut GGUFReader<R>) -> Result<GGUFMetadata> {
    read_metadata_with(reader, MetadataOptions::default())
}

pub fn read_metadata_with<R: Read + Seek>(
    reader: &mut GGUFReader<R>,
    options: MetadataOptions,
) -> Result<GGUFMetadata> {
    let header = read_header(reader)?;

    let mut entries = Vec::new();
    let mut stop = ReadStop::Complete;
    for _ in 0..header.metadata_kv_count {
        let offset = reader.position();
        if options.scan_limit.is_some_and(|limit| offset >= limit) {
            stop = ReadStop::ScanWindow { offset };
            break;
        }
        match reader.read_kv() {
            Ok(kv) => entries.push(kv),
            Err(GGUFError::TruncatedInput {
                offset,
                needed,
                remaining,
            }) if options.keep_partial => {
                debug!(offset, read = entries.len(), "metadata truncated, keeping partial result");
                stop = ReadStop::Truncated {
                    offset,
                    needed,
                    remaining,
                };
                break;
            }
            Err(e) => return Err(e),
        }
    }

    debug!(entries = entries.len(), ?stop, "metadata read");

    Ok(GGUFMetadata {
        header,
        entries,
        stop,
    })
}

/// Read metadata from an in-memory GGUF image.
pub fn metadata_from_bytes(bytes: &[u8]) -> Result<GGUFMetadata> {
    read_metadata(&mut GGUFReader::from_bytes(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(kv_count: u64) -> Vec<u8> {
        let mut buf = b"GGUF".to_vec();
        buf.extend_from_slice(&3u32.to_le_bytes());
        buf.extend_from_slice(&0u64.to_le_bytes());
        buf.extend_from_slice(&kv_count.to_le_bytes());
        buf
    }

    fn push_str(buf: &mut Vec<u8>, s: &[u8]) {
        buf.extend_from_slice(&(s.len() as u64).to_le_bytes());
        buf.extend_from_slice(s);
    }

    fn push_u32_kv(buf: &mut Vec<u8>, key: &str, v: u32) {
        push_str(buf, key.as_bytes());
        buf.extend_from_slice(&GGUFValueType::Uint32.code().to_le_bytes());
        buf.extend_from_slice(&v.to_le_bytes());
    }

    #[test]
    fn reads_entries_in_order() {
        let mut bytes = header(2);
        push_u32_kv(&mut bytes, "b", 2);
        push_u32_kv(&mut bytes, "a", 1);

        let md = metadata_from_bytes(&bytes).unwrap();
        assert!(md.is_complete());
        let keys: Vec<_> = md.iter().map(|kv| kv.key.as_str()).collect();
        assert_eq!(keys, ["b", "a"]);
        assert_eq!(md.get("a").and_then(GGUFValue::as_u32), Some(1));
    }

    #[test]
    fn duplicate_keys_are_kept_and_first_wins() {
        let mut bytes = header(2);
        push_u32_kv(&mut bytes, "k", 1);
        push_u32_kv(&mut bytes, "k", 2);

        let md = metadata_from_bytes(&bytes).unwrap();
        assert_eq!(md.len(), 2);
        assert_eq!(md.get("k"), Some(&GGUFValue::Uint32(1)));
        assert_eq!(md.to_map().len(), 1);
        assert_eq!(md.to_map()["k"], &GGUFValue::Uint32(1));
    }

    #[test]
    fn strict_read_fails_on_truncation() {
        let mut bytes = header(2);
        push_u32_kv(&mut bytes, "a", 1);
        bytes.truncate(bytes.len() - 2);

        assert!(matches!(
            metadata_from_bytes(&bytes),
            Err(GGUFError::TruncatedInput { .. })
        ));
    }

    #[test]
    fn tolerant_read_keeps_partial_result() {
        let mut bytes = header(3);
        push_u32_kv(&mut bytes, "a", 1);
        push_u32_kv(&mut bytes, "b", 2);
        bytes.truncate(bytes.len() - 1);

        let options = MetadataOptions {
            scan_limit: None,
            keep_partial: true,
        };
        let md = read_metadata_with(&mut GGUFReader::from_bytes(&bytes), options).unwrap();
        assert!(!md.is_complete());
        assert_eq!(md.len(), 1);
        // Entry "b" starts at 41; its 4-byte value at 54 has only 3 bytes left.
        assert_eq!(
            md.stop,
            ReadStop::Truncated {
                offset: 54,
                needed: 4,
                remaining: 3
            }
        );
        assert!(matches!(
            md.stop.truncation_error(),
            Some(GGUFError::TruncatedInput { offset: 54, .. })
        ));
    }

    #[test]
    fn tolerant_read_still_fails_on_bad_tag() {
        let mut bytes = header(1);
        push_str(&mut bytes, b"a");
        bytes.extend_from_slice(&77u32.to_le_bytes());

        let md = read_metadata_with(&mut GGUFReader::from_bytes(&bytes), MetadataOptions::quick(1 << 20));
        assert!(matches!(md, Err(GGUFError::InvalidTag(77))));
    }

    #[test]
    fn scan_limit_stops_early() {
        let mut bytes = header(3);
        push_u32_kv(&mut bytes, "a", 1);
        push_u32_kv(&mut bytes, "b", 2);
        push_u32_kv(&mut bytes, "c", 3);

        // Header is 24 bytes, each entry 8 + 1 + 4 + 4 = 17.
        let md = read_metadata_with(&mut GGUFReader::from_bytes(&bytes), MetadataOptions::quick(30))
            .unwrap();
        assert_eq!(md.stop, ReadStop::ScanWindow { offset: 41 });
        assert!(md.stop.truncation_error().is_none());
        assert_eq!(md.len(), 1);
    }

    #[test]
    fn counts_opaque_strings_inside_arrays() {
        let mut bytes = header(1);
        push_str(&mut bytes, b"tokenizer.ggml.tokens");
        bytes.extend_from_slice(&GGUFValueType::Array.code().to_le_bytes());
        bytes.extend_from_slice(&GGUFValueType::String.code().to_le_bytes());
        bytes.extend_from_slice(&2u64.to_le_bytes());
        push_str(&mut bytes, b"ok");
        push_str(&mut bytes, &[0xff]);

        let md = metadata_from_bytes(&bytes).unwrap();
        assert_eq!(md.opaque_count(), 1);
    }
}
