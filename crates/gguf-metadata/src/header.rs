//! Header validation: magic, version and counts.

use std::io::{Read, Seek};

use tracing::debug;

use crate::error::{GGUFError, Result};
use crate::reader::GGUFReader;
use crate::types::{GGUF_MAGIC, GGUF_VERSION_MAX, GGUF_VERSION_MIN, GGUFHeader};

/// Short reads anywhere in the header mean the file itself is too small.
fn header_field<T>(res: Result<T>) -> Result<T> {
    res.map_err(|e| match e {
        GGUFError::TruncatedInput { .. } => GGUFError::TruncatedHeader,
        other => other,
    })
}

/// Check that the stream starts with the `GGUF` magic.
///
/// Consumes exactly four bytes on success.
pub fn validate_magic<R: Read + Seek>(reader: &mut GGUFReader<R>) -> Result<()> {
    let magic = header_field(reader.read_u32())?;
    if magic != GGUF_MAGIC {
        return Err(GGUFError::BadMagic {
            expected: GGUF_MAGIC,
            actual: magic,
        });
    }
    Ok(())
}

/// Validate the magic, then read version, tensor count and KV count.
pub fn read_header<R: Read + Seek>(reader: &mut GGUFReader<R>) -> Result<GGUFHeader> {
    validate_magic(reader)?;

    let version = header_field(reader.read_u32())?;
    if !(GGUF_VERSION_MIN..=GGUF_VERSION_MAX).contains(&version) {
        return Err(GGUFError::UnsupportedVersion(version));
    }

    let tensor_count = header_field(reader.read_u64())?;
    let metadata_kv_count = header_field(reader.read_u64())?;

    debug!(version, tensor_count, metadata_kv_count, "GGUF header");

    Ok(GGUFHeader {
        version,
        tensor_count,
        metadata_kv_count,
    })
}
