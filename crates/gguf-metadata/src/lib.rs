//! Pure-Rust decoder for GGUF typed key-value metadata.
//!
//! Reads the `GGUF` magic, then typed values from any `Read + Seek` byte
//! source:
//!
//! * **registry** — byte width and interpretation for each of the 13 tags.
//! * **reader** — decodes one value per tag, guarding every read against the
//!   bytes actually left in the stream.
//! * **header** / **metadata** — magic and version check, then the
//!   key-value loop.
//!
//! Opening files, size checks, and deciding what to do with a corrupt file
//! are left to the caller.

pub mod error;
pub mod header;
pub mod metadata;
pub mod reader;
pub mod registry;
pub mod summary;
pub mod types;

pub use error::{GGUFError, Result};
pub use header::{read_header, validate_magic};
pub use metadata::{GGUFMetadata, MetadataOptions, ReadStop, metadata_from_bytes, read_metadata, read_metadata_with};
pub use reader::{GGUFReader, MAX_NESTING_DEPTH};
pub use registry::{FixedWidthSpec, Interpretation, fixed_width, interpretation_of, min_encoded_size, width_of};
pub use summary::ModelSummary;
pub use types::{GGUF_MAGIC, GGUFHeader, GGUFMetadataKV, GGUFValue, GGUFValueType, file_type_name};
