//! File gate in front of the decoder: existence, minimum size, and what to
//! do with files that fail to decode.

use std::fs;
use std::io::BufReader;
use std::path::Path;

use anyhow::Context;
use gguf_metadata::{GGUFError, GGUFMetadata, GGUFReader, MetadataOptions, read_metadata_with};
use tracing::{debug, error, info, warn};

use crate::config::AppConfig;

#[derive(Debug, Clone, Copy)]
pub struct LoadSettings {
    pub min_file_size: u64,
    pub delete_corrupt: bool,
    pub options: MetadataOptions,
}

impl LoadSettings {
    pub fn from_config(cfg: &AppConfig, quick: bool) -> Self {
        Self {
            min_file_size: cfg.min_file_size,
            delete_corrupt: cfg.delete_corrupt,
            options: if quick {
                MetadataOptions::quick(cfg.quick_scan_limit)
            } else {
                MetadataOptions::default()
            },
        }
    }
}

#[derive(Debug)]
pub enum LoadOutcome {
    Loaded { file_size: u64, metadata: GGUFMetadata },
    Missing,
    TooSmall { size: u64, deleted: bool },
    Corrupt { error: GGUFError, deleted: bool },
}

impl LoadOutcome {
    pub fn status(&self) -> &'static str {
        match self {
            Self::Loaded { metadata, .. } if !metadata.is_complete() => "partial",
            Self::Loaded { .. } => "ok",
            Self::Missing => "missing",
            Self::TooSmall { deleted: true, .. } | Self::Corrupt { deleted: true, .. } => "deleted",
            Self::TooSmall { .. } => "too small",
            Self::Corrupt { .. } => "corrupt",
        }
    }
}

/// Validate `path` and decode its metadata.
///
/// Only I/O failures unrelated to the file's contents are returned as `Err`;
/// every verdict about the file itself is a [`LoadOutcome`].
pub fn load_metadata(path: &Path, settings: &LoadSettings) -> anyhow::Result<LoadOutcome> {
    if !path.exists() {
        warn!(path = %path.display(), "Model file not found");
        return Ok(LoadOutcome::Missing);
    }

    let size = fs::metadata(path)
        .with_context(|| format!("reading size of {}", path.display()))?
        .len();
    if size < settings.min_file_size {
        warn!(
            path = %path.display(),
            size,
            expected = settings.min_file_size,
            "Model file too small"
        );
        let deleted = settings.delete_corrupt && remove_corrupt(path);
        return Ok(LoadOutcome::TooSmall { size, deleted });
    }

    let file = fs::File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut reader = GGUFReader::new(BufReader::new(file))?;

    // A stream that ends inside an entry is corrupt even when the read
    // policy kept the entries before it.
    let result = read_metadata_with(&mut reader, settings.options).and_then(|metadata| {
        match metadata.stop.truncation_error() {
            Some(e) => Err(e),
            None => Ok(metadata),
        }
    });

    match result {
        Ok(metadata) => {
            debug!(path = %path.display(), entries = metadata.len(), "metadata loaded");
            Ok(LoadOutcome::Loaded {
                file_size: size,
                metadata,
            })
        }
        Err(e) if e.is_corrupt() => {
            match &e {
                GGUFError::BadMagic { expected, actual } => error!(
                    path = %path.display(),
                    expected = format_args!("0x{expected:08X}"),
                    actual = format_args!("0x{actual:08X}"),
                    "Invalid GGUF magic number"
                ),
                other => error!(path = %path.display(), "Corrupt GGUF file: {other}"),
            }
            let deleted = settings.delete_corrupt && remove_corrupt(path);
            Ok(LoadOutcome::Corrupt { error: e, deleted })
        }
        Err(e) => Err(e).with_context(|| format!("reading {}", path.display())),
    }
}

fn remove_corrupt(path: &Path) -> bool {
    match fs::remove_file(path) {
        Ok(()) => {
            info!(path = %path.display(), "Deleted corrupt file");
            true
        }
        Err(e) => {
            error!(path = %path.display(), "Could not delete corrupt file: {e}");
            false
        }
    }
}
