//! Application configuration — persisted as JSON.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Global configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Files below this size are rejected before decoding.
    #[serde(default = "default_min_file_size")]
    pub min_file_size: u64,
    /// Remove files that fail validation.
    #[serde(default)]
    pub delete_corrupt: bool,
    /// Byte window for `--quick` reads.
    #[serde(default = "default_quick_scan_limit")]
    pub quick_scan_limit: u64,
    /// Files decoded concurrently by `scan`.
    #[serde(default = "default_scan_jobs")]
    pub scan_jobs: usize,
}

fn default_min_file_size() -> u64 {
    1024
}
fn default_quick_scan_limit() -> u64 {
    8 * 1024 * 1024
}
fn default_scan_jobs() -> usize {
    4
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            min_file_size: default_min_file_size(),
            delete_corrupt: false,
            quick_scan_limit: default_quick_scan_limit(),
            scan_jobs: default_scan_jobs(),
        }
    }
}

impl AppConfig {
    /// Platform config directory: `~/.config/gguf-inspect/`
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("gguf-inspect")
    }

    fn config_file() -> PathBuf {
        Self::config_dir().join("config.json")
    }

    /// Load from disk, or return defaults if the file doesn't exist.
    pub fn load_or_default() -> anyhow::Result<Self> {
        Self::load_from(&Self::config_file())
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let data = std::fs::read_to_string(path)?;
            Ok(serde_json::from_str(&data)?)
        } else {
            Ok(Self::default())
        }
    }

    /// Persist to disk.
    pub fn save(&self) -> anyhow::Result<()> {
        self.save_to(&Self::config_file())
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let data = serde_json::to_string_pretty(self)?;
        std::fs::write(path, data)?;
        Ok(())
    }

    /// Update one field from its string form.
    pub fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        match key {
            "min_file_size" => self.min_file_size = value.parse()?,
            "delete_corrupt" => self.delete_corrupt = value.parse()?,
            "quick_scan_limit" => self.quick_scan_limit = value.parse()?,
            "scan_jobs" => {
                let jobs: usize = value.parse()?;
                if jobs == 0 {
                    anyhow::bail!("scan_jobs must be at least 1");
                }
                self.scan_jobs = jobs;
            }
            _ => anyhow::bail!("Unknown config key: {key}"),
        }
        Ok(())
    }
}
