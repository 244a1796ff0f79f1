pub mod config_cmd;
pub mod inspect;
pub mod scan;
pub mod tags;

use clap::{Parser, Subcommand};

use crate::config::AppConfig;

#[derive(Parser)]
#[command(
    name = "gguf-inspect",
    version,
    about = "Inspect and validate GGUF model metadata"
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, clap::Args, Clone)]
pub struct GlobalArgs {
    /// Files smaller than this many bytes are treated as corrupt.
    #[arg(long = "min-size", global = true, env = "GGUF_MIN_SIZE")]
    pub min_file_size: Option<u64>,

    /// Delete files that fail validation.
    #[arg(long, global = true, env = "GGUF_DELETE_CORRUPT")]
    pub delete_corrupt: bool,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    pub log_json: bool,
}

impl GlobalArgs {
    /// Load the persisted config and apply command-line overrides.
    pub fn resolve_config(&self) -> anyhow::Result<AppConfig> {
        let mut cfg = AppConfig::load_or_default()?;
        if let Some(min) = self.min_file_size {
            cfg.min_file_size = min;
        }
        if self.delete_corrupt {
            cfg.delete_corrupt = true;
        }
        Ok(cfg)
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Decode and print the metadata of one GGUF file.
    Inspect(InspectArgs),

    /// Validate every GGUF file under a directory.
    Scan(ScanArgs),

    /// List the value types the decoder understands.
    Tags,

    /// View / edit configuration.
    Config(ConfigArgs),
}

//  Subcommand argument structs

#[derive(Debug, clap::Args, Clone)]
pub struct InspectArgs {
    /// Path to a GGUF file.
    pub path: std::path::PathBuf,

    /// Print JSON instead of a table.
    #[arg(long)]
    pub json: bool,

    /// Only read metadata within the quick-scan window.
    #[arg(long)]
    pub quick: bool,
}

#[derive(Debug, clap::Args, Clone)]
pub struct ScanArgs {
    /// Directory to scan (default: current directory).
    pub dir: Option<std::path::PathBuf>,

    /// Files decoded concurrently (default: from config).
    #[arg(long)]
    pub jobs: Option<usize>,
}

#[derive(Debug, clap::Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Display the current configuration.
    Show,
    /// Set a configuration value.
    Set { key: String, value: String },
}
