use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use gguf_metadata::ModelSummary;
use tokio::sync::Semaphore;
use tracing::{info, warn};

use crate::cli::{GlobalArgs, ScanArgs};
use crate::loader::{LoadOutcome, LoadSettings, load_metadata};

/// One row of the scan table.
#[derive(Debug)]
struct ScanRow {
    path: PathBuf,
    status: &'static str,
    file_size: u64,
    entries: usize,
    summary: ModelSummary,
}

pub async fn execute(global: GlobalArgs, args: ScanArgs) -> anyhow::Result<()> {
    let cfg = global.resolve_config()?;
    let search_dir = args.dir.unwrap_or_else(|| PathBuf::from("."));
    if !search_dir.is_dir() {
        anyhow::bail!("{} is not a directory", search_dir.display());
    }

    let mut files = Vec::new();
    walk_dir(&search_dir, &mut files)?;
    files.sort();

    if files.is_empty() {
        println!("No GGUF models found in {}", search_dir.display());
        return Ok(());
    }

    let jobs = args.jobs.unwrap_or(cfg.scan_jobs).max(1);
    info!(dir = %search_dir.display(), files = files.len(), jobs, "scanning");

    let settings = LoadSettings::from_config(&cfg, true);
    let rows = scan_files(files, settings, jobs).await?;

    println!(
        "{:<40} {:<12} {:<10} {:<10} {:>8}  {}",
        "Name", "Arch", "Quant", "Size", "Entries", "Status"
    );
    println!("{}", "-".repeat(94));
    for row in &rows {
        let name = row.summary.name.clone().unwrap_or_else(|| {
            row.path
                .file_stem()
                .unwrap_or_default()
                .to_string_lossy()
                .into_owned()
        });
        println!(
            "{:<40} {:<12} {:<10} {:<10} {:>8}  {}",
            name,
            row.summary.architecture.as_deref().unwrap_or("-"),
            row.summary.file_type_name.as_deref().unwrap_or("-"),
            human_size(row.file_size),
            row.entries,
            row.status
        );
    }

    let bad = rows.iter().filter(|r| r.status != "ok" && r.status != "partial").count();
    println!("\n{} file(s) scanned, {bad} invalid.", rows.len());
    Ok(())
}

/// Decode every file on the blocking pool, at most `jobs` at a time.
///
/// Each task opens its own file, so no decoder state is shared.
async fn scan_files(
    files: Vec<PathBuf>,
    settings: LoadSettings,
    jobs: usize,
) -> anyhow::Result<Vec<ScanRow>> {
    let permits = Arc::new(Semaphore::new(jobs));
    let mut handles = Vec::with_capacity(files.len());

    for path in files {
        let permit = permits.clone().acquire_owned().await?;
        handles.push(tokio::task::spawn_blocking(move || {
            let _permit = permit;
            scan_one(path, &settings)
        }));
    }

    let mut rows = Vec::with_capacity(handles.len());
    for handle in handles {
        rows.push(handle.await?);
    }
    Ok(rows)
}

fn scan_one(path: PathBuf, settings: &LoadSettings) -> ScanRow {
    let outcome = match load_metadata(&path, settings) {
        Ok(o) => o,
        Err(e) => {
            warn!(path = %path.display(), "Scan failed: {e:#}");
            return ScanRow {
                path,
                status: "error",
                file_size: 0,
                entries: 0,
                summary: ModelSummary::default(),
            };
        }
    };

    let status = outcome.status();
    let (file_size, entries, summary) = match &outcome {
        LoadOutcome::Loaded {
            file_size,
            metadata,
        } => (*file_size, metadata.len(), ModelSummary::from_metadata(metadata)),
        LoadOutcome::TooSmall { size, .. } => (*size, 0, ModelSummary::default()),
        LoadOutcome::Missing | LoadOutcome::Corrupt { .. } => (0, 0, ModelSummary::default()),
    };

    ScanRow {
        path,
        status,
        file_size,
        entries,
        summary,
    }
}

fn walk_dir(dir: &Path, out: &mut Vec<PathBuf>) -> anyhow::Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        // Symlinked directories are not followed, so link cycles cannot recurse.
        if entry.file_type()?.is_dir() {
            walk_dir(&path, out)?;
        } else if path.extension().and_then(|e| e.to_str()) == Some("gguf") {
            out.push(path);
        }
    }
    Ok(())
}

fn human_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KiB", "MiB", "GiB", "TiB"];
    let mut size = bytes as f64;
    for &unit in UNITS {
        if size < 1024.0 {
            return format!("{size:.1} {unit}");
        }
        size /= 1024.0;
    }
    format!("{size:.1} PiB")
}

#[cfg(test)]
mod tests {
    use gguf_metadata::MetadataOptions;
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn walk_finds_nested_gguf_files_only() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("a.gguf"), b"").unwrap();
        fs::write(dir.path().join("sub").join("b.gguf"), b"").unwrap();
        fs::write(dir.path().join("notes.txt"), b"").unwrap();

        let mut found = Vec::new();
        walk_dir(dir.path(), &mut found).unwrap();
        found.sort();
        assert_eq!(found, [dir.path().join("a.gguf"), dir.path().join("sub").join("b.gguf")]);
    }

    #[cfg(unix)]
    #[test]
    fn walk_skips_directory_symlink_cycles() {
        let dir = TempDir::new().unwrap();
        let sub = dir.path().join("sub");
        fs::create_dir(&sub).unwrap();
        fs::write(sub.join("b.gguf"), b"").unwrap();
        std::os::unix::fs::symlink(dir.path(), sub.join("loop")).unwrap();

        let mut found = Vec::new();
        walk_dir(dir.path(), &mut found).unwrap();
        assert_eq!(found, [sub.join("b.gguf")]);
    }

    #[tokio::test]
    async fn concurrent_scan_keeps_file_order() {
        let dir = TempDir::new().unwrap();
        let mut files = Vec::new();
        for i in 0..6 {
            let path = dir.path().join(format!("m{i}.gguf"));
            fs::write(&path, vec![0u8; 32]).unwrap();
            files.push(path);
        }
        let settings = LoadSettings {
            min_file_size: 16,
            delete_corrupt: false,
            options: MetadataOptions::default(),
        };

        let rows = scan_files(files.clone(), settings, 2).await.unwrap();
        let paths: Vec<_> = rows.iter().map(|r| r.path.clone()).collect();
        assert_eq!(paths, files);
        assert!(rows.iter().all(|r| r.status == "corrupt"));
    }

    #[test]
    fn truncated_file_counts_as_corrupt_in_scan() {
        let dir = TempDir::new().unwrap();
        let mut data = b"GGUF".to_vec();
        data.extend_from_slice(&3u32.to_le_bytes());
        data.extend_from_slice(&0u64.to_le_bytes());
        data.extend_from_slice(&2u64.to_le_bytes());
        // First entry: a bool, then a key whose declared length runs past EOF.
        data.extend_from_slice(&1u64.to_le_bytes());
        data.extend_from_slice(b"a");
        data.extend_from_slice(&7u32.to_le_bytes());
        data.push(1);
        data.extend_from_slice(&4096u64.to_le_bytes());
        data.resize(2048, b'x');
        let path = dir.path().join("cut.gguf");
        fs::write(&path, &data).unwrap();

        let settings = LoadSettings {
            min_file_size: 1024,
            delete_corrupt: true,
            options: MetadataOptions::quick(8 * 1024 * 1024),
        };
        let row = scan_one(path.clone(), &settings);
        assert_eq!(row.status, "deleted");
        assert!(!path.exists());
    }

    #[test]
    fn human_sizes() {
        assert_eq!(human_size(512), "512.0 B");
        assert_eq!(human_size(4 * 1024 * 1024), "4.0 MiB");
    }
}
