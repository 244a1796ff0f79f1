use std::path::PathBuf;

use gguf_metadata::{GGUFHeader, GGUFMetadataKV, GGUFValue, ModelSummary};
use serde::Serialize;

use crate::cli::{GlobalArgs, InspectArgs};
use crate::loader::{LoadOutcome, LoadSettings, load_metadata};

/// Array elements shown before eliding the rest.
const ARRAY_PREVIEW: usize = 8;
/// Characters of a string shown before eliding the rest.
const TEXT_PREVIEW: usize = 120;

#[derive(Serialize)]
struct InspectReport<'a> {
    path: PathBuf,
    file_size: u64,
    complete: bool,
    header: &'a GGUFHeader,
    summary: ModelSummary,
    metadata: &'a [GGUFMetadataKV],
}

pub async fn execute(global: GlobalArgs, args: InspectArgs) -> anyhow::Result<()> {
    let cfg = global.resolve_config()?;
    let settings = LoadSettings::from_config(&cfg, args.quick);
    let path = args.path.clone();

    let outcome = tokio::task::spawn_blocking(move || load_metadata(&path, &settings)).await??;

    let (file_size, metadata) = match outcome {
        LoadOutcome::Loaded {
            file_size,
            metadata,
        } => (file_size, metadata),
        LoadOutcome::Missing => anyhow::bail!("{} does not exist", args.path.display()),
        LoadOutcome::TooSmall { size, deleted } => anyhow::bail!(
            "{} is too small to be a GGUF file ({size} bytes){}",
            args.path.display(),
            if deleted { ", deleted" } else { "" }
        ),
        LoadOutcome::Corrupt { error, deleted } => anyhow::bail!(
            "{} is not a valid GGUF file: {error}{}",
            args.path.display(),
            if deleted { ", deleted" } else { "" }
        ),
    };

    let report = InspectReport {
        path: args.path,
        file_size,
        complete: metadata.is_complete(),
        header: &metadata.header,
        summary: ModelSummary::from_metadata(&metadata),
        metadata: &metadata.entries,
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let h = report.header;
    println!("{}", report.path.display());
    println!(
        "  GGUF v{}, {} tensors, {} metadata entries{}",
        h.version,
        h.tensor_count,
        h.metadata_kv_count,
        if report.complete { "" } else { " (partial read)" }
    );
    let s = &report.summary;
    let field = |v: &Option<String>| v.clone().unwrap_or_else(|| "-".into());
    println!("  name:          {}", field(&s.name));
    println!("  architecture:  {}", field(&s.architecture));
    println!("  quantization:  {}", field(&s.file_type_name));
    println!(
        "  context:       {}",
        s.context_length.map(|c| c.to_string()).unwrap_or_else(|| "-".into())
    );
    if s.opaque_strings > 0 {
        println!("  non-UTF-8 strings: {}", s.opaque_strings);
    }
    println!();

    let width = report.metadata.iter().map(|kv| kv.key.len()).max().unwrap_or(0);
    for kv in report.metadata {
        println!(
            "{:<width$}  {:<8} {}",
            kv.key,
            kv.value_type.name(),
            render(&kv.value)
        );
    }
    Ok(())
}

/// One-line rendering of a value, eliding long strings and arrays.
fn render(value: &GGUFValue) -> String {
    match value {
        GGUFValue::Uint8(v) => v.to_string(),
        GGUFValue::Int8(v) => v.to_string(),
        GGUFValue::Uint16(v) => v.to_string(),
        GGUFValue::Int16(v) => v.to_string(),
        GGUFValue::Uint32(v) => v.to_string(),
        GGUFValue::Int32(v) => v.to_string(),
        GGUFValue::Float32(v) => v.to_string(),
        GGUFValue::Bool(v) => v.to_string(),
        GGUFValue::Uint64(v) => v.to_string(),
        GGUFValue::Int64(v) => v.to_string(),
        GGUFValue::Float64(v) => v.to_string(),
        GGUFValue::Text(s) => {
            let mut out: String = s.chars().take(TEXT_PREVIEW).collect();
            if s.chars().count() > TEXT_PREVIEW {
                out.push('…');
            }
            format!("{out:?}")
        }
        GGUFValue::OpaqueBytes(b) => format!("<{} non-UTF-8 bytes>", b.len()),
        GGUFValue::Array {
            element_type,
            values,
        } => {
            let shown: Vec<String> = values.iter().take(ARRAY_PREVIEW).map(render).collect();
            let more = if values.len() > ARRAY_PREVIEW { ", …" } else { "" };
            format!(
                "[{}{more}] ({} × {})",
                shown.join(", "),
                values.len(),
                element_type.name()
            )
        }
    }
}
