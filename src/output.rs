//! JSON report sink with append semantics.
//!
//! Results accumulate across runs: an existing JSON array grows in place,
//! a single object is promoted to a one-element array, and anything
//! unreadable is backed up byte-for-byte before starting fresh. Corrupt
//! prior output must never make a finished scrape unwritable.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::Value;
use tracing::{error, info};

/// Append records to the JSON array at `path`, creating it if needed.
pub fn append_records<T: Serialize>(records: &[T], path: &Path) -> anyhow::Result<()> {
    let mut existing: Vec<Value> = Vec::new();

    if path.exists() {
        let raw = fs::read(path)
            .with_context(|| format!("failed to read existing output {}", path.display()))?;
        match serde_json::from_slice::<Value>(&raw) {
            Ok(Value::Array(items)) => existing = items,
            Ok(value @ Value::Object(_)) => existing = vec![value],
            Ok(_) | Err(_) => {
                error!(path = %path.display(), "existing output is not a JSON array or object; backing up and resetting");
                if !raw.is_empty() {
                    let backup = backup_path(path);
                    fs::copy(path, &backup).with_context(|| {
                        format!("failed to back up corrupt output to {}", backup.display())
                    })?;
                    info!(backup = %backup.display(), "backup created");
                }
            }
        }
    }

    for record in records {
        existing.push(serde_json::to_value(record)?);
    }

    let file = fs::File::create(path)
        .with_context(|| format!("failed to create output file {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    // Four-space indent; serde_json leaves non-ASCII unescaped.
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut writer, formatter);
    existing
        .serialize(&mut serializer)
        .with_context(|| format!("failed to write output file {}", path.display()))?;
    writer.flush()?;

    info!(path = %path.display(), appended = records.len(), total = existing.len(), "saved records");
    Ok(())
}

/// Sibling path with a `backup_` prefix on the file name.
fn backup_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output.json".to_string());
    path.with_file_name(format!("backup_{name}"))
}
