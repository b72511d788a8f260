//! File-backed record collections.
//!
//! Each collection is one JSONL file under the data home: a record version
//! per line, appended on every write. Readers replay the log last-wins by
//! key; a compaction pass rewrites the file down to live records once dead
//! versions pile up. Every read-modify-write runs under a per-collection
//! async mutex (distinct from the per-customer lock in [`crate::locks`]),
//! so near-simultaneous completions of two customers' operations cannot
//! lose updates.

mod archives;
mod customers;
mod panels;

pub use archives::ArchiveStore;
pub use customers::CustomerStore;
pub use panels::PanelStore;

use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::io::AsyncWriteExt;

use crate::error::Result;

/// Append one record version to a log.
pub(crate) async fn append_line<T: Serialize>(path: &Path, record: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let mut line = serde_json::to_string(record)?;
    line.push('\n');
    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    file.write_all(line.as_bytes()).await?;
    file.flush().await?;
    Ok(())
}

/// Replay a log. Missing file reads as empty; a trailing half-written line
/// (crash mid-append) is ignored, everything before it is kept.
pub(crate) async fn read_log<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let raw = match tokio::fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(err.into()),
    };

    let mut records = Vec::new();
    let lines: Vec<&str> = raw.lines().collect();
    for (idx, line) in lines.iter().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str(line) {
            Ok(record) => records.push(record),
            Err(err) if idx + 1 == lines.len() => {
                tracing::warn!(file = %path.display(), %err, "dropping torn tail record");
            }
            Err(err) => return Err(err.into()),
        }
    }
    Ok(records)
}

/// Replace a log with the given records via temp file + atomic rename.
pub(crate) async fn rewrite_log<T: Serialize>(path: &Path, records: &[T]) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let mut contents = String::new();
    for record in records {
        contents.push_str(&serde_json::to_string(record)?);
        contents.push('\n');
    }
    let temp_path = path.with_extension("jsonl.tmp");
    tokio::fs::write(&temp_path, contents).await?;
    tokio::fs::rename(&temp_path, path).await?;
    Ok(())
}
