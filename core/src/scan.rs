//! Reading package scan drops from a customer's working directory.
//!
//! The packing station (or the out-of-scope file-watching layer in front of
//! it) drops `.jsonl` files into the working directory's scans subdir, one
//! [`Package`] per line. This module only performs the read; change
//! detection belongs to the caller.

use std::path::Path;

use packtrack_protocol::Package;
use tracing::warn;

use crate::error::Result;

/// Read every package record under `scans_dir`.
///
/// Files are visited in name order so `pack_seq` collisions resolve
/// deterministically. Unparseable lines are skipped with a warning rather
/// than failing the whole read; a half-written line from a concurrent drop
/// must not wedge status recomputation.
pub async fn read_packages(scans_dir: &Path) -> Result<Vec<Package>> {
    let mut packages = Vec::new();
    if !scans_dir.is_dir() {
        return Ok(packages);
    }

    let mut entries = Vec::new();
    let mut dir = tokio::fs::read_dir(scans_dir).await?;
    while let Some(entry) = dir.next_entry().await? {
        let path = entry.path();
        if path.extension().map(|ext| ext == "jsonl").unwrap_or(false) {
            entries.push(path);
        }
    }
    entries.sort();

    for path in entries {
        let raw = tokio::fs::read_to_string(&path).await?;
        for (line_no, line) in raw.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<Package>(line) {
                Ok(package) => packages.push(package),
                Err(err) => {
                    warn!(
                        file = %path.display(),
                        line = line_no + 1,
                        %err,
                        "skipping unparseable scan record"
                    );
                }
            }
        }
    }

    Ok(packages)
}
