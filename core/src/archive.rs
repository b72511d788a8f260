//! Working-directory snapshot artifacts.
//!
//! An artifact is a `.tar.gz` of the customer's entire working directory
//! with an embedded `manifest.json` carrying per-file sha256 checksums.
//! Creation and extraction are blocking work and run under
//! `spawn_blocking`; both are atomic from the caller's point of view: a
//! failed snapshot leaves no artifact behind, a failed restore leaves no
//! half-populated destination.

use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::info;

use crate::error::{Result, TrackerError};

const MANIFEST_NAME: &str = "manifest.json";

/// Checksums and metadata embedded in every artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactManifest {
    pub customer_name: String,
    /// RFC3339 creation timestamp.
    pub created_at: String,
    pub files: Vec<FileEntry>,
    pub total_size: u64,
    pub version: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileEntry {
    /// Path relative to the working directory root.
    pub path: String,
    pub sha256: String,
    pub size: u64,
}

impl ArtifactManifest {
    fn new(customer_name: &str) -> Self {
        Self {
            customer_name: customer_name.to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
            files: Vec::new(),
            total_size: 0,
            version: 1,
        }
    }
}

fn sha256_of_file(path: &Path) -> io::Result<String> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];
    loop {
        let n = reader.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

fn sha256_of_bytes(data: &[u8]) -> String {
    format!("{:x}", Sha256::digest(data))
}

fn collect_files(root: &Path, base: &Path, entries: &mut Vec<FileEntry>) -> io::Result<()> {
    for entry in fs::read_dir(root)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            collect_files(&path, base, entries)?;
        } else {
            let relative = path
                .strip_prefix(base)
                .map_err(io::Error::other)?
                .to_string_lossy()
                .replace('\\', "/");
            entries.push(FileEntry {
                path: relative,
                sha256: sha256_of_file(&path)?,
                size: fs::metadata(&path)?.len(),
            });
        }
    }
    Ok(())
}

fn snapshot_sync(
    source_dir: &Path,
    artifact_path: &Path,
    customer_name: &str,
) -> Result<ArtifactManifest> {
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use tar::Builder;

    if !source_dir.is_dir() {
        return Err(TrackerError::NotFound(format!(
            "working directory {} does not exist",
            source_dir.display()
        )));
    }

    let mut manifest = ArtifactManifest::new(customer_name);
    collect_files(source_dir, source_dir, &mut manifest.files)?;
    manifest.files.sort_by(|a, b| a.path.cmp(&b.path));
    manifest.total_size = manifest.files.iter().map(|f| f.size).sum();

    if let Some(parent) = artifact_path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = File::create(artifact_path)?;
    let encoder = GzEncoder::new(file, Compression::default());
    let mut builder = Builder::new(encoder);

    for entry in &manifest.files {
        builder.append_path_with_name(source_dir.join(&entry.path), &entry.path)?;
    }

    let manifest_json = serde_json::to_string_pretty(&manifest)?;
    let manifest_bytes = manifest_json.as_bytes();
    let mut header = tar::Header::new_gnu();
    header.set_path(MANIFEST_NAME)?;
    header.set_size(manifest_bytes.len() as u64);
    header.set_mode(0o644);
    header.set_cksum();
    builder.append(&header, manifest_bytes)?;

    let encoder = builder.into_inner()?;
    encoder.finish()?;

    Ok(manifest)
}

/// Compress `source_dir` into `artifact_path`.
///
/// On any failure the partially written artifact is removed before the
/// error is returned, so retries never see a stale half-archive.
pub async fn snapshot_dir(
    source_dir: &Path,
    artifact_path: &Path,
    customer_name: &str,
) -> Result<ArtifactManifest> {
    let source_dir = source_dir.to_path_buf();
    let artifact = artifact_path.to_path_buf();
    let name = customer_name.to_string();

    let outcome = tokio::task::spawn_blocking(move || {
        let result = snapshot_sync(&source_dir, &artifact, &name);
        if result.is_err() {
            let _ = fs::remove_file(&artifact);
        }
        result
    })
    .await
    .map_err(|err| TrackerError::Artifact(format!("snapshot task failed: {err}")))??;

    info!(
        artifact = %artifact_path.display(),
        files = outcome.files.len(),
        bytes = outcome.total_size,
        "snapshot written"
    );
    Ok(outcome)
}

/// Read the embedded manifest without extracting anything.
pub fn read_manifest(artifact_path: &Path) -> Result<ArtifactManifest> {
    use flate2::read::GzDecoder;
    use tar::Archive;

    let file = File::open(artifact_path)?;
    let mut archive = Archive::new(GzDecoder::new(file));
    for entry in archive.entries()? {
        let mut entry = entry?;
        if entry.path()?.to_string_lossy() == MANIFEST_NAME {
            let mut contents = String::new();
            entry.read_to_string(&mut contents)?;
            return Ok(serde_json::from_str(&contents)?);
        }
    }
    Err(TrackerError::Artifact(format!(
        "{MANIFEST_NAME} missing from {}",
        artifact_path.display()
    )))
}

fn restore_sync(artifact_path: &Path, dest_dir: &Path) -> Result<Vec<PathBuf>> {
    use flate2::read::GzDecoder;
    use tar::Archive;

    let manifest = read_manifest(artifact_path)?;

    // Recreate, never merge: a restore lands in a fresh directory.
    if dest_dir.exists() {
        fs::remove_dir_all(dest_dir)?;
    }
    fs::create_dir_all(dest_dir)?;

    let extract = || -> Result<Vec<PathBuf>> {
        let file = File::open(artifact_path)?;
        let mut archive = Archive::new(GzDecoder::new(file));
        let mut restored = Vec::new();

        for entry in archive.entries()? {
            let mut entry = entry?;
            let rel = entry.path()?.to_string_lossy().to_string();
            if rel == MANIFEST_NAME || entry.header().entry_type().is_dir() {
                continue;
            }

            let mut contents = Vec::new();
            entry.read_to_end(&mut contents)?;

            let expected = manifest.files.iter().find(|f| f.path == rel);
            match expected {
                Some(expected) if expected.sha256 == sha256_of_bytes(&contents) => {}
                Some(expected) => {
                    return Err(TrackerError::Artifact(format!(
                        "checksum mismatch for `{rel}` (expected {})",
                        expected.sha256
                    )));
                }
                None => {
                    return Err(TrackerError::Artifact(format!(
                        "`{rel}` not listed in manifest"
                    )));
                }
            }

            let target = dest_dir.join(&rel);
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&target, contents)?;
            restored.push(target);
        }

        if restored.len() != manifest.files.len() {
            return Err(TrackerError::Artifact(format!(
                "artifact holds {} files, manifest lists {}",
                restored.len(),
                manifest.files.len()
            )));
        }
        Ok(restored)
    };

    match extract() {
        Ok(restored) => Ok(restored),
        Err(err) => {
            // leave no half-populated destination behind
            let _ = fs::remove_dir_all(dest_dir);
            Err(err)
        }
    }
}

/// Decompress `artifact_path` into a freshly created `dest_dir`, verifying
/// every file against the embedded manifest. Returns the restored paths.
pub async fn restore_dir(artifact_path: &Path, dest_dir: &Path) -> Result<Vec<PathBuf>> {
    let artifact = artifact_path.to_path_buf();
    let dest = dest_dir.to_path_buf();

    let restored = tokio::task::spawn_blocking(move || restore_sync(&artifact, &dest))
        .await
        .map_err(|err| TrackerError::Artifact(format!("restore task failed: {err}")))??;

    info!(
        artifact = %artifact_path.display(),
        dest = %dest_dir.display(),
        files = restored.len(),
        "snapshot restored"
    );
    Ok(restored)
}
