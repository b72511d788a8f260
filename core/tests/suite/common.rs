//! Shared fixtures for the integration suite.

use std::path::{Path, PathBuf};
use std::sync::Once;

use packtrack_core::{Tracker, TrackerConfig};
use packtrack_protocol::RosterRecord;
use tempfile::TempDir;

static INIT_TRACING: Once = Once::new();

/// Route tracing output through the test harness. Controlled by
/// `RUST_LOG`, silent by default.
fn init_tracing() {
    INIT_TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

pub fn tracker_in(temp: &TempDir) -> Tracker {
    init_tracing();
    let config = TrackerConfig::with_defaults(temp.path());
    Tracker::new(config).unwrap()
}

pub fn roster(customer_name: &str, panel_ids: &[&str]) -> Vec<RosterRecord> {
    panel_ids
        .iter()
        .map(|panel_id| RosterRecord {
            customer_name: customer_name.to_string(),
            panel_id: panel_id.to_string(),
            width_mm: None,
            height_mm: None,
            thickness_mm: None,
            material: None,
        })
        .collect()
}

/// Drop one scan file into a customer's working directory, the way the
/// packing-station watcher would.
pub fn drop_scan(working_dir: &Path, file_stem: &str, pack_seq: u64, part_ids: &[&str]) {
    let line = serde_json::json!({
        "pack_seq": pack_seq,
        "part_ids": part_ids,
        "info": {"quantity": part_ids.len()},
        "timestamp": "2025-11-02T08:00:00Z",
    });
    let scans = working_dir.join("scans");
    std::fs::create_dir_all(&scans).unwrap();
    std::fs::write(scans.join(format!("{file_stem}.jsonl")), format!("{line}\n")).unwrap();
}

/// Sorted relative paths of every file under `root`.
pub fn file_set(root: &Path) -> Vec<PathBuf> {
    fn walk(dir: &Path, base: &Path, out: &mut Vec<PathBuf>) {
        for entry in std::fs::read_dir(dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                walk(&path, base, out);
            } else {
                out.push(path.strip_prefix(base).unwrap().to_path_buf());
            }
        }
    }
    let mut out = Vec::new();
    walk(root, root, &mut out);
    out.sort();
    out
}
