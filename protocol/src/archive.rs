//! Archive records.
//!
//! An [`ArchiveRecord`] is written once per archive operation and never
//! mutated afterwards. Restoring a customer reverts the *customer's* stage;
//! it does not remove the record, so a customer cycled through several
//! archive/restore rounds accumulates one record per round.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ArchiveRecord {
    pub id: Uuid,
    pub customer_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_address: Option<String>,
    pub archive_date: DateTime<Utc>,
    /// Compressed snapshot of the customer's working directory.
    pub backup_artifact_path: std::path::PathBuf,
    pub packages_count: usize,
    pub total_parts_count: usize,
    pub archive_user: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remark: Option<String>,
    #[serde(default)]
    pub packages: Vec<PackageArchiveEntry>,
}

/// Snapshot of one package at archive time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PackageArchiveEntry {
    pub pack_seq: u64,
    pub quantity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight_kg: Option<f64>,
    #[serde(default)]
    pub parts: Vec<PartArchiveEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PartArchiveEntry {
    pub part_id: String,
}

/// One page of archive records, newest first.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ArchivesPage {
    pub items: Vec<ArchiveRecord>,
    pub page: usize,
    pub page_size: usize,
    pub total: usize,
}
