//! Package scan records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One scan-station record bundling panels into a physical packing unit.
///
/// Packages are produced entirely outside the core and carry no customer
/// reference; association is inferred by suffix matching against each
/// customer's panel roster. The reported `part_ids` may be full identifiers
/// or the fixed-length suffixes printed on on-floor barcode labels.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Package {
    /// Sequence number, unique per packing-station run.
    pub pack_seq: u64,
    /// Identifiers as reported by the scanner, possibly truncated.
    pub part_ids: Vec<String>,
    #[serde(default)]
    pub info: PackageInfo,
    pub timestamp: DateTime<Utc>,
}

/// Quantity/weight payload attached to a scan. Opaque to the core.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PackageInfo {
    #[serde(default)]
    pub quantity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight_kg: Option<f64>,
}
