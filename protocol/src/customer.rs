//! Customer and panel records.

use std::collections::BTreeSet;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::stages::{PackStage, ShipmentStage};

/// A manufacturing order tracked through packaging and shipment.
///
/// Customers are created when a panel roster is first ingested and are only
/// ever mutated through the lifecycle state machine in `packtrack-core`.
/// `status_history` is append-only: entries are never rewritten or dropped,
/// and the first entry always records the initial
/// `not_packed`/`not_shipped` state at creation time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Customer {
    pub id: Uuid,
    pub name: String,

    pub pack_stage: PackStage,
    pub shipment_stage: ShipmentStage,

    /// Panels whose suffix key appeared in at least one package scan.
    pub packed_count: usize,
    /// Size of the panel roster.
    pub total_parts: usize,
    /// `round(packed_count / total_parts * 100)`, or 0 with an empty roster.
    pub pack_progress: u8,

    /// Package sequence numbers associated with this customer via suffix
    /// matching. Ordered so persisted records diff cleanly.
    #[serde(default)]
    pub pack_seqs: BTreeSet<u64>,

    #[serde(default)]
    pub status_history: Vec<StatusHistoryEntry>,

    /// First time the customer reached `packed`. Set once.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pack_date: Option<DateTime<Utc>>,
    /// First time the customer was archived. Set once; later archive cycles
    /// are visible in `status_history` and in their own archive records.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archive_date: Option<DateTime<Utc>>,
    /// First time the customer entered either shipped state. Set once.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shipment_date: Option<DateTime<Utc>>,

    /// Live data directory while the customer is not archived.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_directory: Option<PathBuf>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Customer {
    /// A freshly created customer with its initial history entry.
    pub fn new(name: impl Into<String>, working_directory: PathBuf) -> Self {
        let now = Utc::now();
        let mut customer = Self {
            id: Uuid::new_v4(),
            name: name.into(),
            pack_stage: PackStage::NotPacked,
            shipment_stage: ShipmentStage::NotShipped,
            packed_count: 0,
            total_parts: 0,
            pack_progress: 0,
            pack_seqs: BTreeSet::new(),
            status_history: Vec::new(),
            pack_date: None,
            archive_date: None,
            shipment_date: None,
            working_directory: Some(working_directory),
            created_at: now,
            updated_at: now,
        };
        customer.status_history.push(StatusHistoryEntry {
            pack_stage: PackStage::NotPacked,
            shipment_stage: ShipmentStage::NotShipped,
            previous_pack_stage: PackStage::NotPacked,
            previous_shipment_stage: ShipmentStage::NotShipped,
            timestamp: now,
            operator: "system".to_string(),
            remark: Some("created".to_string()),
            pack_progress: 0,
            packed_count: 0,
            total_parts: 0,
        });
        customer
    }
}

/// One audited lifecycle transition. Captures both axes' before/after values
/// and a progress snapshot taken at transition time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusHistoryEntry {
    pub pack_stage: PackStage,
    pub shipment_stage: ShipmentStage,
    pub previous_pack_stage: PackStage,
    pub previous_shipment_stage: ShipmentStage,
    pub timestamp: DateTime<Utc>,
    pub operator: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remark: Option<String>,
    pub pack_progress: u8,
    pub packed_count: usize,
    pub total_parts: usize,
}

/// A single manufactured panel belonging to a customer.
///
/// `id` is the full manufacturing-side identifier; scan stations only ever
/// report a fixed-length suffix of it. Descriptive attributes are opaque to
/// the core and carried through unmodified.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Panel {
    pub id: String,
    pub customer_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width_mm: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height_mm: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thickness_mm: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material: Option<String>,
}

/// One roster line as supplied by the (external) roster provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RosterRecord {
    pub customer_name: String,
    pub panel_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width_mm: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height_mm: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thickness_mm: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material: Option<String>,
}
