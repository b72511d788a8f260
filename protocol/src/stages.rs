//! Lifecycle stage enums.
//!
//! A customer moves along two orthogonal axes: the packaging axis
//! (`PackStage`) and the shipping axis (`ShipmentStage`). Guards between
//! the axes live in `packtrack-core`; these types only name the states.

use serde::{Deserialize, Serialize};

/// Packaging lifecycle stage.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PackStage {
    /// No scanned panel belongs to this customer yet.
    #[default]
    NotPacked,
    /// Some, but not all, panels have been scanned into packages.
    InProgress,
    /// Every panel appears in at least one package scan.
    Packed,
    /// Working data has been snapshotted into the archive store.
    Archived,
}

impl PackStage {
    /// Whether a customer in this stage may enter a shipped state.
    pub fn is_shippable(self) -> bool {
        matches!(self, PackStage::Packed | PackStage::Archived)
    }
}

/// Shipping lifecycle stage.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ShipmentStage {
    #[default]
    NotShipped,
    PartialShipped,
    FullShipped,
}

impl ShipmentStage {
    pub fn is_shipped(self) -> bool {
        matches!(
            self,
            ShipmentStage::PartialShipped | ShipmentStage::FullShipped
        )
    }
}

/// Operator-selected shipping mode for `ship_customer`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ShipMode {
    Partial,
    Full,
}

impl ShipMode {
    pub fn target_stage(self) -> ShipmentStage {
        match self {
            ShipMode::Partial => ShipmentStage::PartialShipped,
            ShipMode::Full => ShipmentStage::FullShipped,
        }
    }
}
