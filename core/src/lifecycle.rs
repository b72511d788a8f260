//! Customer lifecycle state machine.
//!
//! All stage mutations funnel through this module. Each committed
//! transition appends exactly one [`StatusHistoryEntry`] capturing both
//! axes' before/after values plus a progress snapshot; history is never
//! rewritten or truncated. First-occurrence timestamps (`pack_date`,
//! `archive_date`, `shipment_date`) are set exactly once.

use chrono::Utc;
use packtrack_protocol::{Customer, PackStage, ShipMode, ShipmentStage, StatusHistoryEntry};
use tracing::debug;

use crate::error::{Result, TrackerError};
use crate::reconcile::ReconcileOutcome;

/// Append one audit entry reflecting the customer's current (already
/// mutated) stages against the given previous values.
fn push_history(
    customer: &mut Customer,
    previous_pack_stage: PackStage,
    previous_shipment_stage: ShipmentStage,
    operator: &str,
    remark: Option<String>,
) {
    let now = Utc::now();
    customer.status_history.push(StatusHistoryEntry {
        pack_stage: customer.pack_stage,
        shipment_stage: customer.shipment_stage,
        previous_pack_stage,
        previous_shipment_stage,
        timestamp: now,
        operator: operator.to_string(),
        remark,
        pack_progress: customer.pack_progress,
        packed_count: customer.packed_count,
        total_parts: customer.total_parts,
    });
    customer.updated_at = now;
}

/// Fold a reconciliation outcome into the customer.
///
/// Counts and package associations are always refreshed. The pack stage
/// follows the suggestion in both directions between `not_packed`,
/// `in_progress` and `packed`; scan data can shrink as well as grow.
/// Archived customers must not be passed here; their working directory is
/// gone and any recompute would spuriously demote them.
///
/// Returns `true` when anything observable changed.
pub fn apply_reconcile(
    customer: &mut Customer,
    outcome: &ReconcileOutcome,
    operator: &str,
) -> Result<bool> {
    if customer.pack_stage == PackStage::Archived {
        return Err(TrackerError::InvalidState(format!(
            "customer `{}` is archived; reconciliation does not apply",
            customer.name
        )));
    }

    let counts_changed = customer.packed_count != outcome.packed_count
        || customer.total_parts != outcome.total_parts
        || customer.pack_progress != outcome.pack_progress
        || customer.pack_seqs != outcome.pack_seqs;

    customer.packed_count = outcome.packed_count;
    customer.total_parts = outcome.total_parts;
    customer.pack_progress = outcome.pack_progress;
    customer.pack_seqs = outcome.pack_seqs.clone();

    let stage_changed = customer.pack_stage != outcome.suggested_stage;
    if stage_changed {
        set_pack_stage(customer, outcome.suggested_stage, operator, None)?;
    } else if counts_changed {
        customer.updated_at = Utc::now();
    }

    Ok(stage_changed || counts_changed)
}

/// Commit a pack-stage transition, enforcing the allowed edges:
///
/// - `not_packed` / `in_progress` / `packed` move freely among themselves
///   (reconciliation-driven);
/// - `packed -> archived` (archive operation);
/// - `archived -> packed` (restore operation).
///
/// Everything else is a [`TrackerError::InvalidTransition`].
pub fn set_pack_stage(
    customer: &mut Customer,
    target: PackStage,
    operator: &str,
    remark: Option<String>,
) -> Result<()> {
    let current = customer.pack_stage;
    if current == target {
        return Ok(());
    }

    let allowed = match (current, target) {
        (PackStage::Archived, PackStage::Packed) => true,
        (PackStage::Packed, PackStage::Archived) => true,
        (PackStage::Archived, _) | (_, PackStage::Archived) => false,
        // the three reconciliation-driven stages move freely
        _ => true,
    };
    if !allowed {
        return Err(TrackerError::InvalidTransition(format!(
            "pack stage {current:?} -> {target:?} is not allowed for customer `{}`",
            customer.name
        )));
    }

    debug!(customer = %customer.name, ?current, ?target, "pack stage transition");
    customer.pack_stage = target;

    let now = Utc::now();
    if target == PackStage::Packed && customer.pack_date.is_none() {
        customer.pack_date = Some(now);
    }
    if target == PackStage::Archived && customer.archive_date.is_none() {
        customer.archive_date = Some(now);
    }

    let shipment_stage = customer.shipment_stage;
    push_history(customer, current, shipment_stage, operator, remark);
    Ok(())
}

/// Ship a customer (partial or full).
///
/// Guard: shipping requires the customer to be packed or archived. A
/// customer that has not finished packing cannot be shipped.
pub fn ship(
    customer: &mut Customer,
    mode: ShipMode,
    operator: &str,
    remark: Option<String>,
) -> Result<()> {
    if !customer.pack_stage.is_shippable() {
        return Err(TrackerError::InvalidState(format!(
            "customer `{}` is {:?}; an unpacked customer cannot be shipped",
            customer.name, customer.pack_stage
        )));
    }

    let target = mode.target_stage();
    let current = customer.shipment_stage;
    if current == target {
        return Ok(());
    }
    // full -> partial would erase a stronger claim; only the explicit
    // cancellation command walks the axis backwards.
    if current == ShipmentStage::FullShipped {
        return Err(TrackerError::InvalidTransition(format!(
            "customer `{}` is already fully shipped",
            customer.name
        )));
    }

    customer.shipment_stage = target;
    if customer.shipment_date.is_none() {
        customer.shipment_date = Some(Utc::now());
    }

    let pack_stage = customer.pack_stage;
    push_history(customer, pack_stage, current, operator, remark);
    Ok(())
}

/// Explicit cancellation: `full_shipped -> not_shipped`.
///
/// Clears no dates; the reversal is recorded as an audit-only event.
pub fn cancel_shipment(
    customer: &mut Customer,
    operator: &str,
    remark: Option<String>,
) -> Result<()> {
    if customer.shipment_stage != ShipmentStage::FullShipped {
        return Err(TrackerError::InvalidTransition(format!(
            "customer `{}` is {:?}; only a fully shipped customer can be marked not shipped",
            customer.name, customer.shipment_stage
        )));
    }

    customer.shipment_stage = ShipmentStage::NotShipped;
    let pack_stage = customer.pack_stage;
    push_history(
        customer,
        pack_stage,
        ShipmentStage::FullShipped,
        operator,
        remark,
    );
    Ok(())
}
