//! End-to-end status reconciliation and lifecycle guards.

use std::collections::BTreeSet;

use packtrack_protocol::{PackStage, ShipMode, ShipmentStage};
use packtrack_core::TrackerError;
use pretty_assertions::assert_eq;
use tempfile::TempDir;

use super::common::{drop_scan, roster, tracker_in};

#[tokio::test]
async fn scans_drive_progress_to_packed() {
    let temp = TempDir::new().unwrap();
    let tracker = tracker_in(&temp);

    tracker
        .ingest_roster(roster("acme", &["p1", "p2", "p3"]))
        .await
        .unwrap();
    let customer = tracker.get_customer("acme").await.unwrap();
    assert_eq!(customer.pack_stage, PackStage::NotPacked);
    assert_eq!(customer.total_parts, 3);
    let working_dir = customer.working_directory.clone().unwrap();

    // first package covers two of three panels
    drop_scan(&working_dir, "drop-1", 41, &["p1", "p2"]);
    let customer = tracker.check_and_update_status("acme").await.unwrap();
    assert_eq!(customer.packed_count, 2);
    assert_eq!(customer.pack_progress, 67);
    assert_eq!(customer.pack_stage, PackStage::InProgress);
    assert_eq!(customer.pack_seqs, BTreeSet::from([41]));
    assert!(customer.pack_date.is_none());

    // second package completes the roster
    drop_scan(&working_dir, "drop-2", 42, &["p3"]);
    let customer = tracker.check_and_update_status("acme").await.unwrap();
    assert_eq!(customer.packed_count, 3);
    assert_eq!(customer.pack_progress, 100);
    assert_eq!(customer.pack_stage, PackStage::Packed);
    assert_eq!(customer.pack_seqs, BTreeSet::from([41, 42]));
    assert!(customer.pack_date.is_some());
}

#[tokio::test]
async fn truncated_scanner_ids_still_match() {
    let temp = TempDir::new().unwrap();
    let tracker = tracker_in(&temp);

    tracker
        .ingest_roster(roster("acme", &["58b2e383702249219bc6744e0419a9e6"]))
        .await
        .unwrap();
    let customer = tracker.get_customer("acme").await.unwrap();
    let working_dir = customer.working_directory.clone().unwrap();

    // the scanner only reports the five trailing characters
    drop_scan(&working_dir, "drop-1", 7, &["9a9e6"]);
    let customer = tracker.check_and_update_status("acme").await.unwrap();
    assert_eq!(customer.packed_count, 1);
    assert_eq!(customer.pack_stage, PackStage::Packed);
}

#[tokio::test]
async fn history_is_append_only_with_initial_entry() {
    let temp = TempDir::new().unwrap();
    let tracker = tracker_in(&temp);

    tracker
        .ingest_roster(roster("acme", &["p1", "p2"]))
        .await
        .unwrap();
    let customer = tracker.get_customer("acme").await.unwrap();
    let first = &customer.status_history[0];
    assert_eq!(first.pack_stage, PackStage::NotPacked);
    assert_eq!(first.shipment_stage, ShipmentStage::NotShipped);

    let working_dir = customer.working_directory.clone().unwrap();
    let mut previous_len = customer.status_history.len();
    drop_scan(&working_dir, "drop-1", 1, &["p1"]);
    let customer = tracker.check_and_update_status("acme").await.unwrap();
    assert!(customer.status_history.len() >= previous_len);
    previous_len = customer.status_history.len();

    drop_scan(&working_dir, "drop-2", 2, &["p2"]);
    let customer = tracker.check_and_update_status("acme").await.unwrap();
    assert!(customer.status_history.len() >= previous_len);
    assert_eq!(customer.status_history[0], *first);
}

#[tokio::test]
async fn shipping_requires_packed() {
    let temp = TempDir::new().unwrap();
    let tracker = tracker_in(&temp);

    tracker
        .ingest_roster(roster("acme", &["p1"]))
        .await
        .unwrap();

    let before = tracker.get_customer("acme").await.unwrap();
    let err = tracker
        .ship_customer("acme", ShipMode::Full, "op1", None)
        .await
        .unwrap_err();
    assert!(matches!(err, TrackerError::InvalidState(_)));

    // nothing moved and nothing was recorded
    let after = tracker.get_customer("acme").await.unwrap();
    assert_eq!(after.shipment_stage, ShipmentStage::NotShipped);
    assert_eq!(after.status_history.len(), before.status_history.len());
}

#[tokio::test]
async fn ship_and_cancel_roundtrip() {
    let temp = TempDir::new().unwrap();
    let tracker = tracker_in(&temp);

    tracker
        .ingest_roster(roster("acme", &["p1"]))
        .await
        .unwrap();
    let customer = tracker.get_customer("acme").await.unwrap();
    drop_scan(&customer.working_directory.clone().unwrap(), "drop-1", 1, &["p1"]);
    tracker.check_and_update_status("acme").await.unwrap();

    let customer = tracker
        .ship_customer("acme", ShipMode::Partial, "op1", None)
        .await
        .unwrap();
    assert_eq!(customer.shipment_stage, ShipmentStage::PartialShipped);
    let shipment_date = customer.shipment_date;
    assert!(shipment_date.is_some());

    let customer = tracker
        .ship_customer("acme", ShipMode::Full, "op1", None)
        .await
        .unwrap();
    assert_eq!(customer.shipment_stage, ShipmentStage::FullShipped);
    assert_eq!(customer.shipment_date, shipment_date);

    let customer = tracker.mark_not_shipped("acme", "op2").await.unwrap();
    assert_eq!(customer.shipment_stage, ShipmentStage::NotShipped);
    assert_eq!(customer.shipment_date, shipment_date);

    let last = customer.status_history.last().unwrap();
    assert_eq!(last.previous_shipment_stage, ShipmentStage::FullShipped);
    assert_eq!(last.operator, "op2");
}

#[tokio::test]
async fn unknown_customer_is_not_found() {
    let temp = TempDir::new().unwrap();
    let tracker = tracker_in(&temp);

    let err = tracker.get_customer("ghost").await.unwrap_err();
    assert!(matches!(err, TrackerError::NotFound(_)));
    let err = tracker.check_and_update_status("ghost").await.unwrap_err();
    assert!(matches!(err, TrackerError::NotFound(_)));
}

#[tokio::test]
async fn delete_customer_removes_roster_and_working_dir() {
    let temp = TempDir::new().unwrap();
    let tracker = tracker_in(&temp);

    tracker
        .ingest_roster(roster("acme", &["p1", "p2"]))
        .await
        .unwrap();
    let customer = tracker.get_customer("acme").await.unwrap();
    let working_dir = customer.working_directory.clone().unwrap();
    assert!(working_dir.exists());

    tracker.delete_customer("acme").await.unwrap();
    assert!(!working_dir.exists());
    assert!(matches!(
        tracker.get_customer("acme").await.unwrap_err(),
        TrackerError::NotFound(_)
    ));
}
