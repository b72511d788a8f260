//! Archive, restore and delete against the full tracker.

use packtrack_core::TrackerError;
use packtrack_protocol::{PackStage, ShipMode, ShipmentStage};
use pretty_assertions::assert_eq;
use tempfile::TempDir;
use uuid::Uuid;

use super::common::{drop_scan, file_set, roster, tracker_in};

async fn packed_customer(tracker: &packtrack_core::Tracker, name: &str) {
    tracker
        .ingest_roster(roster(name, &["p1", "p2", "p3"]))
        .await
        .unwrap();
    let customer = tracker.get_customer(name).await.unwrap();
    let working_dir = customer.working_directory.clone().unwrap();
    drop_scan(&working_dir, "drop-1", 41, &["p1", "p2"]);
    drop_scan(&working_dir, "drop-2", 42, &["p3"]);
    tracker.check_and_update_status(name).await.unwrap();
}

#[tokio::test]
async fn archive_then_restore_roundtrips_the_working_dir() {
    let temp = TempDir::new().unwrap();
    let tracker = tracker_in(&temp);
    packed_customer(&tracker, "acme").await;

    let customer = tracker.get_customer("acme").await.unwrap();
    let working_dir = customer.working_directory.clone().unwrap();
    let files_before = file_set(&working_dir);

    let record = tracker
        .archive_customer("acme", "op1", Some("end of run".to_string()))
        .await
        .unwrap();
    assert!(record.backup_artifact_path.exists());
    assert_eq!(record.packages_count, 2);
    assert_eq!(record.total_parts_count, 3);
    assert_eq!(record.archive_user, "op1");

    let archived = tracker.get_customer("acme").await.unwrap();
    assert_eq!(archived.pack_stage, PackStage::Archived);
    assert!(archived.working_directory.is_none());
    assert!(archived.archive_date.is_some());
    assert!(!working_dir.exists());

    let restored = tracker.restore_archive(record.id, "op2").await.unwrap();
    assert_eq!(restored.pack_stage, PackStage::Packed);
    let restored_dir = restored.working_directory.clone().unwrap();
    assert_eq!(file_set(&restored_dir), files_before);

    // the record survives the restore
    assert!(tracker.get_archive_detail(record.id).await.is_ok());
}

#[tokio::test]
async fn archiving_an_unpacked_customer_changes_nothing() {
    let temp = TempDir::new().unwrap();
    let tracker = tracker_in(&temp);
    tracker
        .ingest_roster(roster("acme", &["p1", "p2"]))
        .await
        .unwrap();

    let before = tracker.get_customer("acme").await.unwrap();
    let working_dir = before.working_directory.clone().unwrap();

    let err = tracker
        .archive_customer("acme", "op1", None)
        .await
        .unwrap_err();
    assert!(matches!(err, TrackerError::InvalidState(_)));

    let after = tracker.get_customer("acme").await.unwrap();
    assert_eq!(after.pack_stage, before.pack_stage);
    assert_eq!(after.status_history.len(), before.status_history.len());
    assert!(working_dir.exists());
    assert_eq!(tracker.list_archives(0, 10).await.unwrap().total, 0);
}

#[tokio::test]
async fn repeated_cycles_leave_independent_records() {
    let temp = TempDir::new().unwrap();
    let tracker = tracker_in(&temp);
    packed_customer(&tracker, "acme").await;

    let first = tracker.archive_customer("acme", "op1", None).await.unwrap();
    tracker.restore_archive(first.id, "op1").await.unwrap();
    let second = tracker.archive_customer("acme", "op1", None).await.unwrap();

    assert_ne!(first.id, second.id);
    assert_ne!(first.backup_artifact_path, second.backup_artifact_path);

    let page = tracker.list_archives(0, 10).await.unwrap();
    assert_eq!(page.total, 2);

    // archive_date reflects the first cycle only
    let customer = tracker.get_customer("acme").await.unwrap();
    let first_entry_date = customer.archive_date.unwrap();
    assert!(first_entry_date <= first.archive_date + chrono::Duration::seconds(1));

    // both records stay retrievable
    assert!(tracker.get_archive_detail(first.id).await.is_ok());
    assert!(tracker.get_archive_detail(second.id).await.is_ok());
}

#[tokio::test]
async fn archived_customers_can_ship_and_skip_recompute() {
    let temp = TempDir::new().unwrap();
    let tracker = tracker_in(&temp);
    packed_customer(&tracker, "acme").await;
    tracker.archive_customer("acme", "op1", None).await.unwrap();

    // shipping an archived customer is allowed
    let customer = tracker
        .ship_customer("acme", ShipMode::Full, "op1", None)
        .await
        .unwrap();
    assert_eq!(customer.shipment_stage, ShipmentStage::FullShipped);

    // a recompute is a no-op rather than a demotion
    let customer = tracker.check_and_update_status("acme").await.unwrap();
    assert_eq!(customer.pack_stage, PackStage::Archived);
    assert_eq!(customer.packed_count, 3);
}

#[tokio::test]
async fn restore_with_missing_artifact_fails_cleanly() {
    let temp = TempDir::new().unwrap();
    let tracker = tracker_in(&temp);
    packed_customer(&tracker, "acme").await;

    let record = tracker.archive_customer("acme", "op1", None).await.unwrap();
    std::fs::remove_file(&record.backup_artifact_path).unwrap();

    let err = tracker.restore_archive(record.id, "op1").await.unwrap_err();
    assert!(matches!(err, TrackerError::NotFound(_)));

    // customer stage unchanged, record still present
    let customer = tracker.get_customer("acme").await.unwrap();
    assert_eq!(customer.pack_stage, PackStage::Archived);
    assert!(tracker.get_archive_detail(record.id).await.is_ok());
}

#[tokio::test]
async fn delete_archive_removes_record_and_artifact() {
    let temp = TempDir::new().unwrap();
    let tracker = tracker_in(&temp);
    packed_customer(&tracker, "acme").await;

    let record = tracker.archive_customer("acme", "op1", None).await.unwrap();
    tracker.delete_archive(record.id).await.unwrap();

    assert!(!record.backup_artifact_path.exists());
    assert!(matches!(
        tracker.get_archive_detail(record.id).await.unwrap_err(),
        TrackerError::NotFound(_)
    ));
}

#[tokio::test]
async fn deleting_an_unknown_archive_mutates_nothing() {
    let temp = TempDir::new().unwrap();
    let tracker = tracker_in(&temp);
    packed_customer(&tracker, "acme").await;
    tracker.archive_customer("acme", "op1", None).await.unwrap();

    let err = tracker.delete_archive(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, TrackerError::NotFound(_)));
    assert_eq!(tracker.list_archives(0, 10).await.unwrap().total, 1);
}

#[tokio::test]
async fn restoring_an_unknown_archive_is_not_found() {
    let temp = TempDir::new().unwrap();
    let tracker = tracker_in(&temp);

    let err = tracker
        .restore_archive(Uuid::new_v4(), "op1")
        .await
        .unwrap_err();
    assert!(matches!(err, TrackerError::NotFound(_)));
}

#[tokio::test]
async fn restore_detail_includes_nested_entries() {
    let temp = TempDir::new().unwrap();
    let tracker = tracker_in(&temp);
    packed_customer(&tracker, "acme").await;

    let record = tracker.archive_customer("acme", "op1", None).await.unwrap();
    let detail = tracker.get_archive_detail(record.id).await.unwrap();

    assert_eq!(detail.packages.len(), 2);
    let seqs: Vec<u64> = detail.packages.iter().map(|p| p.pack_seq).collect();
    assert_eq!(seqs, vec![41, 42]);
    let first_parts: Vec<&str> = detail.packages[0]
        .parts
        .iter()
        .map(|p| p.part_id.as_str())
        .collect();
    assert_eq!(first_parts, vec!["p1", "p2"]);
}
