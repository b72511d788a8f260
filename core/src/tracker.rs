//! The tracker: command surface over the stores, the reconciliation engine
//! and the lifecycle state machine.
//!
//! Every lifecycle-mutating command takes the per-customer exclusion lock
//! for its whole duration. Operator commands use the non-waiting acquire
//! and surface contention as [`TrackerError::Conflict`]; the ingestion
//! recompute waits instead. Stage and history always persist together in a
//! single customer upsert.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::Utc;
use packtrack_protocol::{
    ArchiveRecord, ArchivesPage, Customer, PackStage, PackageArchiveEntry, Panel,
    PartArchiveEntry, RosterRecord, ShipMode,
};
use tracing::{info, warn};
use uuid::Uuid;

use crate::archive;
use crate::config::TrackerConfig;
use crate::error::{Result, TrackerError};
use crate::lifecycle;
use crate::locks::CustomerLocks;
use crate::reconcile;
use crate::scan;
use crate::store::{ArchiveStore, CustomerStore, PanelStore};

pub struct Tracker {
    config: TrackerConfig,
    customers: CustomerStore,
    panels: PanelStore,
    archives: ArchiveStore,
    locks: CustomerLocks,
}

impl Tracker {
    pub fn new(config: TrackerConfig) -> Result<Self> {
        std::fs::create_dir_all(&config.data_home)?;
        std::fs::create_dir_all(&config.backup_dir)?;
        Ok(Self {
            customers: CustomerStore::new(&config.data_home, config.compaction_factor),
            panels: PanelStore::new(&config.data_home),
            archives: ArchiveStore::new(&config.data_home),
            locks: CustomerLocks::new(),
            config,
        })
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    fn scans_dir(&self, customer: &Customer) -> Option<PathBuf> {
        customer
            .working_directory
            .as_ref()
            .map(|dir| dir.join(&self.config.scans_subdir))
    }

    async fn require_customer(&self, name: &str) -> Result<Customer> {
        self.customers
            .find(name)
            .await?
            .ok_or_else(|| TrackerError::NotFound(format!("customer `{name}`")))
    }

    // ------------------------------------------------------------------
    // Roster ingestion
    // ------------------------------------------------------------------

    /// Consume roster records from the (external) roster provider, creating
    /// customers on first sight and appending their panels. Each affected
    /// customer's status is recomputed afterwards.
    pub async fn ingest_roster(&self, records: Vec<RosterRecord>) -> Result<Vec<Customer>> {
        let mut by_customer: BTreeMap<String, Vec<RosterRecord>> = BTreeMap::new();
        for record in records {
            by_customer
                .entry(record.customer_name.clone())
                .or_default()
                .push(record);
        }

        let mut updated = Vec::new();
        for (name, records) in by_customer {
            let _guard = self.locks.acquire(&name).await;

            let customer = match self.customers.find(&name).await? {
                Some(existing) => existing,
                None => {
                    let working_dir = self.config.working_dir_for(&name);
                    tokio::fs::create_dir_all(working_dir.join(&self.config.scans_subdir)).await?;
                    let created = Customer::new(&name, working_dir);
                    info!(customer = %name, "customer created from roster");
                    self.customers.upsert(&created).await?;
                    created
                }
            };

            let panels: Vec<Panel> = records
                .into_iter()
                .map(|r| Panel {
                    id: r.panel_id,
                    customer_id: customer.id,
                    width_mm: r.width_mm,
                    height_mm: r.height_mm,
                    thickness_mm: r.thickness_mm,
                    material: r.material,
                })
                .collect();
            self.panels.append_many(&panels).await?;

            updated.push(self.recompute_locked(customer).await?);
        }
        Ok(updated)
    }

    // ------------------------------------------------------------------
    // Status
    // ------------------------------------------------------------------

    pub async fn get_customer(&self, name: &str) -> Result<Customer> {
        self.require_customer(name).await
    }

    /// Recompute packing status from the current scan data. Called by the
    /// ingestion layer whenever new packing activity is detected.
    ///
    /// Waits for any in-flight lifecycle command on the same customer; an
    /// archive must never snapshot a directory this recompute is reading.
    pub async fn check_and_update_status(&self, name: &str) -> Result<Customer> {
        let _guard = self.locks.acquire(name).await;
        let customer = self.require_customer(name).await?;
        self.recompute_locked(customer).await
    }

    /// Recompute + persist. Caller must hold the customer lock.
    async fn recompute_locked(&self, mut customer: Customer) -> Result<Customer> {
        if customer.pack_stage == PackStage::Archived {
            // working data is snapshotted away; nothing to reconcile
            return Ok(customer);
        }

        let panels = self.panels.panels_for(customer.id).await?;
        let packages = match self.scans_dir(&customer) {
            Some(dir) => scan::read_packages(&dir).await?,
            None => Vec::new(),
        };

        let outcome = reconcile::reconcile(panels.iter().map(|p| p.id.as_str()), &packages);
        let changed = lifecycle::apply_reconcile(&mut customer, &outcome, "system")?;
        if changed {
            self.customers.upsert(&customer).await?;
        }
        Ok(customer)
    }

    // ------------------------------------------------------------------
    // Shipping
    // ------------------------------------------------------------------

    pub async fn ship_customer(
        &self,
        name: &str,
        mode: ShipMode,
        operator: &str,
        remark: Option<String>,
    ) -> Result<Customer> {
        let _guard = self.locks.try_acquire(name).await?;
        let mut customer = self.require_customer(name).await?;
        lifecycle::ship(&mut customer, mode, operator, remark)?;
        self.customers.upsert(&customer).await?;
        info!(customer = %name, ?mode, operator, "customer shipped");
        Ok(customer)
    }

    pub async fn mark_not_shipped(&self, name: &str, operator: &str) -> Result<Customer> {
        let _guard = self.locks.try_acquire(name).await?;
        let mut customer = self.require_customer(name).await?;
        lifecycle::cancel_shipment(&mut customer, operator, None)?;
        self.customers.upsert(&customer).await?;
        info!(customer = %name, operator, "shipment cancelled");
        Ok(customer)
    }

    // ------------------------------------------------------------------
    // Archive / restore
    // ------------------------------------------------------------------

    /// Snapshot a fully packed customer's working directory into the backup
    /// store and move the customer to `archived`.
    ///
    /// Ordering is load-bearing: the artifact is confirmed on disk before
    /// the archive record is appended, the record before the working
    /// directory is removed, the directory before the stage transition. A
    /// crash at any point leaves the customer re-archivable rather than
    /// double-archived.
    pub async fn archive_customer(
        &self,
        name: &str,
        operator: &str,
        remark: Option<String>,
    ) -> Result<ArchiveRecord> {
        let _guard = self.locks.try_acquire(name).await?;
        let mut customer = self.require_customer(name).await?;

        if customer.pack_stage != PackStage::Packed {
            return Err(TrackerError::InvalidState(format!(
                "customer `{name}` is {:?}; only a fully packed customer can be archived",
                customer.pack_stage
            )));
        }
        let working_dir = customer.working_directory.clone().ok_or_else(|| {
            TrackerError::InvalidState(format!("customer `{name}` has no working directory"))
        })?;

        let packages = match self.scans_dir(&customer) {
            Some(dir) => scan::read_packages(&dir).await?,
            None => Vec::new(),
        };
        let package_entries: Vec<PackageArchiveEntry> = packages
            .iter()
            .map(|package| PackageArchiveEntry {
                pack_seq: package.pack_seq,
                quantity: package.info.quantity,
                weight_kg: package.info.weight_kg,
                parts: package
                    .part_ids
                    .iter()
                    .map(|part_id| PartArchiveEntry {
                        part_id: part_id.clone(),
                    })
                    .collect(),
            })
            .collect();

        let artifact_path = self.next_artifact_path(name);
        archive::snapshot_dir(&working_dir, &artifact_path, name).await?;

        let record = ArchiveRecord {
            id: Uuid::new_v4(),
            customer_name: name.to_string(),
            customer_address: None,
            archive_date: Utc::now(),
            backup_artifact_path: artifact_path.clone(),
            packages_count: package_entries.len(),
            total_parts_count: customer.total_parts,
            archive_user: operator.to_string(),
            remark: remark.clone(),
            packages: package_entries,
        };
        if let Err(err) = self.archives.append(&record).await {
            // the record never made it in; drop the orphaned artifact
            let _ = tokio::fs::remove_file(&artifact_path).await;
            return Err(err);
        }

        tokio::fs::remove_dir_all(&working_dir).await?;

        lifecycle::set_pack_stage(&mut customer, PackStage::Archived, operator, remark)?;
        customer.working_directory = None;
        self.customers.upsert(&customer).await?;

        info!(
            customer = %name,
            archive_id = %record.id,
            artifact = %artifact_path.display(),
            "customer archived"
        );
        Ok(record)
    }

    /// Bring an archived customer's working data back from its artifact and
    /// return the customer to `packed`. The archive record is retained as
    /// audit trail; repeated archive/restore cycles each leave their own
    /// record.
    pub async fn restore_archive(&self, archive_id: Uuid, operator: &str) -> Result<Customer> {
        let record = self
            .archives
            .find(archive_id)
            .await?
            .ok_or_else(|| TrackerError::NotFound(format!("archive record {archive_id}")))?;

        let _guard = self.locks.try_acquire(&record.customer_name).await?;
        let mut customer = self.require_customer(&record.customer_name).await?;
        if customer.pack_stage != PackStage::Archived {
            return Err(TrackerError::InvalidState(format!(
                "customer `{}` is {:?}; only an archived customer can be restored",
                customer.name, customer.pack_stage
            )));
        }

        if !record.backup_artifact_path.exists() {
            return Err(TrackerError::NotFound(format!(
                "backup artifact {} is missing",
                record.backup_artifact_path.display()
            )));
        }

        let working_dir = self.config.working_dir_for(&customer.name);
        archive::restore_dir(&record.backup_artifact_path, &working_dir).await?;

        lifecycle::set_pack_stage(&mut customer, PackStage::Packed, operator, None)?;
        customer.working_directory = Some(working_dir);
        self.customers.upsert(&customer).await?;

        info!(customer = %customer.name, archive_id = %archive_id, "archive restored");
        Ok(customer)
    }

    /// Permanently discard an archive record and its backup artifact. The
    /// only operation allowed to remove archive history.
    pub async fn delete_archive(&self, archive_id: Uuid) -> Result<()> {
        let record = self
            .archives
            .find(archive_id)
            .await?
            .ok_or_else(|| TrackerError::NotFound(format!("archive record {archive_id}")))?;

        let _guard = self.locks.try_acquire(&record.customer_name).await?;
        let removed = self
            .archives
            .remove(archive_id)
            .await?
            .ok_or_else(|| TrackerError::NotFound(format!("archive record {archive_id}")))?;

        match tokio::fs::remove_file(&removed.backup_artifact_path).await {
            Ok(()) => {}
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                warn!(
                    artifact = %removed.backup_artifact_path.display(),
                    "backup artifact already gone"
                );
            }
            Err(err) => return Err(err.into()),
        }

        info!(archive_id = %archive_id, customer = %removed.customer_name, "archive deleted");
        Ok(())
    }

    pub async fn list_archives(&self, page: usize, page_size: usize) -> Result<ArchivesPage> {
        self.archives.page(page, page_size).await
    }

    pub async fn get_archive_detail(&self, archive_id: Uuid) -> Result<ArchiveRecord> {
        self.archives
            .find(archive_id)
            .await?
            .ok_or_else(|| TrackerError::NotFound(format!("archive record {archive_id}")))
    }

    // ------------------------------------------------------------------
    // Administration
    // ------------------------------------------------------------------

    /// Administrative delete: removes the customer, its panels and its
    /// working directory. Archive records are deliberately retained.
    pub async fn delete_customer(&self, name: &str) -> Result<()> {
        let _guard = self.locks.try_acquire(name).await?;
        let customer = self.require_customer(name).await?;

        self.customers.remove(name).await?;
        let dropped = self.panels.remove_for(customer.id).await?;
        if let Some(working_dir) = &customer.working_directory
            && working_dir.exists()
        {
            tokio::fs::remove_dir_all(working_dir).await?;
        }

        info!(customer = %name, panels = dropped, "customer deleted");
        Ok(())
    }

    fn next_artifact_path(&self, customer_name: &str) -> PathBuf {
        // monotonic-enough stamp; millisecond precision avoids collisions
        // between back-to-back archive cycles of the same customer
        let stamp = Utc::now().format("%Y%m%dT%H%M%S%3fZ");
        self.config
            .backup_dir
            .join(format!("{customer_name}-{stamp}.tar.gz"))
    }
}
