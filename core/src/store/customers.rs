//! Customer record collection.
//!
//! History is nested inside each customer record; there is no separate
//! history collection. Every upsert appends a full new version of the
//! record, so the log doubles as a recovery journal until compaction
//! rewrites it down to live records.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use packtrack_protocol::Customer;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::Result;

pub const CUSTOMERS_LOG: &str = "customers.jsonl";

pub struct CustomerStore {
    path: PathBuf,
    /// Collection-level lock for read-modify-write cycles.
    lock: Mutex<()>,
    compaction_factor: usize,
}

impl CustomerStore {
    pub fn new(data_home: &Path, compaction_factor: usize) -> Self {
        Self {
            path: data_home.join(CUSTOMERS_LOG),
            lock: Mutex::new(()),
            compaction_factor: compaction_factor.max(1),
        }
    }

    async fn replay(&self) -> Result<(usize, BTreeMap<String, Customer>)> {
        let versions: Vec<Customer> = super::read_log(&self.path).await?;
        let total_versions = versions.len();
        let mut live = BTreeMap::new();
        for customer in versions {
            live.insert(customer.name.clone(), customer);
        }
        Ok((total_versions, live))
    }

    pub async fn load_all(&self) -> Result<Vec<Customer>> {
        let _guard = self.lock.lock().await;
        let (_, live) = self.replay().await?;
        Ok(live.into_values().collect())
    }

    pub async fn find(&self, name: &str) -> Result<Option<Customer>> {
        let _guard = self.lock.lock().await;
        let (_, mut live) = self.replay().await?;
        Ok(live.remove(name))
    }

    /// Append a new version of the customer, compacting the log when dead
    /// versions outnumber live records by the configured factor.
    pub async fn upsert(&self, customer: &Customer) -> Result<()> {
        let _guard = self.lock.lock().await;
        super::append_line(&self.path, customer).await?;

        let (total_versions, live) = self.replay().await?;
        if total_versions > live.len().saturating_mul(self.compaction_factor) {
            debug!(
                total_versions,
                live = live.len(),
                "compacting customer log"
            );
            let records: Vec<Customer> = live.into_values().collect();
            super::rewrite_log(&self.path, &records).await?;
        }
        Ok(())
    }

    /// Administrative removal. Returns whether the customer existed.
    pub async fn remove(&self, name: &str) -> Result<bool> {
        let _guard = self.lock.lock().await;
        let (_, mut live) = self.replay().await?;
        if live.remove(name).is_none() {
            return Ok(false);
        }
        let records: Vec<Customer> = live.into_values().collect();
        super::rewrite_log(&self.path, &records).await?;
        Ok(true)
    }
}
