//! Per-customer exclusion locks.
//!
//! Lifecycle-mutating operations (archive, restore, ship, delete) and the
//! ingestion-driven status recompute must never interleave for the same
//! customer: an archive snapshots the working directory that ingestion
//! writes into. Each customer gets one async mutex; different customers
//! proceed fully in parallel. There is no global lock.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::error::{Result, TrackerError};

/// Held for the duration of one per-customer operation. Dropping it on any
/// exit path (success, guard failure, I/O error) releases the customer.
pub type CustomerGuard = OwnedMutexGuard<()>;

#[derive(Default)]
pub struct CustomerLocks {
    inner: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl CustomerLocks {
    pub fn new() -> Self {
        Self::default()
    }

    async fn entry(&self, customer_name: &str) -> Arc<Mutex<()>> {
        let mut map = self.inner.lock().await;
        map.entry(customer_name.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Wait for the customer to become free. Used by background ingestion
    /// recompute, which has no operator staring at a spinner.
    pub async fn acquire(&self, customer_name: &str) -> CustomerGuard {
        let lock = self.entry(customer_name).await;
        lock.lock_owned().await
    }

    /// Acquire without waiting. Operator-issued commands use this so lock
    /// contention surfaces as a retryable [`TrackerError::Conflict`] instead
    /// of queueing silently behind a long archive.
    pub async fn try_acquire(&self, customer_name: &str) -> Result<CustomerGuard> {
        let lock = self.entry(customer_name).await;
        lock.try_lock_owned()
            .map_err(|_| TrackerError::Conflict(customer_name.to_string()))
    }
}
