//! Archive record collection.
//!
//! Records are immutable once appended; the only mutation this store
//! permits is the explicit `remove` backing `delete_archive`, which is the
//! sole operation allowed to discard archive history.

use std::path::{Path, PathBuf};

use packtrack_protocol::{ArchiveRecord, ArchivesPage};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::Result;

pub const ARCHIVES_LOG: &str = "archives.jsonl";

pub struct ArchiveStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl ArchiveStore {
    pub fn new(data_home: &Path) -> Self {
        Self {
            path: data_home.join(ARCHIVES_LOG),
            lock: Mutex::new(()),
        }
    }

    pub async fn append(&self, record: &ArchiveRecord) -> Result<()> {
        let _guard = self.lock.lock().await;
        super::append_line(&self.path, record).await
    }

    pub async fn find(&self, id: Uuid) -> Result<Option<ArchiveRecord>> {
        let _guard = self.lock.lock().await;
        let records: Vec<ArchiveRecord> = super::read_log(&self.path).await?;
        Ok(records.into_iter().find(|record| record.id == id))
    }

    /// Newest-first page of records. `page` is zero-based.
    pub async fn page(&self, page: usize, page_size: usize) -> Result<ArchivesPage> {
        let _guard = self.lock.lock().await;
        let mut records: Vec<ArchiveRecord> = super::read_log(&self.path).await?;
        records.reverse();
        let total = records.len();
        let page_size = page_size.max(1);
        let items = records
            .into_iter()
            .skip(page.saturating_mul(page_size))
            .take(page_size)
            .collect();
        Ok(ArchivesPage {
            items,
            page,
            page_size,
            total,
        })
    }

    /// Returns the removed record, or `None` if the id is unknown.
    pub async fn remove(&self, id: Uuid) -> Result<Option<ArchiveRecord>> {
        let _guard = self.lock.lock().await;
        let records: Vec<ArchiveRecord> = super::read_log(&self.path).await?;
        let mut removed = None;
        let kept: Vec<ArchiveRecord> = records
            .into_iter()
            .filter_map(|record| {
                if record.id == id {
                    removed = Some(record);
                    None
                } else {
                    Some(record)
                }
            })
            .collect();
        if removed.is_some() {
            super::rewrite_log(&self.path, &kept).await?;
        }
        Ok(removed)
    }
}
