//! Panel record collection.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use packtrack_protocol::Panel;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::Result;

pub const PANELS_LOG: &str = "panels.jsonl";

pub struct PanelStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl PanelStore {
    pub fn new(data_home: &Path) -> Self {
        Self {
            path: data_home.join(PANELS_LOG),
            lock: Mutex::new(()),
        }
    }

    /// Last-wins by panel id, so a roster re-ingest refreshes attributes.
    async fn replay(&self) -> Result<BTreeMap<String, Panel>> {
        let versions: Vec<Panel> = super::read_log(&self.path).await?;
        let mut live = BTreeMap::new();
        for panel in versions {
            live.insert(panel.id.clone(), panel);
        }
        Ok(live)
    }

    pub async fn append_many(&self, panels: &[Panel]) -> Result<()> {
        let _guard = self.lock.lock().await;
        for panel in panels {
            super::append_line(&self.path, panel).await?;
        }
        Ok(())
    }

    pub async fn panels_for(&self, customer_id: Uuid) -> Result<Vec<Panel>> {
        let _guard = self.lock.lock().await;
        let live = self.replay().await?;
        Ok(live
            .into_values()
            .filter(|panel| panel.customer_id == customer_id)
            .collect())
    }

    /// Remove every panel owned by the customer (administrative delete).
    pub async fn remove_for(&self, customer_id: Uuid) -> Result<usize> {
        let _guard = self.lock.lock().await;
        let live = self.replay().await?;
        let (kept, dropped): (Vec<Panel>, Vec<Panel>) = live
            .into_values()
            .partition(|panel| panel.customer_id != customer_id);
        if dropped.is_empty() {
            return Ok(0);
        }
        super::rewrite_log(&self.path, &kept).await?;
        Ok(dropped.len())
    }
}
