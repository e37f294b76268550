//! Retention: stale search rows first, then unreferenced items.

use super::{Worker, WorkerError};
use chrono::{TimeDelta, Utc};

#[derive(Debug, Default, Clone, PartialEq)]
pub struct CleanupReport {
    pub searches: u64,
    pub items: u64,
}

impl Worker {
    pub async fn cleanup(&self) -> Result<CleanupReport, WorkerError> {
        let now = Utc::now();
        let searches = self
            .backend
            .delete_searches_before(now - TimeDelta::days(self.settings.search.db_ttl_days))
            .await?;
        let items = self
            .backend
            .delete_unreferenced_items(now - TimeDelta::days(self.settings.cleanup.retention_days))
            .await?;
        Ok(CleanupReport { searches, items })
    }
}
