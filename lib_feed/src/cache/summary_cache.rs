//! Read-through cache of persisted summaries, keyed by target and model version.

use super::shared::SharedCache;
use crate::ai::SummaryData;
use crate::store::{ContentBackend, StoreError, StoredSummary, TargetKind};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// What a reader can be told about a summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum SummaryState {
    Ready { summary: SummaryData },
    /// The item is known but nothing has been computed for it yet.
    Pending,
    /// The item is not in the store at all.
    Absent,
}

pub fn summary_key(kind: TargetKind, hn_id: i64, model_version: &str) -> String {
    format!("summary:{}:{hn_id}:model:{model_version}", kind.as_str())
}

pub struct SummaryCache {
    cache: SharedCache,
    backend: Arc<dyn ContentBackend>,
    model_version: String,
    ttl: Duration,
}

impl SummaryCache {
    pub fn new(
        cache: SharedCache,
        backend: Arc<dyn ContentBackend>,
        model_version: impl Into<String>,
        ttl: Duration,
    ) -> Self {
        Self {
            cache,
            backend,
            model_version: model_version.into(),
            ttl,
        }
    }

    pub fn model_version(&self) -> &str {
        &self.model_version
    }

    /// Cached summary, else the stored one (which is then cached).
    pub async fn get(&self, kind: TargetKind, hn_id: i64) -> Result<Option<SummaryData>, StoreError> {
        let key = summary_key(kind, hn_id, &self.model_version);
        if let Some(hit) = self.cache.get_json::<SummaryData>(&key).await {
            return Ok(Some(hit));
        }
        let Some(stored) = self
            .backend
            .get_summary(kind, hn_id, &self.model_version)
            .await?
        else {
            return Ok(None);
        };
        self.cache.set_json(&key, &stored.data, Some(self.ttl)).await;
        Ok(Some(stored.data))
    }

    pub async fn lookup(&self, kind: TargetKind, hn_id: i64) -> Result<SummaryState, StoreError> {
        if let Some(summary) = self.get(kind, hn_id).await? {
            return Ok(SummaryState::Ready { summary });
        }
        match self.backend.get_item(hn_id).await? {
            Some(_) => Ok(SummaryState::Pending),
            None => Ok(SummaryState::Absent),
        }
    }

    /// Persists `summary` and writes it through to the cache. Returns whether
    /// the store changed.
    pub async fn put(&self, summary: &StoredSummary) -> Result<bool, StoreError> {
        let written = self.backend.put_summary(summary).await?;
        let key = summary_key(summary.target_kind, summary.hn_id, &summary.model_version);
        self.cache.set_json(&key, &summary.data, Some(self.ttl)).await;
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_key_layout() {
        assert_eq!(
            summary_key(TargetKind::Story, 42, "mock-v1"),
            "summary:story:42:model:mock-v1"
        );
        assert_eq!(
            summary_key(TargetKind::Comment, 7, "m2"),
            "summary:comment:7:model:m2"
        );
    }
}
