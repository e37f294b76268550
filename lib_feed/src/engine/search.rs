//! # Search Read-Through
//!
//! Keyword search answered from, in order: a persisted result younger than the
//! database TTL, the shared cache, then the live search API. A live answer is
//! cached and handed to the worker, which stores the hits as minimal stories
//! and records the result row; this path never writes to the content store.

use crate::cache::{SharedCache, TopStory};
use crate::configs::SearchSettings;
use crate::queue::{JobError, JobQueue, SearchPersistJob};
use crate::retrieve::{FetchError, SearchSource};
use crate::store::{ContentBackend, StoreError};
use chrono::{TimeDelta, Utc};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Search query is empty")]
    EmptyQuery,
    #[error("At most {max} keywords allowed, got {got}")]
    TooManyKeywords { max: usize, got: usize },
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Trims, lowercases and collapses inner whitespace.
pub fn normalize_query(raw: &str) -> String {
    raw.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn search_key(normalized: &str) -> String {
    format!("search:{}", hex::encode(Sha256::digest(normalized.as_bytes())))
}

pub struct SearchService {
    backend: Arc<dyn ContentBackend>,
    source: Arc<dyn SearchSource>,
    cache: SharedCache,
    persist: JobQueue<SearchPersistJob>,
    settings: SearchSettings,
}

impl SearchService {
    pub fn new(
        backend: Arc<dyn ContentBackend>,
        source: Arc<dyn SearchSource>,
        cache: SharedCache,
        settings: SearchSettings,
    ) -> Self {
        Self {
            backend,
            source,
            persist: JobQueue::new(cache.clone()),
            cache,
            settings,
        }
    }

    pub async fn search(&self, query: &str, limit: Option<usize>) -> Result<Vec<TopStory>, SearchError> {
        let normalized = normalize_query(query);
        if normalized.is_empty() {
            return Err(SearchError::EmptyQuery);
        }
        let keywords = normalized.split(' ').count();
        if keywords > self.settings.max_keywords {
            return Err(SearchError::TooManyKeywords {
                max: self.settings.max_keywords,
                got: keywords,
            });
        }
        let limit = limit.map_or(self.settings.limit, |l| l.min(self.settings.limit));

        let mut results = self.resolve(&normalized).await?;
        results.truncate(limit);
        Ok(results)
    }

    async fn resolve(&self, normalized: &str) -> Result<Vec<TopStory>, SearchError> {
        let fresh_after = Utc::now() - TimeDelta::days(self.settings.db_ttl_days);
        if let Some(record) = self.backend.get_search(normalized).await? {
            if record.fetched_at >= fresh_after {
                debug!(query = normalized, "Search answered from store");
                return self.load_stories(&record.result_ids).await;
            }
        }

        let key = search_key(normalized);
        if let Some(cached) = self.cache.get_json::<Vec<TopStory>>(&key).await {
            debug!(query = normalized, "Search answered from cache");
            return Ok(cached);
        }

        let hits = self
            .source
            .search(normalized, self.settings.limit, None)
            .await?;
        let mut results = Vec::with_capacity(hits.len());
        for hit in &hits {
            let Some(source) = hit.to_source_item() else {
                warn!(object_id = %hit.object_id, "Skipping search hit without numeric id");
                continue;
            };
            results.push(TopStory {
                hn_id: source.id,
                title: source.title,
                url: source.url,
                score: source.score,
                time: source.time,
            });
        }

        self.cache
            .set_json(&key, &results, Some(Duration::from_secs(self.settings.ttl_secs)))
            .await;
        let job = SearchPersistJob {
            query: normalized.to_string(),
            hits,
            fetched_at: Utc::now(),
        };
        match self.persist.push(&job).await {
            Ok(()) => {}
            Err(JobError::Disabled) => debug!(query = normalized, "No job queue, search result not persisted"),
            Err(e) => warn!(query = normalized, error = %e, "Failed to queue search persistence"),
        }
        debug!(query = normalized, count = results.len(), "Search answered live");
        Ok(results)
    }

    async fn load_stories(&self, ids: &[i64]) -> Result<Vec<TopStory>, SearchError> {
        let by_id: HashMap<i64, TopStory> = self
            .backend
            .get_items(ids)
            .await?
            .iter()
            .map(|item| (item.hn_id, TopStory::from(item)))
            .collect();
        Ok(ids.iter().filter_map(|id| by_id.get(id).cloned()).collect())
    }
}
