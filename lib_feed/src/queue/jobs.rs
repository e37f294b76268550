//! Background job queues. Request-time code only enqueues; the worker drains
//! a bounded batch per tick. Delivery is at-least-once at best: entries queued
//! when the cache store dies are lost and the next periodic cycle repairs.

use crate::cache::SharedCache;
use crate::connections::CacheError;
use crate::retrieve::SearchHit;
use crate::store::TargetKind;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::marker::PhantomData;
use thiserror::Error;
use tracing::warn;

pub const SUMMARY_QUEUE: &str = "summary:queue";
pub const SAVED_THREAD_QUEUE: &str = "saved_thread:queue";
pub const SEARCH_PERSIST_QUEUE: &str = "search:persist:queue";

#[derive(Debug, Error)]
pub enum JobError {
    #[error("No cache store configured for job queues")]
    Disabled,
    #[error(transparent)]
    Cache(#[from] CacheError),
    #[error("Job could not be encoded: {0}")]
    Encode(#[from] serde_json::Error),
}

/// A payload with a fixed home queue.
pub trait Job: Serialize + DeserializeOwned + Send + Sync {
    const QUEUE: &'static str;
}

/// Summarize one story or comment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryJob {
    pub hn_id: i64,
    #[serde(default)]
    pub kind: TargetKind,
    pub user_id: String,
    pub requested_at: DateTime<Utc>,
}

impl Job for SummaryJob {
    const QUEUE: &'static str = SUMMARY_QUEUE;
}

/// Assemble a saved thread from a story and selected comments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedThreadJob {
    pub user_id: String,
    pub story_hn_id: i64,
    #[serde(default)]
    pub comment_hn_ids: Vec<i64>,
    pub requested_at: DateTime<Utc>,
}

impl Job for SavedThreadJob {
    const QUEUE: &'static str = SAVED_THREAD_QUEUE;
}

/// Store the hits of a live search and its result row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchPersistJob {
    /// Normalized query text.
    pub query: String,
    pub hits: Vec<SearchHit>,
    pub fetched_at: DateTime<Utc>,
}

impl Job for SearchPersistJob {
    const QUEUE: &'static str = SEARCH_PERSIST_QUEUE;
}

/// FIFO queue of `T` jobs in the shared cache store.
pub struct JobQueue<T> {
    cache: SharedCache,
    _job: PhantomData<fn() -> T>,
}

impl<T> Clone for JobQueue<T> {
    fn clone(&self) -> Self {
        Self {
            cache: self.cache.clone(),
            _job: PhantomData,
        }
    }
}

impl<T: Job> JobQueue<T> {
    pub fn new(cache: SharedCache) -> Self {
        Self {
            cache,
            _job: PhantomData,
        }
    }

    pub async fn push(&self, job: &T) -> Result<(), JobError> {
        let store = self.cache.store().ok_or(JobError::Disabled)?;
        let raw = serde_json::to_string(job)?;
        store.push(T::QUEUE, &raw).await?;
        Ok(())
    }

    /// The oldest decodable job. Undecodable entries are logged and dropped.
    pub async fn pop(&self) -> Result<Option<T>, JobError> {
        let store = self.cache.store().ok_or(JobError::Disabled)?;
        while let Some(raw) = store.pop(T::QUEUE).await? {
            match serde_json::from_str(&raw) {
                Ok(job) => return Ok(Some(job)),
                Err(e) => warn!(queue = T::QUEUE, error = %e, "Dropping malformed job"),
            }
        }
        Ok(None)
    }

    /// Up to `max` jobs; an empty or absent queue yields an empty batch.
    pub async fn drain(&self, max: usize) -> Result<Vec<T>, JobError> {
        if !self.cache.is_enabled() {
            return Ok(Vec::new());
        }
        let mut batch = Vec::new();
        while batch.len() < max {
            match self.pop().await? {
                Some(job) => batch.push(job),
                None => break,
            }
        }
        Ok(batch)
    }

    pub async fn len(&self) -> Result<u64, JobError> {
        let store = self.cache.store().ok_or(JobError::Disabled)?;
        Ok(store.queue_len(T::QUEUE).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configs::CacheSettings;
    use crate::connections::{CacheStore, MemoryCacheStore};
    use std::sync::Arc;

    fn job(hn_id: i64) -> SummaryJob {
        SummaryJob {
            hn_id,
            kind: TargetKind::Story,
            user_id: "u1".to_string(),
            requested_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_drain_is_fifo_and_bounded() {
        let cache = SharedCache::new(Arc::new(MemoryCacheStore::new()), &CacheSettings::default());
        let q = JobQueue::<SummaryJob>::new(cache);
        for id in 1..=5 {
            q.push(&job(id)).await.unwrap();
        }
        let batch = q.drain(3).await.unwrap();
        assert_eq!(batch.iter().map(|j| j.hn_id).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(q.len().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_malformed_entries_are_skipped() {
        let store = Arc::new(MemoryCacheStore::new());
        let cache = SharedCache::new(store.clone(), &CacheSettings::default());
        let q = JobQueue::<SummaryJob>::new(cache);
        store.push(SUMMARY_QUEUE, "not json").await.unwrap();
        q.push(&job(8)).await.unwrap();
        assert_eq!(q.pop().await.unwrap().map(|j| j.hn_id), Some(8));
        assert_eq!(q.pop().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_push_without_store_is_rejected() {
        let q = JobQueue::<SavedThreadJob>::new(SharedCache::disabled());
        let job = SavedThreadJob {
            user_id: "u".into(),
            story_hn_id: 1,
            comment_hn_ids: vec![],
            requested_at: Utc::now(),
        };
        assert!(matches!(q.push(&job).await, Err(JobError::Disabled)));
        assert!(q.drain(5).await.unwrap().is_empty());
    }
}
