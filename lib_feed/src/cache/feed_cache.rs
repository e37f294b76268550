//! # Global Top Feed Cache
//!
//! Read-through cache of the ranked top list. Priming is stampede-safe: the
//! recompute runs under a named lock, and a caller that obtains the lock after
//! someone else primed the key returns that value instead of recomputing.

use super::shared::{LockError, SharedCache};
use crate::store::{ContentBackend, Item, StoreError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

pub const TOP_FEED_KEY: &str = "top:global:v1";
pub const TOP_FEED_LOCK: &str = "lock:top:global:v1";

/// One entry of the cached top list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopStory {
    pub hn_id: i64,
    pub title: Option<String>,
    pub url: Option<String>,
    pub score: Option<i64>,
    pub time: Option<i64>,
}

impl From<&Item> for TopStory {
    fn from(item: &Item) -> Self {
        Self {
            hn_id: item.hn_id,
            title: item.title.clone(),
            url: item.url.clone(),
            score: item.score,
            time: item.time,
        }
    }
}

/// The expensive read a prime recomputes from.
#[async_trait]
pub trait TopFeedSource: Send + Sync {
    async fn load_top(&self, limit: usize) -> Result<Vec<TopStory>, StoreError>;
}

/// Reads the ranked top list straight from the content store.
pub struct StoreTopFeed {
    backend: Arc<dyn ContentBackend>,
}

impl StoreTopFeed {
    pub fn new(backend: Arc<dyn ContentBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl TopFeedSource for StoreTopFeed {
    async fn load_top(&self, limit: usize) -> Result<Vec<TopStory>, StoreError> {
        let items = self.backend.list_top_items(limit).await?;
        Ok(items.iter().map(TopStory::from).collect())
    }
}

#[derive(Debug, Error)]
pub enum PrimeError {
    /// Another holder kept the lock past the wait budget; safe to retry.
    #[error(transparent)]
    Lock(#[from] LockError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub struct FeedCache {
    cache: SharedCache,
    source: Arc<dyn TopFeedSource>,
    ttl: Duration,
    limit: usize,
}

impl FeedCache {
    pub fn new(cache: SharedCache, source: Arc<dyn TopFeedSource>, ttl: Duration, limit: usize) -> Self {
        Self {
            cache,
            source,
            ttl,
            limit,
        }
    }

    async fn cached(&self) -> Option<Vec<TopStory>> {
        self.cache.get_json(TOP_FEED_KEY).await
    }

    /// The cached list, or empty when nothing is cached.
    pub async fn read_feed(&self) -> Vec<TopStory> {
        self.cached().await.unwrap_or_default()
    }

    /// Fills the cache if it is empty and returns what is cached afterwards.
    pub async fn prime_feed(&self) -> Result<Vec<TopStory>, PrimeError> {
        self.prime(false).await
    }

    /// Recomputes and overwrites the cached list, e.g. after the top list changed.
    pub async fn refresh_feed(&self) -> Result<Vec<TopStory>, PrimeError> {
        self.prime(true).await
    }

    async fn prime(&self, force: bool) -> Result<Vec<TopStory>, PrimeError> {
        let guard = self.cache.lock(TOP_FEED_LOCK).await?;
        let result = self.prime_locked(force).await;
        guard.release().await;
        result
    }

    async fn prime_locked(&self, force: bool) -> Result<Vec<TopStory>, PrimeError> {
        if !force {
            if let Some(existing) = self.cached().await {
                debug!("Top feed already primed");
                return Ok(existing);
            }
        }
        let stories = self.source.load_top(self.limit).await?;
        self.cache
            .set_json(TOP_FEED_KEY, &stories, Some(self.ttl))
            .await;
        info!(count = stories.len(), "Top feed primed");
        Ok(stories)
    }

    /// The cached list, falling back to a direct store read without priming.
    pub async fn read_or_fallback(&self) -> Result<Vec<TopStory>, StoreError> {
        match self.cached().await {
            Some(stories) if !stories.is_empty() => Ok(stories),
            _ => self.source.load_top(self.limit).await,
        }
    }
}
