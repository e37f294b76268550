//! # Cache Store Contract
//!
//! The shared cache/coordination store used for derived views and for the
//! primitives that coordinate request-time code with the worker: JSON blobs
//! with TTL, counters with expiry, de-dup sets, queues, a hash, a sorted set and
//! a token-checked advisory lock.
//!
//! Everything in this store is rebuildable from the content store, so callers
//! above this layer treat its failures as "no cache" rather than as fatal.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Errors raised by a cache store backend.
#[derive(Debug, Error)]
pub enum CacheError {
    #[cfg(feature = "connections")]
    #[error("Redis command failed: {0}")]
    Redis(#[from] redis::RedisError),
    #[error("Cache payload could not be (de)serialized: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("Cache backend unavailable: {0}")]
    Unavailable(String),
}

/// Primitive operations of the shared cache store.
///
/// Queues are LPUSH/RPOP lists, so the oldest entry is delivered first.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Round-trips the backend; used once at startup to pick the lock strategy.
    async fn ping(&self) -> Result<(), CacheError>;

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), CacheError>;
    async fn delete(&self, key: &str) -> Result<(), CacheError>;

    /// Increments a counter, setting `ttl` when the counter is created.
    async fn incr_with_expiry(&self, key: &str, ttl: Duration) -> Result<i64, CacheError>;

    /// Adds `member` to `pending` and pushes it onto `queue` as one atomic step,
    /// but only if it was not already pending. Returns whether it was enqueued.
    async fn enqueue_unique(&self, queue: &str, pending: &str, member: &str) -> Result<bool, CacheError>;

    /// Pops the oldest entry of `queue` and removes it from `pending` atomically,
    /// waiting up to `timeout` for one to arrive.
    async fn dequeue_unique(
        &self,
        queue: &str,
        pending: &str,
        timeout: Duration,
    ) -> Result<Option<String>, CacheError>;

    async fn push(&self, queue: &str, value: &str) -> Result<(), CacheError>;
    async fn pop(&self, queue: &str) -> Result<Option<String>, CacheError>;
    async fn queue_len(&self, queue: &str) -> Result<u64, CacheError>;

    async fn hash_set(&self, key: &str, field: &str, value: &str) -> Result<(), CacheError>;
    async fn hash_get(&self, key: &str, field: &str) -> Result<Option<String>, CacheError>;

    async fn zset_add(&self, key: &str, member: &str, score: f64) -> Result<(), CacheError>;

    /// Takes the named lock for `token` if it is free; it expires after `ttl`.
    async fn try_lock(&self, name: &str, token: &str, ttl: Duration) -> Result<bool, CacheError>;
    /// Releases the named lock only if `token` still owns it.
    async fn unlock(&self, name: &str, token: &str) -> Result<bool, CacheError>;
}
