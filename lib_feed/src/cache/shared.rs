//! # Shared Cache Handle
//!
//! A degrade-to-nothing wrapper over an optional [`CacheStore`]. Every read
//! returns `None` and every write is dropped when the store is absent or
//! failing, so callers stay correct (only slower) without a cache.
//!
//! The lock strategy is chosen once, when the handle is built: a distributed,
//! token-checked lock when a store is configured, a no-op lock otherwise.

use crate::configs::CacheSettings;
use crate::connections::{CacheError, CacheStore};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};
use uuid::Uuid;

const LOCK_POLL: Duration = Duration::from_millis(50);

#[derive(Debug, Error)]
pub enum LockError {
    #[error("Timed out after {waited:?} waiting for lock {name}")]
    Timeout { name: String, waited: Duration },
}

/// How named locks are taken.
#[derive(Clone)]
pub enum LockStrategy {
    /// Advisory lock in the shared store; expires after `ttl` so a crashed
    /// holder cannot wedge other processes.
    Distributed {
        store: Arc<dyn CacheStore>,
        ttl: Duration,
        wait: Duration,
    },
    /// Always granted immediately.
    Noop,
}

impl LockStrategy {
    pub async fn acquire(&self, name: &str) -> Result<LockGuard, LockError> {
        let (store, ttl, wait) = match self {
            LockStrategy::Noop => return Ok(LockGuard::noop()),
            LockStrategy::Distributed { store, ttl, wait } => (store, *ttl, *wait),
        };

        let token = Uuid::new_v4().to_string();
        let deadline = Instant::now() + wait;
        loop {
            match store.try_lock(name, &token, ttl).await {
                Ok(true) => {
                    debug!(lock = name, "Lock acquired");
                    return Ok(LockGuard {
                        held: Some(HeldLock {
                            store: Arc::clone(store),
                            name: name.to_string(),
                            token,
                        }),
                    });
                }
                Ok(false) => {}
                Err(e) => {
                    warn!(lock = name, error = %e, "Lock store unavailable, continuing unlocked");
                    return Ok(LockGuard::noop());
                }
            }
            if Instant::now() >= deadline {
                return Err(LockError::Timeout {
                    name: name.to_string(),
                    waited: wait,
                });
            }
            sleep(LOCK_POLL).await;
        }
    }
}

struct HeldLock {
    store: Arc<dyn CacheStore>,
    name: String,
    token: String,
}

/// A taken lock. Call [`LockGuard::release`] on every path; a guard that is
/// only dropped is freed by the lock's expiry instead.
#[must_use]
pub struct LockGuard {
    held: Option<HeldLock>,
}

impl LockGuard {
    fn noop() -> Self {
        Self { held: None }
    }

    pub async fn release(self) {
        let Some(held) = self.held else {
            return;
        };
        match held.store.unlock(&held.name, &held.token).await {
            Ok(true) => debug!(lock = %held.name, "Lock released"),
            Ok(false) => warn!(lock = %held.name, "Lock expired before release"),
            Err(e) => warn!(lock = %held.name, error = %e, "Failed to release lock"),
        }
    }
}

/// Cloneable handle to the optional shared cache store.
#[derive(Clone)]
pub struct SharedCache {
    store: Option<Arc<dyn CacheStore>>,
    locks: LockStrategy,
}

impl SharedCache {
    /// No store: pass-through reads, dropped writes, no-op locks.
    pub fn disabled() -> Self {
        Self {
            store: None,
            locks: LockStrategy::Noop,
        }
    }

    pub fn new(store: Arc<dyn CacheStore>, settings: &CacheSettings) -> Self {
        Self {
            locks: LockStrategy::Distributed {
                store: Arc::clone(&store),
                ttl: Duration::from_secs(settings.lock_ttl_secs),
                wait: Duration::from_secs(settings.lock_wait_secs),
            },
            store: Some(store),
        }
    }

    /// Pings `store` and falls back to [`SharedCache::disabled`] if it does not answer.
    pub async fn connect(store: Arc<dyn CacheStore>, settings: &CacheSettings) -> Self {
        match store.ping().await {
            Ok(()) => Self::new(store, settings),
            Err(e) => {
                warn!(error = %e, "Cache store unreachable, running without cache");
                Self::disabled()
            }
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.store.is_some()
    }

    pub fn store(&self) -> Option<&Arc<dyn CacheStore>> {
        self.store.as_ref()
    }

    pub async fn lock(&self, name: &str) -> Result<LockGuard, LockError> {
        self.locks.acquire(name).await
    }

    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let store = self.store.as_ref()?;
        let raw = match store.get(key).await {
            Ok(raw) => raw?,
            Err(e) => {
                degraded(key, &e);
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key, error = %e, "Discarding undecodable cache entry");
                None
            }
        }
    }

    pub async fn set_json<T: Serialize + ?Sized>(&self, key: &str, value: &T, ttl: Option<Duration>) {
        let Some(store) = &self.store else {
            return;
        };
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(key, error = %e, "Cache value not serializable");
                return;
            }
        };
        if let Err(e) = store.set(key, &raw, ttl).await {
            degraded(key, &e);
        }
    }

    pub async fn delete(&self, key: &str) {
        if let Some(store) = &self.store {
            if let Err(e) = store.delete(key).await {
                degraded(key, &e);
            }
        }
    }

    /// Counter value after incrementing, or `None` without a working store.
    pub async fn incr(&self, key: &str, ttl: Duration) -> Option<i64> {
        let store = self.store.as_ref()?;
        match store.incr_with_expiry(key, ttl).await {
            Ok(n) => Some(n),
            Err(e) => {
                degraded(key, &e);
                None
            }
        }
    }

    pub async fn hash_get(&self, key: &str, field: &str) -> Option<String> {
        let store = self.store.as_ref()?;
        match store.hash_get(key, field).await {
            Ok(value) => value,
            Err(e) => {
                degraded(key, &e);
                None
            }
        }
    }

    pub async fn hash_set(&self, key: &str, field: &str, value: &str) {
        if let Some(store) = &self.store {
            if let Err(e) = store.hash_set(key, field, value).await {
                degraded(key, &e);
            }
        }
    }

    pub async fn zset_add(&self, key: &str, member: &str, score: f64) {
        if let Some(store) = &self.store {
            if let Err(e) = store.zset_add(key, member, score).await {
                degraded(key, &e);
            }
        }
    }
}

fn degraded(key: &str, error: &CacheError) {
    warn!(key, error = %error, "Cache operation failed, continuing without cache");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connections::MemoryCacheStore;

    fn settings() -> CacheSettings {
        CacheSettings {
            lock_ttl_secs: 10,
            lock_wait_secs: 1,
            ..CacheSettings::default()
        }
    }

    #[tokio::test]
    async fn test_disabled_cache_is_pass_through() {
        let cache = SharedCache::disabled();
        cache.set_json("k", &42, None).await;
        assert_eq!(cache.get_json::<i32>("k").await, None);
        assert_eq!(cache.incr("c", Duration::from_secs(1)).await, None);
        let guard = cache.lock("anything").await.unwrap();
        guard.release().await;
    }

    #[tokio::test]
    async fn test_json_round_trip_through_store() {
        let cache = SharedCache::new(Arc::new(MemoryCacheStore::new()), &settings());
        cache.set_json("k", &vec![1, 2, 3], None).await;
        assert_eq!(cache.get_json::<Vec<i32>>("k").await, Some(vec![1, 2, 3]));
        cache.delete("k").await;
        assert_eq!(cache.get_json::<Vec<i32>>("k").await, None);
    }

    #[tokio::test]
    async fn test_second_holder_times_out_until_release() {
        let cache = SharedCache::new(Arc::new(MemoryCacheStore::new()), &settings());
        let first = cache.lock("lock:x").await.unwrap();
        assert!(matches!(
            cache.lock("lock:x").await,
            Err(LockError::Timeout { .. })
        ));
        first.release().await;
        let second = cache.lock("lock:x").await.unwrap();
        second.release().await;
    }
}
