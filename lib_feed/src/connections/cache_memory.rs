//! # In-Memory Cache Store
//!
//! A single-process `CacheStore` with the same semantics as the Redis backend:
//! TTLs expire lazily on access, the de-dup enqueue and dequeue are atomic under
//! one mutex, and a blocked dequeue wakes as soon as anything is pushed. Used by
//! tests and by the reader in `--memory` mode.

use super::cache_store::{CacheError, CacheStore};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;

#[derive(Default)]
struct MemoryState {
    values: HashMap<String, (String, Option<Instant>)>,
    sets: HashMap<String, HashSet<String>>,
    lists: HashMap<String, VecDeque<String>>,
    hashes: HashMap<String, HashMap<String, String>>,
    zsets: HashMap<String, HashMap<String, f64>>,
    locks: HashMap<String, (String, Instant)>,
}

impl MemoryState {
    fn live_value(&mut self, key: &str) -> Option<&mut (String, Option<Instant>)> {
        let expired = matches!(self.values.get(key), Some((_, Some(at))) if *at <= Instant::now());
        if expired {
            self.values.remove(key);
        }
        self.values.get_mut(key)
    }

    fn pop_unique(&mut self, queue: &str, pending: &str) -> Option<String> {
        let value = self.lists.get_mut(queue)?.pop_back()?;
        if let Some(set) = self.sets.get_mut(pending) {
            set.remove(&value);
        }
        Some(value)
    }
}

/// Process-local `CacheStore`.
#[derive(Default)]
pub struct MemoryCacheStore {
    state: Mutex<MemoryState>,
    pushed: Notify,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> Result<MutexGuard<'_, MemoryState>, CacheError> {
        self.state
            .lock()
            .map_err(|_| CacheError::Unavailable("memory cache lock poisoned".to_string()))
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn ping(&self) -> Result<(), CacheError> {
        self.state().map(|_| ())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        Ok(self.state()?.live_value(key).map(|(v, _)| v.clone()))
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), CacheError> {
        let expires = ttl.map(|t| Instant::now() + t);
        self.state()?
            .values
            .insert(key.to_string(), (value.to_string(), expires));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut state = self.state()?;
        state.values.remove(key);
        state.sets.remove(key);
        state.lists.remove(key);
        state.hashes.remove(key);
        state.zsets.remove(key);
        Ok(())
    }

    async fn incr_with_expiry(&self, key: &str, ttl: Duration) -> Result<i64, CacheError> {
        let mut state = self.state()?;
        let next = match state.live_value(key) {
            Some((raw, _)) => {
                let n = raw.parse::<i64>().unwrap_or(0) + 1;
                *raw = n.to_string();
                n
            }
            None => {
                state
                    .values
                    .insert(key.to_string(), ("1".to_string(), Some(Instant::now() + ttl)));
                1
            }
        };
        Ok(next)
    }

    async fn enqueue_unique(&self, queue: &str, pending: &str, member: &str) -> Result<bool, CacheError> {
        let added = {
            let mut state = self.state()?;
            let fresh = state
                .sets
                .entry(pending.to_string())
                .or_default()
                .insert(member.to_string());
            if fresh {
                state
                    .lists
                    .entry(queue.to_string())
                    .or_default()
                    .push_front(member.to_string());
            }
            fresh
        };
        if added {
            self.pushed.notify_waiters();
        }
        Ok(added)
    }

    async fn dequeue_unique(
        &self,
        queue: &str,
        pending: &str,
        timeout: Duration,
    ) -> Result<Option<String>, CacheError> {
        let deadline = Instant::now() + timeout;
        loop {
            // Register interest before checking so a push in between is not missed.
            let notified = self.pushed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let popped = self.state()?.pop_unique(queue, pending);
            if let Some(value) = popped {
                return Ok(Some(value));
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return Ok(None);
            }
        }
    }

    async fn push(&self, queue: &str, value: &str) -> Result<(), CacheError> {
        self.state()?
            .lists
            .entry(queue.to_string())
            .or_default()
            .push_front(value.to_string());
        self.pushed.notify_waiters();
        Ok(())
    }

    async fn pop(&self, queue: &str) -> Result<Option<String>, CacheError> {
        Ok(self.state()?.lists.get_mut(queue).and_then(|l| l.pop_back()))
    }

    async fn queue_len(&self, queue: &str) -> Result<u64, CacheError> {
        Ok(self.state()?.lists.get(queue).map_or(0, |l| l.len() as u64))
    }

    async fn hash_set(&self, key: &str, field: &str, value: &str) -> Result<(), CacheError> {
        self.state()?
            .hashes
            .entry(key.to_string())
            .or_default()
            .insert(field.to_string(), value.to_string());
        Ok(())
    }

    async fn hash_get(&self, key: &str, field: &str) -> Result<Option<String>, CacheError> {
        Ok(self
            .state()?
            .hashes
            .get(key)
            .and_then(|h| h.get(field).cloned()))
    }

    async fn zset_add(&self, key: &str, member: &str, score: f64) -> Result<(), CacheError> {
        self.state()?
            .zsets
            .entry(key.to_string())
            .or_default()
            .insert(member.to_string(), score);
        Ok(())
    }

    async fn try_lock(&self, name: &str, token: &str, ttl: Duration) -> Result<bool, CacheError> {
        let mut state = self.state()?;
        let now = Instant::now();
        let free = match state.locks.get(name) {
            Some((_, expires)) => *expires <= now,
            None => true,
        };
        if free {
            state
                .locks
                .insert(name.to_string(), (token.to_string(), now + ttl));
        }
        Ok(free)
    }

    async fn unlock(&self, name: &str, token: &str) -> Result<bool, CacheError> {
        let mut state = self.state()?;
        let owned = state.locks.get(name).is_some_and(|(t, _)| t == token);
        if owned {
            state.locks.remove(name);
        }
        Ok(owned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ttl_expires_value() {
        let store = MemoryCacheStore::new();
        store.set("k", "v", Some(Duration::from_millis(20))).await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(store.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_lock_is_exclusive_until_released_by_owner() {
        let store = MemoryCacheStore::new();
        let ttl = Duration::from_secs(5);
        assert!(store.try_lock("l", "a", ttl).await.unwrap());
        assert!(!store.try_lock("l", "b", ttl).await.unwrap());
        assert!(!store.unlock("l", "b").await.unwrap());
        assert!(store.unlock("l", "a").await.unwrap());
        assert!(store.try_lock("l", "b", ttl).await.unwrap());
    }

    #[tokio::test]
    async fn test_dequeue_wakes_on_push() {
        let store = std::sync::Arc::new(MemoryCacheStore::new());
        let consumer = {
            let store = store.clone();
            tokio::spawn(async move {
                store
                    .dequeue_unique("q", "p", Duration::from_secs(2))
                    .await
                    .unwrap()
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(store.enqueue_unique("q", "p", "7").await.unwrap());
        assert_eq!(consumer.await.unwrap().as_deref(), Some("7"));
        // Delivery cleared the pending marker, so the same member queues again.
        assert!(store.enqueue_unique("q", "p", "7").await.unwrap());
    }
}
