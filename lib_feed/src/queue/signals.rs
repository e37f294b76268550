//! # Reactive Signal Queue
//!
//! Request-time code raises a signal for a key (an interest to refill, a story
//! whose comments should be crawled); the worker drains them. A pending-set
//! guards the queue so a key has at most one outstanding entry: a repeated
//! signal is absorbed by the entry already queued, and the pop removes the key
//! from the pending-set in the same atomic step so the next signal after
//! delivery enqueues again.

use crate::cache::SharedCache;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// The kinds of work request-time code can ask the worker for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalTopic {
    /// Refill one interest shelf; keyed by interest id.
    InterestRefill,
    /// Crawl the reply tree of one story; keyed by story id.
    CommentFetch,
}

impl SignalTopic {
    pub fn queue_key(&self) -> &'static str {
        match self {
            SignalTopic::InterestRefill => "interest_fetch_queue",
            SignalTopic::CommentFetch => "comment_fetch_queue",
        }
    }

    pub fn pending_key(&self) -> &'static str {
        match self {
            SignalTopic::InterestRefill => "pending_interests_set",
            SignalTopic::CommentFetch => "pending_comments_set",
        }
    }
}

#[derive(Clone)]
pub struct SignalQueue {
    cache: SharedCache,
}

impl SignalQueue {
    pub fn new(cache: SharedCache) -> Self {
        Self { cache }
    }

    /// Queues `key` unless it is already pending. Returns whether a new entry
    /// was queued; without a cache store nothing is queued.
    pub async fn signal(&self, topic: SignalTopic, key: i64) -> bool {
        let Some(store) = self.cache.store() else {
            return false;
        };
        match store
            .enqueue_unique(topic.queue_key(), topic.pending_key(), &key.to_string())
            .await
        {
            Ok(queued) => {
                debug!(?topic, key, queued, "Signal raised");
                queued
            }
            Err(e) => {
                warn!(?topic, key, error = %e, "Failed to raise signal");
                false
            }
        }
    }

    /// The oldest pending key, waiting at most `timeout`. Always returns within
    /// roughly `timeout` so the caller can run its periodic duties.
    pub async fn await_signal(&self, topic: SignalTopic, timeout: Duration) -> Option<i64> {
        let Some(store) = self.cache.store() else {
            sleep(timeout).await;
            return None;
        };
        match store
            .dequeue_unique(topic.queue_key(), topic.pending_key(), timeout)
            .await
        {
            Ok(Some(raw)) => match raw.parse() {
                Ok(key) => Some(key),
                Err(_) => {
                    warn!(?topic, raw = %raw, "Dropping malformed signal");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!(?topic, error = %e, "Failed to read signal queue");
                sleep(timeout).await;
                None
            }
        }
    }

    /// Number of queued entries for `topic`.
    pub async fn queued(&self, topic: SignalTopic) -> u64 {
        let Some(store) = self.cache.store() else {
            return 0;
        };
        store.queue_len(topic.queue_key()).await.unwrap_or_else(|e| {
            warn!(?topic, error = %e, "Failed to read signal queue length");
            0
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configs::CacheSettings;
    use crate::connections::MemoryCacheStore;
    use std::sync::Arc;

    fn queue() -> SignalQueue {
        let cache = SharedCache::new(Arc::new(MemoryCacheStore::new()), &CacheSettings::default());
        SignalQueue::new(cache)
    }

    #[tokio::test]
    async fn test_resignal_after_delivery_enqueues_again() {
        let q = queue();
        assert!(q.signal(SignalTopic::CommentFetch, 9).await);
        assert_eq!(
            q.await_signal(SignalTopic::CommentFetch, Duration::from_millis(10)).await,
            Some(9)
        );
        assert!(q.signal(SignalTopic::CommentFetch, 9).await);
        assert_eq!(q.queued(SignalTopic::CommentFetch).await, 1);
    }

    #[tokio::test]
    async fn test_topics_are_independent() {
        let q = queue();
        assert!(q.signal(SignalTopic::InterestRefill, 1).await);
        assert!(q.signal(SignalTopic::CommentFetch, 1).await);
        assert_eq!(q.queued(SignalTopic::InterestRefill).await, 1);
        assert_eq!(q.queued(SignalTopic::CommentFetch).await, 1);
    }

    #[tokio::test]
    async fn test_disabled_cache_times_out_empty() {
        let q = SignalQueue::new(SharedCache::disabled());
        assert!(!q.signal(SignalTopic::InterestRefill, 3).await);
        assert_eq!(
            q.await_signal(SignalTopic::InterestRefill, Duration::from_millis(5)).await,
            None
        );
    }
}
