//! # Feed Assembler
//!
//! Builds a personalized feed from the ranked shelves of the user's selected
//! interests. The interleave is round-robin by position across interests in a
//! fixed order, so no single interest dominates the head of the feed.
//!
//! A shelf whose unseen pool is running low raises a refill signal for the
//! worker; the assembler itself never fetches.

use super::shelf::ShelfManager;
use crate::cache::SharedCache;
use crate::configs::{FeedLimits, InterestSettings};
use crate::queue::{SignalQueue, SignalTopic};
use crate::store::{ContentBackend, StoreError};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

pub const ACTIVE_USERS_KEY: &str = "active_users";

#[derive(Debug, Error)]
pub enum FeedError {
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// One item of an assembled feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedEntry {
    pub hn_id: i64,
    pub title: Option<String>,
    pub url: Option<String>,
    pub score: Option<i64>,
    pub time: Option<i64>,
    /// Names of every selected interest whose shelf offered the item.
    pub tags: Vec<String>,
}

/// Takes the item at each position of every pool in turn until `limit` ids
/// are collected or no pool reaches the current position. Ids already taken
/// are skipped.
pub fn interleave(pools: &[Vec<i64>], limit: usize) -> Vec<i64> {
    let mut out = Vec::new();
    let mut added = HashSet::new();
    let mut cursor = 0;
    while out.len() < limit {
        let mut reached = false;
        for pool in pools {
            let Some(&hn_id) = pool.get(cursor) else {
                continue;
            };
            reached = true;
            if added.insert(hn_id) {
                out.push(hn_id);
                if out.len() >= limit {
                    break;
                }
            }
        }
        if !reached {
            break;
        }
        cursor += 1;
    }
    out
}

pub struct FeedAssembler {
    backend: Arc<dyn ContentBackend>,
    shelves: Arc<ShelfManager>,
    signals: SignalQueue,
    cache: SharedCache,
    max_limit: usize,
    low_water: usize,
}

impl FeedAssembler {
    pub fn new(
        backend: Arc<dyn ContentBackend>,
        shelves: Arc<ShelfManager>,
        signals: SignalQueue,
        cache: SharedCache,
        limits: &FeedLimits,
        interest: &InterestSettings,
    ) -> Self {
        Self {
            backend,
            shelves,
            signals,
            cache,
            max_limit: limits.limit,
            low_water: interest.low_water,
        }
    }

    /// The feed for `user_id`, at most `limit` entries (capped by the configured maximum).
    pub async fn assemble(&self, user_id: &str, limit: Option<usize>) -> Result<Vec<FeedEntry>, FeedError> {
        let limit = limit.map_or(self.max_limit, |l| l.min(self.max_limit));
        let now = Utc::now();
        self.cache
            .zset_add(ACTIVE_USERS_KEY, user_id, now.timestamp() as f64)
            .await;

        let interests = self.backend.get_user_interests(user_id).await?;
        if interests.is_empty() {
            debug!(user_id, "No interests selected");
            return Ok(Vec::new());
        }

        let mut shelves = Vec::with_capacity(interests.len());
        let mut all_ids = HashSet::new();
        for interest in &interests {
            let ids: Vec<i64> = self
                .shelves
                .list_shelf(interest.id)
                .await?
                .into_iter()
                .map(|e| e.hn_id)
                .collect();
            all_ids.extend(ids.iter().copied());
            shelves.push(ids);
        }

        let all_ids: Vec<i64> = all_ids.into_iter().collect();
        let states = self.backend.get_user_states(user_id, &all_ids).await?;
        let excluded = |hn_id: &i64| states.get(hn_id).is_some_and(|s| s.is_excluded());

        let mut pools = Vec::with_capacity(shelves.len());
        for (interest, shelf) in interests.iter().zip(shelves) {
            let unseen: Vec<i64> = shelf.into_iter().filter(|id| !excluded(id)).collect();
            if unseen.is_empty() || unseen.len() < self.low_water {
                self.signals
                    .signal(SignalTopic::InterestRefill, interest.id)
                    .await;
            }
            pools.push(unseen);
        }

        let ids = interleave(&pools, limit);

        let mut tags: HashMap<i64, Vec<String>> = HashMap::new();
        for (interest, pool) in interests.iter().zip(&pools) {
            for hn_id in pool {
                tags.entry(*hn_id).or_default().push(interest.name.clone());
            }
        }

        let items: HashMap<i64, _> = self
            .backend
            .get_items(&ids)
            .await?
            .into_iter()
            .map(|item| (item.hn_id, item))
            .collect();

        let mut feed = Vec::with_capacity(ids.len());
        for hn_id in ids {
            let Some(item) = items.get(&hn_id) else {
                warn!(hn_id, "Shelf entry without stored item");
                continue;
            };
            feed.push(FeedEntry {
                hn_id,
                title: item.title.clone(),
                url: item.url.clone(),
                score: item.score,
                time: item.time,
                tags: tags.remove(&hn_id).unwrap_or_default(),
            });
        }
        info!(user_id, interests = interests.len(), count = feed.len(), "Feed assembled");
        Ok(feed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_robin_by_position() {
        assert_eq!(interleave(&[vec![1, 2, 3], vec![4, 5]], 4), vec![1, 4, 2, 5]);
    }

    #[test]
    fn test_exhausted_pools_are_skipped() {
        assert_eq!(interleave(&[vec![1, 2, 3], vec![4]], 10), vec![1, 4, 2, 3]);
        assert_eq!(interleave(&[vec![], vec![7, 8]], 10), vec![7, 8]);
        assert!(interleave(&[], 10).is_empty());
    }

    #[test]
    fn test_duplicates_across_pools_appear_once() {
        assert_eq!(interleave(&[vec![1, 2], vec![1, 3]], 10), vec![1, 2, 3]);
    }

    #[test]
    fn test_limit_is_honored_mid_round() {
        assert_eq!(interleave(&[vec![1, 2], vec![3, 4], vec![5, 6]], 4), vec![1, 3, 5, 2]);
        assert!(interleave(&[vec![1]], 0).is_empty());
    }
}
