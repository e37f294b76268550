//! # Interest Shelf Manager
//!
//! Each interest owns a bounded shelf of items with cached rank inputs. Two
//! capping policies exist for two call sites:
//!
//! - [`ShelfManager::evict_below_top_n`] keeps the best-ranked entries; the
//!   reactive refill path uses it.
//! - [`ShelfManager::rotate_by_recency`] keeps the highest (newest) ids; the
//!   periodic full refresh uses it.
//!
//! Caps on one interest are serialized in-process by a keyed lock.

use crate::cache::SharedCache;
use crate::store::{ContentBackend, KeyedLocks, ShelfEntry, StoreError};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info};

const POINTS_WEIGHT: f64 = 0.6;
const RECENCY_WEIGHT: f64 = 0.3;
const READS_WEIGHT: f64 = 0.1;
const RECENCY_WINDOW_HOURS: f64 = 72.0;

const WATERMARKS_KEY: &str = "interest_watermarks";

/// Rank of a shelf entry at unix time `now`. Higher sorts first.
///
/// Recency decays linearly to zero over 72 hours; an entry without a time gets
/// no recency credit. Negative inputs count as zero.
pub fn rank(points: i64, time: Option<i64>, read_count: i64, now: i64) -> f64 {
    let recency = match time {
        Some(t) => {
            let age_hours = (now - t).max(0) as f64 / 3600.0;
            (1.0 - age_hours / RECENCY_WINDOW_HOURS).max(0.0)
        }
        None => 0.0,
    };
    POINTS_WEIGHT * (points.max(0) as f64).ln_1p() + RECENCY_WEIGHT * recency
        - READS_WEIGHT * (read_count.max(0) as f64).ln_1p()
}

/// Sorts by rank descending, insertion order breaking ties.
pub fn sort_by_rank(entries: &mut [ShelfEntry], now: i64) {
    entries.sort_by(|a, b| {
        let ra = rank(a.points, a.time, a.read_count, now);
        let rb = rank(b.points, b.time, b.read_count, now);
        rb.total_cmp(&ra).then_with(|| a.seq.cmp(&b.seq))
    });
}

pub struct ShelfManager {
    backend: Arc<dyn ContentBackend>,
    cache: SharedCache,
    locks: KeyedLocks,
}

impl ShelfManager {
    pub fn new(backend: Arc<dyn ContentBackend>, cache: SharedCache) -> Self {
        Self {
            backend,
            cache,
            locks: KeyedLocks::default(),
        }
    }

    pub async fn upsert_shelf_entry(
        &self,
        interest_id: i64,
        hn_id: i64,
        points: Option<i64>,
        time: Option<i64>,
    ) -> Result<(), StoreError> {
        self.backend
            .upsert_shelf_entry(interest_id, hn_id, points, time, Utc::now())
            .await
    }

    /// The shelf ordered by rank at call time.
    pub async fn list_shelf(&self, interest_id: i64) -> Result<Vec<ShelfEntry>, StoreError> {
        let mut entries = self.backend.list_shelf(interest_id).await?;
        sort_by_rank(&mut entries, Utc::now().timestamp());
        Ok(entries)
    }

    /// Deletes every entry except the `n` best-ranked. Returns how many went.
    pub async fn evict_below_top_n(&self, interest_id: i64, n: usize) -> Result<u64, StoreError> {
        let _guard = self.locks.lock(interest_id).await;
        let ranked = self.list_shelf(interest_id).await?;
        if ranked.len() <= n {
            return Ok(0);
        }
        let keep: Vec<i64> = ranked.iter().take(n).map(|e| e.hn_id).collect();
        let removed = self.backend.retain_shelf(interest_id, &keep).await?;
        info!(interest_id, kept = keep.len(), removed, "Shelf evicted to top entries");
        Ok(removed)
    }

    /// Keeps the `max_size` highest ids (the newest items) when over capacity.
    pub async fn rotate_by_recency(&self, interest_id: i64, max_size: usize) -> Result<u64, StoreError> {
        let _guard = self.locks.lock(interest_id).await;
        let mut ids: Vec<i64> = self
            .backend
            .list_shelf(interest_id)
            .await?
            .into_iter()
            .map(|e| e.hn_id)
            .collect();
        if ids.len() <= max_size {
            return Ok(0);
        }
        ids.sort_unstable_by(|a, b| b.cmp(a));
        ids.truncate(max_size);
        let removed = self.backend.retain_shelf(interest_id, &ids).await?;
        info!(interest_id, kept = ids.len(), removed, "Shelf rotated to newest entries");
        Ok(removed)
    }

    /// Highest item time already ingested for the interest. Falls back to the
    /// shelf contents when the cache holds no mark.
    pub async fn watermark(&self, interest_id: i64) -> Result<Option<i64>, StoreError> {
        let cached = self
            .cache
            .hash_get(WATERMARKS_KEY, &interest_id.to_string())
            .await
            .and_then(|raw| raw.parse::<i64>().ok());
        match cached {
            Some(mark) => Ok(Some(mark)),
            None => self.backend.max_shelf_time(interest_id).await,
        }
    }

    /// Moves the watermark forward to `observed`; never moves it back.
    pub async fn advance_watermark(&self, interest_id: i64, observed: i64) -> Result<(), StoreError> {
        let current = self.watermark(interest_id).await?;
        if current.is_some_and(|mark| mark >= observed) {
            return Ok(());
        }
        self.cache
            .hash_set(WATERMARKS_KEY, &interest_id.to_string(), &observed.to_string())
            .await;
        debug!(interest_id, watermark = observed, "Watermark advanced");
        Ok(())
    }

    /// Counts one read of `hn_id` on every shelf row and owning interest.
    pub async fn record_read(&self, hn_id: i64) -> Result<(u64, u64), StoreError> {
        let shelves = self.backend.increment_shelf_reads(hn_id).await?;
        let interests = self
            .backend
            .increment_interest_reads(hn_id, Utc::now())
            .await?;
        Ok((shelves, interests))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryContentStore;

    const NOW: i64 = 1_700_000_000;

    #[test]
    fn test_fresh_beats_stale_at_equal_points() {
        let fresh = rank(100, Some(NOW), 0, NOW);
        let stale = rank(100, Some(NOW - 100 * 3600), 0, NOW);
        assert!(fresh > stale);
        assert!((fresh - stale - RECENCY_WEIGHT).abs() < 1e-9);
    }

    #[test]
    fn test_reads_lower_rank_and_missing_time_gets_no_recency() {
        assert!(rank(10, Some(NOW), 5, NOW) < rank(10, Some(NOW), 0, NOW));
        assert_eq!(rank(0, None, 0, NOW), 0.0);
        assert_eq!(rank(-5, None, -3, NOW), 0.0);
    }

    #[test]
    fn test_sort_breaks_ties_by_insertion() {
        let entry = |hn_id, seq| ShelfEntry {
            interest_id: 1,
            hn_id,
            points: 10,
            time: Some(NOW),
            read_count: 0,
            last_seen_at: Utc::now(),
            seq,
        };
        let mut entries = vec![entry(30, 3), entry(10, 1), entry(20, 2)];
        sort_by_rank(&mut entries, NOW);
        assert_eq!(entries.iter().map(|e| e.hn_id).collect::<Vec<_>>(), vec![10, 20, 30]);
    }

    #[tokio::test]
    async fn test_rotate_keeps_newest_ids() {
        let backend = Arc::new(MemoryContentStore::new());
        let shelves = ShelfManager::new(backend, SharedCache::disabled());
        for id in 1..=6 {
            shelves.upsert_shelf_entry(1, id, Some(1000 - id), Some(NOW)).await.unwrap();
        }
        assert_eq!(shelves.rotate_by_recency(1, 4).await.unwrap(), 2);
        let mut left: Vec<i64> = shelves.list_shelf(1).await.unwrap().iter().map(|e| e.hn_id).collect();
        left.sort();
        assert_eq!(left, vec![3, 4, 5, 6]);
    }

    #[tokio::test]
    async fn test_watermark_falls_back_to_shelf_and_only_advances() {
        let backend = Arc::new(MemoryContentStore::new());
        let cache = SharedCache::new(
            Arc::new(crate::connections::MemoryCacheStore::new()),
            &crate::configs::CacheSettings::default(),
        );
        let shelves = ShelfManager::new(backend, cache);
        assert_eq!(shelves.watermark(7).await.unwrap(), None);
        shelves.upsert_shelf_entry(7, 1, Some(1), Some(500)).await.unwrap();
        assert_eq!(shelves.watermark(7).await.unwrap(), Some(500));
        shelves.advance_watermark(7, 900).await.unwrap();
        shelves.advance_watermark(7, 600).await.unwrap();
        assert_eq!(shelves.watermark(7).await.unwrap(), Some(900));
    }
}
