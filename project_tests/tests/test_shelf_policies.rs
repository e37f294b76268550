use chrono::Utc;
use lib_feed::cache::SharedCache;
use lib_feed::configs::CacheSettings;
use lib_feed::connections::MemoryCacheStore;
use lib_feed::engine::ShelfManager;
use lib_feed::store::{ContentBackend, MemoryContentStore};
use std::collections::HashSet;
use std::sync::Arc;

const INTEREST: i64 = 1;

fn manager(cache: SharedCache) -> (Arc<MemoryContentStore>, ShelfManager) {
    let backend = Arc::new(MemoryContentStore::new());
    let shelves = ShelfManager::new(backend.clone(), cache);
    (backend, shelves)
}

fn memory_cache() -> SharedCache {
    SharedCache::new(Arc::new(MemoryCacheStore::new()), &CacheSettings::default())
}

#[tokio::test]
async fn test_eviction_keeps_top_ranked_entries() {
    let (_backend, shelves) = manager(memory_cache());
    let now = Utc::now().timestamp();
    let mut scored = Vec::new();
    for i in 1..=80_i64 {
        // Distinct points; every age stays inside the 72 hour window, so the
        // recency term drifts equally for all entries while the test runs.
        let points = (i * 37) % 101;
        let age_hours = i % 70;
        shelves
            .upsert_shelf_entry(INTEREST, i, Some(points), Some(now - age_hours * 3600))
            .await
            .expect("Shelf upsert failed");
        let score = 0.6 * (points as f64).ln_1p() + 0.3 * (1.0 - age_hours as f64 / 72.0);
        scored.push((score, i));
    }
    scored.sort_by(|a, b| b.0.total_cmp(&a.0));
    let expected: HashSet<i64> = scored.iter().take(50).map(|&(_, id)| id).collect();

    let removed = shelves
        .evict_below_top_n(INTEREST, 50)
        .await
        .expect("Eviction failed");
    assert_eq!(removed, 30);

    let kept: HashSet<i64> = shelves
        .list_shelf(INTEREST)
        .await
        .expect("List failed")
        .iter()
        .map(|e| e.hn_id)
        .collect();
    assert_eq!(kept, expected);

    // Under capacity nothing moves.
    assert_eq!(shelves.evict_below_top_n(INTEREST, 50).await.expect("Eviction failed"), 0);
}

#[tokio::test]
async fn test_rotation_keeps_newest_ids() {
    let (backend, shelves) = manager(memory_cache());
    for i in 1..=60_i64 {
        shelves
            .upsert_shelf_entry(INTEREST, i, Some(1000 - i), None)
            .await
            .expect("Shelf upsert failed");
    }
    let removed = shelves
        .rotate_by_recency(INTEREST, 50)
        .await
        .expect("Rotation failed");
    assert_eq!(removed, 10);

    let mut ids: Vec<i64> = backend
        .list_shelf(INTEREST)
        .await
        .expect("List failed")
        .iter()
        .map(|e| e.hn_id)
        .collect();
    ids.sort_unstable();
    assert_eq!(ids, (11..=60).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_reads_push_entries_down() {
    let (_backend, shelves) = manager(memory_cache());
    let now = Utc::now().timestamp();
    shelves
        .upsert_shelf_entry(INTEREST, 1, Some(100), Some(now))
        .await
        .expect("Shelf upsert failed");
    shelves
        .upsert_shelf_entry(INTEREST, 2, Some(100), Some(now))
        .await
        .expect("Shelf upsert failed");

    let before: Vec<i64> = shelves.list_shelf(INTEREST).await.expect("List failed").iter().map(|e| e.hn_id).collect();
    assert_eq!(before, vec![1, 2]);

    shelves.record_read(1).await.expect("Read failed");
    let after: Vec<i64> = shelves.list_shelf(INTEREST).await.expect("List failed").iter().map(|e| e.hn_id).collect();
    assert_eq!(after, vec![2, 1]);
}

#[tokio::test]
async fn test_watermark_only_moves_forward() {
    let (_backend, shelves) = manager(memory_cache());
    assert_eq!(shelves.watermark(INTEREST).await.expect("Read failed"), None);

    shelves.advance_watermark(INTEREST, 100).await.expect("Advance failed");
    shelves.advance_watermark(INTEREST, 50).await.expect("Advance failed");
    assert_eq!(shelves.watermark(INTEREST).await.expect("Read failed"), Some(100));
}

#[tokio::test]
async fn test_watermark_falls_back_to_shelf_times() {
    let (_backend, shelves) = manager(SharedCache::disabled());
    shelves
        .upsert_shelf_entry(INTEREST, 1, Some(1), Some(1_700_000_100))
        .await
        .expect("Shelf upsert failed");
    shelves
        .upsert_shelf_entry(INTEREST, 2, Some(1), Some(1_700_000_050))
        .await
        .expect("Shelf upsert failed");
    assert_eq!(
        shelves.watermark(INTEREST).await.expect("Read failed"),
        Some(1_700_000_100)
    );
}
