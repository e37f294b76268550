use chrono::Utc;
use lib_feed::cache::SharedCache;
use lib_feed::configs::CacheSettings;
use lib_feed::connections::MemoryCacheStore;
use lib_feed::engine::{seed_catalog, ReaderError, ReaderService, ShelfManager};
use lib_feed::queue::{SignalQueue, SignalTopic};
use lib_feed::retrieve::SourceItem;
use lib_feed::store::{ContentBackend, Interest, ItemStore, MemoryContentStore};
use project_tests::fakes::{story, ScriptedSearch};
use project_tests::test_settings;
use std::sync::Arc;

struct Fixture {
    reader: ReaderService,
    items: ItemStore,
    shelves: ShelfManager,
    signals: SignalQueue,
    interests: Vec<Interest>,
}

async fn fixture() -> Fixture {
    let backend: Arc<dyn ContentBackend> = Arc::new(MemoryContentStore::new());
    let cache = SharedCache::new(Arc::new(MemoryCacheStore::new()), &CacheSettings::default());
    let interests = seed_catalog(backend.as_ref()).await.expect("Seeding failed");
    Fixture {
        reader: ReaderService::new(
            Arc::clone(&backend),
            cache.clone(),
            Arc::new(ScriptedSearch::default()),
            test_settings(),
        ),
        items: ItemStore::new(Arc::clone(&backend)),
        shelves: ShelfManager::new(Arc::clone(&backend), cache.clone()),
        signals: SignalQueue::new(cache),
        interests,
    }
}

impl Fixture {
    async fn shelve(&self, interest_id: i64, hn_id: i64, points: i64) {
        let now = Utc::now().timestamp();
        let src = SourceItem::from_value(story(hn_id, &format!("Story {hn_id}"), points, now, &[]))
            .expect("Fixture must parse");
        self.items.upsert(&src, None).await.expect("Upsert failed");
        self.shelves
            .upsert_shelf_entry(interest_id, hn_id, Some(points), Some(now))
            .await
            .expect("Shelf upsert failed");
    }

    fn selection(&self) -> Vec<i64> {
        let mut ids: Vec<i64> = self.interests.iter().map(|i| i.id).collect();
        ids.sort_unstable();
        ids.truncate(5);
        ids
    }
}

#[tokio::test]
async fn test_feed_interleaves_ranked_shelves() {
    let fx = fixture().await;
    let selection = fx.selection();
    fx.reader
        .select_interests("u1", &selection)
        .await
        .expect("Selection failed");

    let (a, b) = (selection[0], selection[1]);
    fx.shelve(a, 101, 500).await;
    fx.shelve(a, 102, 10).await;
    fx.shelve(b, 201, 300).await;
    fx.shelve(b, 202, 5).await;

    let feed = fx.reader.feed("u1", None).await.expect("Feed failed");
    let ids: Vec<i64> = feed.iter().map(|e| e.hn_id).collect();
    assert_eq!(ids, vec![101, 201, 102, 202]);

    let name_a = &fx.interests.iter().find(|i| i.id == a).expect("Interest missing").name;
    assert_eq!(feed[0].tags, vec![name_a.clone()]);
    assert_eq!(feed[0].title.as_deref(), Some("Story 101"));

    let limited = fx.reader.feed("u1", Some(2)).await.expect("Feed failed");
    assert_eq!(limited.len(), 2);
}

#[tokio::test]
async fn test_dismissed_and_read_items_are_excluded() {
    let fx = fixture().await;
    let selection = fx.selection();
    fx.reader
        .select_interests("u1", &selection)
        .await
        .expect("Selection failed");
    fx.shelve(selection[0], 101, 500).await;
    fx.shelve(selection[0], 102, 10).await;
    fx.shelve(selection[1], 201, 300).await;

    fx.reader
        .mark_dismissed("u1", &[201])
        .await
        .expect("Dismiss failed");
    let receipt = fx.reader.mark_read("u1", 102).await.expect("Read failed");
    assert_eq!(receipt.state.read_count, 1);
    assert_eq!(receipt.shelf_rows, 1);

    let ids: Vec<i64> = fx
        .reader
        .feed("u1", None)
        .await
        .expect("Feed failed")
        .iter()
        .map(|e| e.hn_id)
        .collect();
    assert_eq!(ids, vec![101]);

    // Another user still sees everything.
    fx.reader
        .select_interests("u2", &selection)
        .await
        .expect("Selection failed");
    assert_eq!(fx.reader.feed("u2", None).await.expect("Feed failed").len(), 3);
}

#[tokio::test]
async fn test_short_shelves_raise_one_refill_signal_each() {
    let fx = fixture().await;
    let selection = fx.selection();
    fx.reader
        .select_interests("u1", &selection)
        .await
        .expect("Selection failed");
    fx.shelve(selection[0], 101, 50).await;

    fx.reader.feed("u1", None).await.expect("Feed failed");
    fx.reader.feed("u1", None).await.expect("Feed failed");

    assert_eq!(fx.signals.queued(SignalTopic::InterestRefill).await, 5);
}

#[tokio::test]
async fn test_user_without_interests_gets_empty_feed() {
    let fx = fixture().await;
    let feed = fx.reader.feed("nobody", None).await.expect("Feed failed");
    assert!(feed.is_empty());
}

#[tokio::test]
async fn test_selection_size_is_bounded() {
    let fx = fixture().await;
    let selection = fx.selection();
    let err = fx
        .reader
        .select_interests("u1", &selection[..4])
        .await
        .expect_err("Four interests must be rejected");
    assert!(matches!(err, ReaderError::Selection { got: 4, .. }));
}
