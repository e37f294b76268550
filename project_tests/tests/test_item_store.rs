use futures_util::future::join_all;
use lib_feed::retrieve::SourceItem;
use lib_feed::store::{ItemStore, MemoryContentStore};
use project_tests::fakes::{comment, story};
use std::sync::Arc;

fn item_store() -> ItemStore {
    ItemStore::new(Arc::new(MemoryContentStore::new()))
}

fn source(payload: serde_json::Value) -> SourceItem {
    SourceItem::from_value(payload).expect("Fixture must parse")
}

#[tokio::test]
async fn test_repeated_upsert_changes_nothing_but_fetch_time() {
    let items = item_store();
    let src = source(story(1, "Launch", 10, 1_700_000_000, &[]));

    let first = items.upsert(&src, None).await.expect("First upsert failed");
    assert!(first.created);
    assert!(!first.updated);

    let second = items.upsert(&src, None).await.expect("Second upsert failed");
    assert!(!second.created);
    assert!(!second.updated);
    assert_eq!(second.item.content_hash, first.item.content_hash);
    assert_eq!(second.item.content_changed_at, first.item.content_changed_at);
    assert!(second.item.last_fetched_at >= first.item.last_fetched_at);
}

#[tokio::test]
async fn test_changed_content_advances_change_time() {
    let items = item_store();
    let first = items
        .upsert(&source(story(1, "Launch", 10, 1_700_000_000, &[])), None)
        .await
        .expect("First upsert failed");

    let changed = items
        .upsert(&source(story(1, "Launch", 11, 1_700_000_000, &[])), None)
        .await
        .expect("Changed upsert failed");

    assert!(changed.updated);
    assert!(!changed.created);
    assert_ne!(changed.item.content_hash, first.item.content_hash);
    assert!(changed.item.content_changed_at > first.item.content_changed_at);
    assert_eq!(changed.item.score, Some(11));

    // Stored row reflects the change.
    let stored = items.get(1).await.expect("Read failed").expect("Item missing");
    assert_eq!(stored.content_hash, changed.item.content_hash);
}

#[tokio::test]
async fn test_concurrent_upserts_create_once() {
    let items = Arc::new(item_store());
    let src = source(story(7, "Race", 1, 1_700_000_000, &[]));

    let results = join_all((0..8).map(|_| {
        let items = Arc::clone(&items);
        let src = src.clone();
        async move { items.upsert(&src, None).await }
    }))
    .await;

    let created = results
        .iter()
        .filter(|r| r.as_ref().expect("Upsert failed").created)
        .count();
    assert_eq!(created, 1);
}

#[tokio::test]
async fn test_comment_keeps_its_story() {
    let items = item_store();
    let stored = items
        .upsert(&source(comment(10, 1, &[])), Some(1))
        .await
        .expect("Comment upsert failed");
    assert!(stored.item.is_comment());
    assert_eq!(stored.item.story_id, Some(1));
    assert_eq!(stored.item.parent_id, Some(1));
}
