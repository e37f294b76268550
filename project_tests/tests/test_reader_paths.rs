use lib_feed::ai::MockSummarizer;
use lib_feed::cache::SharedCache;
use lib_feed::configs::CacheSettings;
use lib_feed::connections::MemoryCacheStore;
use lib_feed::engine::{ReaderError, ReaderService, SearchError, SummaryRequest};
use lib_feed::queue::{JobQueue, SearchPersistJob, SignalQueue, SignalTopic};
use lib_feed::retrieve::SourceItem;
use lib_feed::store::{ContentBackend, ItemStore, MemoryContentStore};
use lib_feed::worker::{Worker, WorkerDeps};
use project_tests::fakes::{hit, story, ScriptedSearch, ScriptedSource};
use project_tests::test_settings;
use std::sync::Arc;

struct Fixture {
    backend: Arc<dyn ContentBackend>,
    cache: SharedCache,
    search: Arc<ScriptedSearch>,
    reader: ReaderService,
}

fn fixture_with(cache: SharedCache, rate_per_hour: i64) -> Fixture {
    let backend: Arc<dyn ContentBackend> = Arc::new(MemoryContentStore::new());
    let search = Arc::new(ScriptedSearch::new(vec![
        hit(700, "Tokio internals", 80, 1_700_000_100),
        hit(701, "Tracing spans", 40, 1_700_000_050),
    ]));
    let mut settings = test_settings();
    settings.summary.rate_per_hour = rate_per_hour;
    settings.search.max_keywords = 3;
    let reader = ReaderService::new(Arc::clone(&backend), cache.clone(), search.clone(), settings);
    Fixture {
        backend,
        cache,
        search,
        reader,
    }
}

fn fixture() -> Fixture {
    fixture_with(
        SharedCache::new(Arc::new(MemoryCacheStore::new()), &CacheSettings::default()),
        30,
    )
}

#[tokio::test]
async fn test_search_goes_live_once_then_reads_store() {
    let fx = fixture();

    let first = fx.reader.search("Tokio  Runtime", None).await.expect("Search failed");
    assert_eq!(first.iter().map(|s| s.hn_id).collect::<Vec<_>>(), vec![700, 701]);
    assert_eq!(fx.search.calls().len(), 1);
    assert_eq!(fx.search.calls()[0].0, "tokio runtime");

    // The request path only queued persistence.
    assert!(fx.backend.get_item(700).await.expect("Read failed").is_none());
    assert!(fx.backend.get_search("tokio runtime").await.expect("Read failed").is_none());
    let pending: JobQueue<SearchPersistJob> = JobQueue::new(fx.cache.clone());
    assert_eq!(pending.len().await.expect("Length failed"), 1);

    // Same normalized query is served from cache without another live call.
    let again = fx.reader.search("  tokio runtime ", Some(1)).await.expect("Search failed");
    assert_eq!(again.len(), 1);
    assert_eq!(again[0].hn_id, 700);
    assert_eq!(fx.search.calls().len(), 1);

    let worker = Worker::new(
        WorkerDeps {
            backend: Arc::clone(&fx.backend),
            cache: fx.cache.clone(),
            source: Arc::new(ScriptedSource::new()),
            search: fx.search.clone(),
            summarizer: Arc::new(MockSummarizer::default()),
        },
        test_settings(),
    );
    assert_eq!(worker.process_search_jobs(10).await.expect("Jobs failed"), 1);
    assert!(fx.backend.get_item(701).await.expect("Read failed").is_some());
    let record = fx
        .backend
        .get_search("tokio runtime")
        .await
        .expect("Read failed")
        .expect("Search row missing");
    assert_eq!(record.result_ids, vec![700, 701]);

    // Without a cache the stored row answers.
    let uncached = ReaderService::new(
        Arc::clone(&fx.backend),
        SharedCache::disabled(),
        fx.search.clone(),
        test_settings(),
    );
    let stored = uncached.search("TOKIO runtime", None).await.expect("Search failed");
    assert_eq!(stored.iter().map(|s| s.hn_id).collect::<Vec<_>>(), vec![700, 701]);
    assert_eq!(fx.search.calls().len(), 1);
}

#[tokio::test]
async fn test_search_rejects_bad_queries() {
    let fx = fixture();
    let empty = fx.reader.search("   ", None).await.expect_err("Empty query must fail");
    assert!(matches!(empty, ReaderError::Search(SearchError::EmptyQuery)));

    let wide = fx
        .reader
        .search("one two three four", None)
        .await
        .expect_err("Too many keywords must fail");
    assert!(matches!(
        wide,
        ReaderError::Search(SearchError::TooManyKeywords { max: 3, got: 4 })
    ));
    assert!(fx.search.calls().is_empty());
}

#[tokio::test]
async fn test_story_detail_asks_for_comments_and_marks_seen() {
    let fx = fixture();
    let src = SourceItem::from_value(story(1, "With replies", 10, 1_700_000_000, &[10, 11]))
        .expect("Fixture must parse");
    ItemStore::new(Arc::clone(&fx.backend))
        .upsert(&src, None)
        .await
        .expect("Upsert failed");

    let detail = fx
        .reader
        .story_detail(Some("u1"), 1)
        .await
        .expect("Detail failed")
        .expect("Story missing");
    assert_eq!(detail.item.hn_id, 1);
    assert!(detail.comments.is_empty());

    let signals = SignalQueue::new(fx.cache.clone());
    assert_eq!(signals.queued(SignalTopic::CommentFetch).await, 1);

    let states = fx.backend.get_user_states("u1", &[1]).await.expect("States failed");
    assert!(states[&1].last_seen_at.is_some());

    assert!(fx.reader.story_detail(None, 999).await.expect("Detail failed").is_none());
}

#[tokio::test]
async fn test_summary_requests_are_rate_limited_per_user() {
    let fx = fixture_with(
        SharedCache::new(Arc::new(MemoryCacheStore::new()), &CacheSettings::default()),
        2,
    );
    for _ in 0..2 {
        assert_eq!(
            fx.reader.request_summary("u1", 1).await.expect("Request failed"),
            SummaryRequest::Queued
        );
    }
    assert_eq!(
        fx.reader.request_summary("u1", 1).await.expect("Request failed"),
        SummaryRequest::RateLimited { limit: 2 }
    );
    // Budgets are per user.
    assert_eq!(
        fx.reader.request_summary("u2", 1).await.expect("Request failed"),
        SummaryRequest::Queued
    );
}

#[tokio::test]
async fn test_requests_without_cache_are_unavailable() {
    let fx = fixture_with(SharedCache::disabled(), 30);
    assert_eq!(
        fx.reader.request_summary("u1", 1).await.expect("Request failed"),
        SummaryRequest::Unavailable
    );
}
