use async_trait::async_trait;
use lib_feed::ai::{MockSummarizer, SummarizeError, Summarizer, SummaryData};
use lib_feed::cache::{SharedCache, SummaryState};
use lib_feed::configs::CacheSettings;
use lib_feed::connections::MemoryCacheStore;
use lib_feed::engine::{ReaderService, SummaryRequest};
use lib_feed::queue::{JobQueue, SavedThreadJob, SignalQueue, SignalTopic, SummaryJob};
use lib_feed::retrieve::{FetchError, ItemSource, SourceItem};
use lib_feed::store::{ContentBackend, MemoryContentStore, TargetKind};
use lib_feed::worker::{Worker, WorkerDeps};
use lib_feed::FeedSettings;
use chrono::Utc;
use project_tests::fakes::{comment, hit, story, ScriptedSearch, ScriptedSource};
use project_tests::test_settings;
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

struct Harness {
    backend: Arc<dyn ContentBackend>,
    cache: SharedCache,
    source: Arc<ScriptedSource>,
    search: Arc<ScriptedSearch>,
    settings: FeedSettings,
}

impl Harness {
    fn new() -> Self {
        let source = ScriptedSource::new();
        source.put(story(1, "First", 120, 1_700_000_000, &[10]));
        source.put(story(2, "Second", 30, 1_700_000_100, &[]));
        source.put(comment(10, 1, &[11]));
        source.put(comment(11, 10, &[]));
        source.set_top(vec![1, 2, 3, 2]);

        let search = ScriptedSearch::new(vec![
            hit(500, "Async in practice", 10, 1_700_000_100),
            hit(501, "Borrow checker tales", 20, 1_700_000_200),
        ]);

        let mut settings = test_settings();
        settings.summary.enabled = true;

        Self {
            backend: Arc::new(MemoryContentStore::new()),
            cache: SharedCache::new(Arc::new(MemoryCacheStore::new()), &CacheSettings::default()),
            source: Arc::new(source),
            search: Arc::new(search),
            settings,
        }
    }

    fn worker(&self) -> Worker {
        self.worker_with(self.source.clone())
    }

    fn worker_with(&self, source: Arc<dyn ItemSource>) -> Worker {
        self.worker_using(source, Arc::new(MockSummarizer::default()))
    }

    fn worker_using(&self, source: Arc<dyn ItemSource>, summarizer: Arc<dyn Summarizer>) -> Worker {
        Worker::new(
            WorkerDeps {
                backend: Arc::clone(&self.backend),
                cache: self.cache.clone(),
                source,
                search: self.search.clone(),
                summarizer,
            },
            self.settings.clone(),
        )
    }

    fn reader(&self) -> ReaderService {
        ReaderService::new(
            Arc::clone(&self.backend),
            self.cache.clone(),
            self.search.clone(),
            self.settings.clone(),
        )
    }

    fn summary_jobs(&self) -> JobQueue<SummaryJob> {
        JobQueue::new(self.cache.clone())
    }
}

/// Item source whose top list endpoint is down.
struct BrokenTopList;

#[async_trait]
impl ItemSource for BrokenTopList {
    async fn fetch_top_ids(&self) -> Result<Vec<i64>, FetchError> {
        Err(FetchError::Status {
            status: 503,
            url: "stub".to_string(),
        })
    }

    async fn fetch_item(&self, _id: i64) -> Result<Option<SourceItem>, FetchError> {
        Ok(None)
    }
}

/// Summarizer whose provider is down.
struct DownSummarizer;

#[async_trait]
impl Summarizer for DownSummarizer {
    fn model_version(&self) -> &str {
        "mock-v1"
    }

    async fn summarize(&self, _payload: &Value) -> Result<SummaryData, SummarizeError> {
        Err(SummarizeError::Provider("unreachable".to_string()))
    }
}

#[tokio::test]
async fn test_top_refresh_stores_primes_and_queues_summaries() {
    let h = Harness::new();
    let worker = h.worker();

    let report = worker.refresh_top_items().await.expect("Top refresh failed");
    assert_eq!(report.fetched, 2);
    assert_eq!(report.created, 2);
    assert_eq!(report.failed, 1);

    let top: Vec<i64> = h
        .reader()
        .top_stories(None)
        .await
        .expect("Top stories failed")
        .iter()
        .map(|s| s.hn_id)
        .collect();
    assert_eq!(top, vec![1, 2]);
    assert_eq!(h.summary_jobs().len().await.expect("Length failed"), 2);

    assert_eq!(worker.process_summary_jobs(10).await.expect("Jobs failed"), 2);
    let stored = h
        .backend
        .get_summary(TargetKind::Story, 1, "mock-v1")
        .await
        .expect("Read failed")
        .expect("Summary missing");
    assert_eq!(stored.data.tldr, "TL;DR: First");

    // Unchanged content queues nothing; a changed score queues one job.
    worker.refresh_top_items().await.expect("Top refresh failed");
    assert_eq!(h.summary_jobs().len().await.expect("Length failed"), 0);

    h.source.put(story(2, "Second", 31, 1_700_000_100, &[]));
    let report = worker.refresh_top_items().await.expect("Top refresh failed");
    assert_eq!(report.updated, 1);
    assert_eq!(h.summary_jobs().len().await.expect("Length failed"), 1);
}

#[tokio::test]
async fn test_interest_refresh_then_refill_uses_watermark() {
    let h = Harness::new();
    let worker = h.worker();

    let refreshed = worker.refresh_all_interests().await.expect("Interest refresh failed");
    assert_eq!(refreshed, 25);
    assert!(h.search.calls().iter().all(|(_, since)| since.is_none()));

    let interest = h
        .backend
        .list_interests()
        .await
        .expect("List failed")
        .into_iter()
        .next()
        .expect("Catalog is empty");
    let shelf = h.backend.list_shelf(interest.id).await.expect("Shelf failed");
    assert_eq!(shelf.len(), 2);

    let fetched = worker.refill_interest(interest.id).await.expect("Refill failed");
    assert_eq!(fetched, 0);
    let (_, since) = h.search.calls().last().cloned().expect("No search made");
    assert_eq!(since, Some(1_700_000_200));

    h.search.set_hits(vec![hit(502, "Pinning explained", 99, 1_700_000_300)]);
    assert_eq!(worker.refill_interest(interest.id).await.expect("Refill failed"), 1);
    assert_eq!(h.backend.list_shelf(interest.id).await.expect("Shelf failed").len(), 3);
}

#[tokio::test]
async fn test_saved_thread_job_collects_story_and_comments() {
    let h = Harness::new();
    let worker = h.worker();
    let jobs: JobQueue<SavedThreadJob> = JobQueue::new(h.cache.clone());
    jobs.push(&SavedThreadJob {
        user_id: "u1".to_string(),
        story_hn_id: 1,
        comment_hn_ids: vec![10, 11, 999],
        requested_at: Utc::now(),
    })
    .await
    .expect("Push failed");

    assert_eq!(worker.process_saved_thread_jobs(10).await.expect("Jobs failed"), 1);

    let entries = h.reader().thread_entries(1).await.expect("Entries failed");
    let shape: Vec<(i32, TargetKind, i64)> = entries
        .iter()
        .map(|e| (e.position, e.target_kind, e.hn_id))
        .collect();
    assert_eq!(
        shape,
        vec![
            (0, TargetKind::Story, 1),
            (1, TargetKind::Comment, 10),
            (2, TargetKind::Comment, 11),
        ]
    );
    let nested = h.backend.get_item(11).await.expect("Read failed").expect("Comment missing");
    assert_eq!(nested.story_id, Some(1));

    let threads = h.reader().saved_threads("u1").await.expect("Threads failed");
    assert_eq!(threads.len(), 1);
    assert_eq!(threads[0].story_hn_id, 1);
    assert!(h.reader().saved_threads("u2").await.expect("Threads failed").is_empty());
}

#[tokio::test]
async fn test_unsummarizable_story_leaves_no_thread() {
    let h = Harness::new();
    let worker = h.worker_using(h.source.clone(), Arc::new(DownSummarizer));
    let jobs: JobQueue<SavedThreadJob> = JobQueue::new(h.cache.clone());
    jobs.push(&SavedThreadJob {
        user_id: "u1".to_string(),
        story_hn_id: 1,
        comment_hn_ids: vec![10],
        requested_at: Utc::now(),
    })
    .await
    .expect("Push failed");

    assert_eq!(worker.process_saved_thread_jobs(10).await.expect("Jobs failed"), 0);
    assert!(h.reader().saved_threads("u1").await.expect("Threads failed").is_empty());
    assert!(h.reader().thread_entries(1).await.expect("Entries failed").is_empty());
}

#[tokio::test]
async fn test_comment_summary_is_requested_then_served() {
    let h = Harness::new();
    let reader = h.reader();
    let worker = h.worker();

    assert_eq!(reader.comment_summary(10).await.expect("Lookup failed"), SummaryState::Absent);
    assert_eq!(
        reader.request_comment_summary("u1", 10).await.expect("Request failed"),
        SummaryRequest::Queued
    );
    let queued = h.summary_jobs().pop().await.expect("Pop failed").expect("Job missing");
    assert_eq!(queued.kind, TargetKind::Comment);
    h.summary_jobs().push(&queued).await.expect("Push failed");

    assert_eq!(worker.process_summary_jobs(10).await.expect("Jobs failed"), 1);

    let stored = h.backend.get_item(10).await.expect("Read failed").expect("Comment missing");
    assert_eq!(stored.story_id, Some(1));
    match reader.comment_summary(10).await.expect("Lookup failed") {
        SummaryState::Ready { summary } => assert_eq!(summary.tldr, "TL;DR: comment 10"),
        other => panic!("Expected a ready summary, got {other:?}"),
    }
    assert!(matches!(
        reader.request_comment_summary("u1", 10).await.expect("Request failed"),
        SummaryRequest::Ready { .. }
    ));
}

#[tokio::test]
async fn test_tick_serves_signals_and_isolates_failures() {
    let h = Harness::new();
    let signals = SignalQueue::new(h.cache.clone());
    let cancel = CancellationToken::new();

    let mut healthy = h.worker();
    let interest_id = 1;
    signals.signal(SignalTopic::InterestRefill, interest_id).await;
    assert!(healthy.tick(&cancel).await);
    assert_eq!(signals.queued(SignalTopic::InterestRefill).await, 0);
    // Summary jobs queued by the top refresh were drained in the same tick.
    assert_eq!(h.summary_jobs().len().await.expect("Length failed"), 0);

    let fresh = Harness::new();
    let mut failing = fresh.worker_with(Arc::new(BrokenTopList));
    assert!(!failing.tick(&cancel).await);
    // The interest step still ran after the top list step failed.
    assert!(!fresh.backend.list_shelf(interest_id).await.expect("Shelf failed").is_empty());
}
