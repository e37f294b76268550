//! # Reader Service
//!
//! Everything request-time code may do. Reads go through the caches; the only
//! writes are idempotent per-user state updates. Refreshes, summaries and the
//! persistence of live search results are requested from the worker through
//! signals and job queues, never run inline.

use super::feed::{FeedAssembler, FeedEntry, FeedError};
use super::search::{SearchError, SearchService};
use super::shelf::ShelfManager;
use crate::ai::SummaryData;
use crate::cache::{FeedCache, SharedCache, StoreTopFeed, SummaryCache, SummaryState, TopStory};
use crate::configs::FeedSettings;
use crate::queue::{JobError, JobQueue, SavedThreadJob, SignalQueue, SignalTopic, SummaryJob};
use crate::retrieve::SearchSource;
use crate::store::{
    ContentBackend, Interest, Item, SavedThread, StoreError, TargetKind, ThreadEntry, UserItemState,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

pub const MIN_SELECTION: usize = 5;
pub const MAX_SELECTION: usize = 10;

const SUMMARY_RATE_WINDOW: Duration = Duration::from_secs(3600);

#[derive(Debug, Error)]
pub enum ReaderError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Feed(#[from] FeedError),
    #[error(transparent)]
    Search(#[from] SearchError),
    #[error(transparent)]
    Queue(#[from] JobError),
    #[error("Select between {min} and {max} interests, got {got}")]
    Selection { min: usize, max: usize, got: usize },
}

/// A story with its comment preview and summary status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryDetail {
    pub item: Item,
    pub comments: Vec<Item>,
    pub summary: SummaryState,
}

/// Answer to a summary request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SummaryRequest {
    Ready { summary: SummaryData },
    Queued,
    RateLimited { limit: i64 },
    /// No job queue is configured.
    Unavailable,
}

/// Effect of one read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadReceipt {
    pub state: UserItemState,
    pub shelf_rows: u64,
    pub interests: u64,
}

pub struct ReaderService {
    backend: Arc<dyn ContentBackend>,
    shelves: Arc<ShelfManager>,
    assembler: FeedAssembler,
    top_feed: FeedCache,
    summaries: SummaryCache,
    signals: SignalQueue,
    summary_jobs: JobQueue<SummaryJob>,
    thread_jobs: JobQueue<SavedThreadJob>,
    search: SearchService,
    cache: SharedCache,
    settings: FeedSettings,
}

impl ReaderService {
    pub fn new(
        backend: Arc<dyn ContentBackend>,
        cache: SharedCache,
        search_source: Arc<dyn SearchSource>,
        settings: FeedSettings,
    ) -> Self {
        let shelves = Arc::new(ShelfManager::new(Arc::clone(&backend), cache.clone()));
        let signals = SignalQueue::new(cache.clone());
        Self {
            assembler: FeedAssembler::new(
                Arc::clone(&backend),
                Arc::clone(&shelves),
                signals.clone(),
                cache.clone(),
                &settings.feed,
                &settings.interest,
            ),
            top_feed: FeedCache::new(
                cache.clone(),
                Arc::new(StoreTopFeed::new(Arc::clone(&backend))),
                Duration::from_secs(settings.cache.feed_ttl_secs),
                settings.top.limit,
            ),
            summaries: SummaryCache::new(
                cache.clone(),
                Arc::clone(&backend),
                settings.summary.model_version.clone(),
                Duration::from_secs(settings.summary.ttl_secs),
            ),
            summary_jobs: JobQueue::new(cache.clone()),
            thread_jobs: JobQueue::new(cache.clone()),
            search: SearchService::new(
                Arc::clone(&backend),
                search_source,
                cache.clone(),
                settings.search.clone(),
            ),
            backend,
            shelves,
            signals,
            cache,
            settings,
        }
    }

    /// The global top list, from cache or the store.
    pub async fn top_stories(&self, limit: Option<usize>) -> Result<Vec<TopStory>, ReaderError> {
        let max = self.settings.top.limit;
        let limit = limit.map_or(max, |l| l.min(max));
        let mut stories = self.top_feed.read_feed().await;
        if stories.is_empty() {
            stories = self.top_feed.read_or_fallback().await?;
        }
        stories.truncate(limit);
        Ok(stories)
    }

    pub async fn feed(&self, user_id: &str, limit: Option<usize>) -> Result<Vec<FeedEntry>, ReaderError> {
        Ok(self.assembler.assemble(user_id, limit).await?)
    }

    pub async fn list_interests(&self) -> Result<Vec<Interest>, ReaderError> {
        Ok(self.backend.list_interests().await?)
    }

    /// Replaces the user's selection; unknown ids are ignored.
    pub async fn select_interests(&self, user_id: &str, interest_ids: &[i64]) -> Result<usize, ReaderError> {
        let got = interest_ids.len();
        if !(MIN_SELECTION..=MAX_SELECTION).contains(&got) {
            return Err(ReaderError::Selection {
                min: MIN_SELECTION,
                max: MAX_SELECTION,
                got,
            });
        }
        self.backend.set_user_interests(user_id, interest_ids).await?;
        info!(user_id, count = got, "Interest selection saved");
        Ok(got)
    }

    pub async fn my_interests(&self, user_id: &str) -> Result<Vec<Interest>, ReaderError> {
        Ok(self.backend.get_user_interests(user_id).await?)
    }

    pub async fn mark_seen(&self, user_id: &str, ids: &[i64]) -> Result<usize, ReaderError> {
        let now = Utc::now();
        for hn_id in ids {
            self.backend.mark_seen(user_id, *hn_id, now).await?;
        }
        Ok(ids.len())
    }

    pub async fn mark_dismissed(&self, user_id: &str, ids: &[i64]) -> Result<usize, ReaderError> {
        let now = Utc::now();
        for hn_id in ids {
            self.backend.mark_dismissed(user_id, *hn_id, now).await?;
        }
        Ok(ids.len())
    }

    /// Records a read for the user and in the shelf and interest statistics.
    pub async fn mark_read(&self, user_id: &str, hn_id: i64) -> Result<ReadReceipt, ReaderError> {
        let (shelf_rows, interests) = self.shelves.record_read(hn_id).await?;
        let state = self.backend.mark_read(user_id, hn_id, Utc::now()).await?;
        Ok(ReadReceipt {
            state,
            shelf_rows,
            interests,
        })
    }

    /// `None` when the story is not stored.
    pub async fn story_detail(&self, user_id: Option<&str>, hn_id: i64) -> Result<Option<StoryDetail>, ReaderError> {
        let Some(item) = self.backend.get_item(hn_id).await? else {
            return Ok(None);
        };
        if !item.kids.is_empty() {
            let stored = self.backend.count_comments(hn_id).await?;
            if stored < self.settings.comments.fetch_limit as i64 {
                self.signals.signal(SignalTopic::CommentFetch, hn_id).await;
            }
        }
        let comments = self
            .backend
            .list_comments(hn_id, self.settings.comments.preview_limit)
            .await?;
        let summary = self.summaries.lookup(TargetKind::Story, hn_id).await?;
        if let Some(user_id) = user_id {
            self.backend.mark_seen(user_id, hn_id, Utc::now()).await?;
        }
        Ok(Some(StoryDetail {
            item,
            comments,
            summary,
        }))
    }

    /// Stored comments of a story; asks for a crawl when fewer than `limit` are stored.
    pub async fn story_comments(&self, hn_id: i64, limit: Option<usize>) -> Result<Vec<Item>, ReaderError> {
        let max = self.settings.comments.fetch_limit;
        let limit = limit.map_or(max, |l| l.min(max));
        let comments = self.backend.list_comments(hn_id, limit).await?;
        if comments.len() < limit {
            self.signals.signal(SignalTopic::CommentFetch, hn_id).await;
        }
        Ok(comments)
    }

    pub async fn summary(&self, hn_id: i64) -> Result<SummaryState, ReaderError> {
        Ok(self.summaries.lookup(TargetKind::Story, hn_id).await?)
    }

    pub async fn comment_summary(&self, hn_id: i64) -> Result<SummaryState, ReaderError> {
        Ok(self.summaries.lookup(TargetKind::Comment, hn_id).await?)
    }

    pub async fn request_summary(&self, user_id: &str, hn_id: i64) -> Result<SummaryRequest, ReaderError> {
        self.request_summary_of(user_id, TargetKind::Story, hn_id).await
    }

    pub async fn request_comment_summary(&self, user_id: &str, hn_id: i64) -> Result<SummaryRequest, ReaderError> {
        self.request_summary_of(user_id, TargetKind::Comment, hn_id).await
    }

    /// Returns a ready summary or queues one for the worker, subject to a
    /// per-user hourly budget shared by stories and comments.
    async fn request_summary_of(
        &self,
        user_id: &str,
        kind: TargetKind,
        hn_id: i64,
    ) -> Result<SummaryRequest, ReaderError> {
        if let Some(summary) = self.summaries.get(kind, hn_id).await? {
            return Ok(SummaryRequest::Ready { summary });
        }

        let hour = Utc::now().format("%Y%m%d%H");
        let rate_key = format!("rate:summary:{user_id}:{hour}");
        let limit = self.settings.summary.rate_per_hour;
        if let Some(count) = self.cache.incr(&rate_key, SUMMARY_RATE_WINDOW).await {
            if count > limit {
                debug!(user_id, count, "Summary rate limit hit");
                return Ok(SummaryRequest::RateLimited { limit });
            }
        }

        let job = SummaryJob {
            hn_id,
            kind,
            user_id: user_id.to_string(),
            requested_at: Utc::now(),
        };
        match self.summary_jobs.push(&job).await {
            Ok(()) => Ok(SummaryRequest::Queued),
            Err(JobError::Disabled) => Ok(SummaryRequest::Unavailable),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn request_saved_thread(
        &self,
        user_id: &str,
        story_hn_id: i64,
        comment_hn_ids: Vec<i64>,
    ) -> Result<(), ReaderError> {
        let job = SavedThreadJob {
            user_id: user_id.to_string(),
            story_hn_id,
            comment_hn_ids,
            requested_at: Utc::now(),
        };
        self.thread_jobs.push(&job).await?;
        info!(user_id, story_hn_id, "Saved thread requested");
        Ok(())
    }

    pub async fn saved_threads(&self, user_id: &str) -> Result<Vec<SavedThread>, ReaderError> {
        Ok(self.backend.list_saved_threads(user_id).await?)
    }

    pub async fn thread_entries(&self, thread_id: i64) -> Result<Vec<ThreadEntry>, ReaderError> {
        Ok(self.backend.list_thread_entries(thread_id).await?)
    }

    pub async fn search(&self, query: &str, limit: Option<usize>) -> Result<Vec<TopStory>, ReaderError> {
        Ok(self.search.search(query, limit).await?)
    }
}
