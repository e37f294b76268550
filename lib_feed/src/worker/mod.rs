//! # Worker Orchestration Loop
//!
//! A single async loop that keeps derived state fresh. Each tick:
//!
//! 1. refreshes the global top list when its interval has elapsed, and the
//!    full set of interest shelves when theirs has;
//! 2. waits briefly for an interest-refill signal and serves it;
//! 3. waits briefly for a comment-fetch signal and crawls that thread;
//! 4. drains bounded batches of the summary, saved-thread and search
//!    persistence job queues;
//! 5. runs retention cleanup when its interval has elapsed.
//!
//! ## Key Design Principles:
//! - **Failures are per step**: a failing step is logged, the remaining steps
//!   still run, and the loop backs off briefly before the next tick.
//! - **Bounded waits**: the signal waits are the only intentional blocking
//!   points and both time out, so periodic duties never starve.
//! - **Cooperative shutdown**: cancellation is observed between steps, so
//!   in-flight network calls finish or time out before the loop returns.

#![warn(rust_2018_idioms, unused_qualifications)]

pub mod cleanup;
pub mod comments;
pub mod interests;
pub mod jobs;
pub mod top_items;

use crate::ai::{SummarizeError, Summarizer};
use crate::cache::{FeedCache, PrimeError, SharedCache, StoreTopFeed, SummaryCache};
use crate::configs::FeedSettings;
use crate::engine::{AncestorError, ShelfManager};
use crate::queue::{
    JobError, JobQueue, SavedThreadJob, SearchPersistJob, SignalQueue, SignalTopic, SummaryJob,
};
use crate::retrieve::{FetchError, ItemSource, SearchSource};
use crate::store::{ContentBackend, ItemStore, StoreError};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Prime(#[from] PrimeError),
    #[error(transparent)]
    Queue(#[from] JobError),
    #[error(transparent)]
    Summarize(#[from] SummarizeError),
    #[error(transparent)]
    Ancestor(#[from] AncestorError),
    #[error("Item {0} is not available from the source")]
    MissingItem(i64),
}

/// External collaborators of the worker.
pub struct WorkerDeps {
    pub backend: Arc<dyn ContentBackend>,
    pub cache: SharedCache,
    pub source: Arc<dyn ItemSource>,
    pub search: Arc<dyn SearchSource>,
    pub summarizer: Arc<dyn Summarizer>,
}

/// When each periodic duty last completed.
struct Schedule {
    top: Option<Instant>,
    interests: Option<Instant>,
    cleanup: Option<Instant>,
}

fn due(last: Option<Instant>, every: Duration) -> bool {
    last.map_or(true, |at| at.elapsed() >= every)
}

pub struct Worker {
    backend: Arc<dyn ContentBackend>,
    items: ItemStore,
    source: Arc<dyn ItemSource>,
    search: Arc<dyn SearchSource>,
    summarizer: Arc<dyn Summarizer>,
    shelves: ShelfManager,
    top_feed: FeedCache,
    summaries: SummaryCache,
    signals: SignalQueue,
    summary_jobs: JobQueue<SummaryJob>,
    thread_jobs: JobQueue<SavedThreadJob>,
    search_jobs: JobQueue<SearchPersistJob>,
    settings: FeedSettings,
    schedule: Schedule,
}

impl Worker {
    pub fn new(deps: WorkerDeps, settings: FeedSettings) -> Self {
        let WorkerDeps {
            backend,
            cache,
            source,
            search,
            summarizer,
        } = deps;
        Self {
            items: ItemStore::new(Arc::clone(&backend)),
            shelves: ShelfManager::new(Arc::clone(&backend), cache.clone()),
            top_feed: FeedCache::new(
                cache.clone(),
                Arc::new(StoreTopFeed::new(Arc::clone(&backend))),
                Duration::from_secs(settings.cache.feed_ttl_secs),
                settings.top.limit,
            ),
            summaries: SummaryCache::new(
                cache.clone(),
                Arc::clone(&backend),
                summarizer.model_version().to_string(),
                Duration::from_secs(settings.summary.ttl_secs),
            ),
            signals: SignalQueue::new(cache.clone()),
            summary_jobs: JobQueue::new(cache.clone()),
            thread_jobs: JobQueue::new(cache.clone()),
            search_jobs: JobQueue::new(cache),
            backend,
            source,
            search,
            summarizer,
            schedule: Schedule {
                top: None,
                interests: None,
                cleanup: Some(Instant::now()),
            },
            settings,
        }
    }

    /// Runs ticks until `cancel` fires.
    pub async fn run(&mut self, cancel: CancellationToken) {
        info!("Worker loop started");
        while !cancel.is_cancelled() {
            if !self.tick(&cancel).await {
                tokio::select! {
                    _ = cancel.cancelled() => {}
                    _ = sleep(self.settings.worker.error_sleep()) => {}
                }
            }
        }
        info!("Worker loop stopped");
    }

    /// One pass over every duty. Returns `false` if any step failed.
    pub async fn tick(&mut self, cancel: &CancellationToken) -> bool {
        let mut healthy = true;

        if due(self.schedule.top, Duration::from_secs(self.settings.top.refresh_secs)) {
            match self.refresh_top_items().await {
                Ok(report) => {
                    info!(?report, "Top items refreshed");
                    self.schedule.top = Some(Instant::now());
                }
                Err(e) => healthy = step_failed("top_items", &e),
            }
        }

        if !cancel.is_cancelled()
            && due(
                self.schedule.interests,
                Duration::from_secs(self.settings.interest.refresh_secs),
            )
        {
            match self.refresh_all_interests().await {
                Ok(refreshed) => {
                    info!(refreshed, "Interest shelves refreshed");
                    self.schedule.interests = Some(Instant::now());
                }
                Err(e) => healthy = step_failed("interest_refresh", &e),
            }
        }

        let wait = self.settings.worker.signal_wait();
        if !cancel.is_cancelled() {
            if let Some(interest_id) = self.signals.await_signal(SignalTopic::InterestRefill, wait).await {
                if let Err(e) = self.refill_interest(interest_id).await {
                    healthy = step_failed("interest_refill", &e);
                }
            }
        }

        if !cancel.is_cancelled() {
            if let Some(story_id) = self.signals.await_signal(SignalTopic::CommentFetch, wait).await {
                match self.crawl_comments(story_id).await {
                    Ok(report) => info!(story_id, ?report, "Comment crawl finished"),
                    Err(e) => healthy = step_failed("comment_crawl", &e),
                }
            }
        }

        if !cancel.is_cancelled() {
            if let Err(e) = self
                .process_summary_jobs(self.settings.queue.summary_max_per_tick)
                .await
            {
                healthy = step_failed("summary_jobs", &e);
            }
            if let Err(e) = self
                .process_saved_thread_jobs(self.settings.queue.saved_thread_max_per_tick)
                .await
            {
                healthy = step_failed("saved_thread_jobs", &e);
            }
            if let Err(e) = self
                .process_search_jobs(self.settings.queue.search_max_per_tick)
                .await
            {
                healthy = step_failed("search_jobs", &e);
            }
        }

        if !cancel.is_cancelled()
            && due(
                self.schedule.cleanup,
                Duration::from_secs(self.settings.cleanup.interval_secs),
            )
        {
            match self.cleanup().await {
                Ok(report) => {
                    info!(?report, "Cleanup finished");
                    self.schedule.cleanup = Some(Instant::now());
                }
                Err(e) => healthy = step_failed("cleanup", &e),
            }
        }

        healthy
    }
}

fn step_failed(step: &str, e: &WorkerError) -> bool {
    error!(step, error = %e, "Worker step failed");
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_due_after_interval() {
        assert!(due(None, Duration::from_secs(10)));
        let last = Instant::now();
        assert!(!due(Some(last), Duration::from_secs(10)));
        tokio::time::advance(Duration::from_secs(11)).await;
        assert!(due(Some(last), Duration::from_secs(10)));
    }
}
