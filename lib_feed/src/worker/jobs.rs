//! Background job consumers: summary generation, saved-thread assembly and
//! persistence of live search results. A failing job is logged and dropped;
//! the rest of the batch still runs.

use super::{Worker, WorkerError};
use crate::ai::SummaryData;
use crate::engine::resolve_story_id;
use crate::queue::{SavedThreadJob, SearchPersistJob, SummaryJob};
use crate::store::{Item, SearchRecord, StoredSummary, TargetKind, ThreadEntry};
use chrono::Utc;
use tracing::{debug, info, warn};

impl Worker {
    /// Runs up to `max` queued summary jobs. Returns how many succeeded.
    pub async fn process_summary_jobs(&self, max: usize) -> Result<usize, WorkerError> {
        let jobs = self.summary_jobs.drain(max).await?;
        let mut done = 0;
        for job in &jobs {
            match self.run_summary_job(job).await {
                Ok(()) => done += 1,
                Err(e) => warn!(hn_id = job.hn_id, error = %e, "Summary job failed"),
            }
        }
        if !jobs.is_empty() {
            info!(taken = jobs.len(), done, "Summary jobs processed");
        }
        Ok(done)
    }

    async fn run_summary_job(&self, job: &SummaryJob) -> Result<(), WorkerError> {
        let item = match job.kind {
            TargetKind::Story => self.ensure_story(job.hn_id).await?,
            TargetKind::Comment => self
                .ensure_comment(job.hn_id)
                .await?
                .ok_or(WorkerError::MissingItem(job.hn_id))?,
        };
        self.summarize_item(&item, job.kind).await?;
        Ok(())
    }

    /// Runs up to `max` queued saved-thread jobs. Returns how many succeeded.
    pub async fn process_saved_thread_jobs(&self, max: usize) -> Result<usize, WorkerError> {
        let jobs = self.thread_jobs.drain(max).await?;
        let mut done = 0;
        for job in &jobs {
            match self.run_saved_thread_job(job).await {
                Ok(thread_id) => {
                    debug!(thread_id, user_id = %job.user_id, "Saved thread assembled");
                    done += 1;
                }
                Err(e) => warn!(story_hn_id = job.story_hn_id, error = %e, "Saved thread job failed"),
            }
        }
        if !jobs.is_empty() {
            info!(taken = jobs.len(), done, "Saved thread jobs processed");
        }
        Ok(done)
    }

    /// The thread row is only created once the story summary exists, so a
    /// failing story leaves nothing behind.
    async fn run_saved_thread_job(&self, job: &SavedThreadJob) -> Result<i64, WorkerError> {
        let story = self.ensure_story(job.story_hn_id).await?;
        let data = self.summarize_item(&story, TargetKind::Story).await?;
        let thread = self
            .backend
            .create_saved_thread(&job.user_id, story.hn_id)
            .await?;
        self.backend
            .add_thread_entry(&ThreadEntry {
                thread_id: thread.id,
                position: 0,
                target_kind: TargetKind::Story,
                hn_id: story.hn_id,
                data,
            })
            .await?;

        let mut position = 1;
        for comment_id in &job.comment_hn_ids {
            let comment = match self.ensure_comment(*comment_id).await {
                Ok(Some(comment)) => comment,
                Ok(None) => {
                    debug!(comment_id, "Skipping unavailable comment");
                    continue;
                }
                Err(e) => {
                    warn!(comment_id, error = %e, "Failed to load thread comment");
                    continue;
                }
            };
            let data = match self.summarize_item(&comment, TargetKind::Comment).await {
                Ok(data) => data,
                Err(e) => {
                    warn!(comment_id, error = %e, "Failed to summarize thread comment");
                    continue;
                }
            };
            self.backend
                .add_thread_entry(&ThreadEntry {
                    thread_id: thread.id,
                    position,
                    target_kind: TargetKind::Comment,
                    hn_id: comment.hn_id,
                    data,
                })
                .await?;
            position += 1;
        }
        Ok(thread.id)
    }

    /// Stores the hits of up to `max` live searches and their result rows.
    pub async fn process_search_jobs(&self, max: usize) -> Result<usize, WorkerError> {
        let jobs = self.search_jobs.drain(max).await?;
        let mut done = 0;
        for job in &jobs {
            match self.run_search_job(job).await {
                Ok(()) => done += 1,
                Err(e) => warn!(query = %job.query, error = %e, "Search persistence failed"),
            }
        }
        if !jobs.is_empty() {
            debug!(taken = jobs.len(), done, "Search results persisted");
        }
        Ok(done)
    }

    async fn run_search_job(&self, job: &SearchPersistJob) -> Result<(), WorkerError> {
        let mut result_ids = Vec::with_capacity(job.hits.len());
        for source in job.hits.iter().filter_map(|hit| hit.to_source_item()) {
            if let Err(e) = self.items.upsert(&source, None).await {
                warn!(hn_id = source.id, error = %e, "Failed to store search hit");
            }
            result_ids.push(source.id);
        }
        self.backend
            .put_search(&SearchRecord {
                query: job.query.clone(),
                result_ids,
                fetched_at: job.fetched_at,
            })
            .await?;
        Ok(())
    }

    /// The stored item, fetching and storing it first when absent.
    async fn ensure_story(&self, hn_id: i64) -> Result<Item, WorkerError> {
        if let Some(item) = self.items.get(hn_id).await? {
            return Ok(item);
        }
        let source = self
            .source
            .fetch_item(hn_id)
            .await?
            .ok_or(WorkerError::MissingItem(hn_id))?;
        Ok(self.items.upsert(&source, None).await?.item)
    }

    /// A stored comment, or a fetched live comment stored under its resolved story.
    async fn ensure_comment(&self, hn_id: i64) -> Result<Option<Item>, WorkerError> {
        if let Some(item) = self.items.get(hn_id).await? {
            return Ok(item.is_comment().then_some(item));
        }
        let Some(source) = self.source.fetch_item(hn_id).await? else {
            return Ok(None);
        };
        if !source.is_live_comment() {
            return Ok(None);
        }
        let story_id = resolve_story_id(
            self.source.as_ref(),
            self.backend.as_ref(),
            &source,
            self.settings.comments.max_ancestor_depth,
        )
        .await?;
        Ok(Some(self.items.upsert(&source, Some(story_id)).await?.item))
    }

    /// Reuses a stored summary computed from the same content, otherwise
    /// summarizes and persists.
    async fn summarize_item(&self, item: &Item, kind: TargetKind) -> Result<SummaryData, WorkerError> {
        let model_version = self.summarizer.model_version();
        if let Some(existing) = self
            .backend
            .get_summary(kind, item.hn_id, model_version)
            .await?
        {
            if existing.content_hash == item.content_hash {
                return Ok(existing.data);
            }
        }
        let data = self.summarizer.summarize(&item.raw).await?;
        self.summaries
            .put(&StoredSummary {
                target_kind: kind,
                hn_id: item.hn_id,
                model_version: model_version.to_string(),
                data: data.clone(),
                content_hash: item.content_hash.clone(),
                updated_at: Utc::now(),
            })
            .await?;
        Ok(data)
    }
}
