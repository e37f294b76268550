//! Breadth-first reply-tree crawl with a flat per-crawl ceiling.

use super::{Worker, WorkerError};
use futures_util::future::join_all;
use std::collections::{HashSet, VecDeque};
use tracing::{debug, warn};

#[derive(Debug, Default, Clone, PartialEq)]
pub struct CrawlReport {
    pub stored: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl Worker {
    /// Stores live comments of `story_id` level by level, fetching a batch at a
    /// time, until the tree is exhausted or the ceiling is reached.
    pub async fn crawl_comments(&self, story_id: i64) -> Result<CrawlReport, WorkerError> {
        let mut report = CrawlReport::default();
        let Some(story) = self.backend.get_item(story_id).await? else {
            debug!(story_id, "Comment signal for unknown story");
            return Ok(report);
        };
        if story.kids.is_empty() {
            return Ok(report);
        }

        let ceiling = self.settings.comments.crawl_ceiling();
        let batch_size = self.settings.comments.batch_size.max(1);
        let mut queue: VecDeque<i64> = story.kids.iter().copied().collect();
        let mut seen: HashSet<i64> = queue.iter().copied().collect();

        'crawl: while !queue.is_empty() && report.stored < ceiling {
            let take = batch_size.min(queue.len());
            let batch: Vec<i64> = queue.drain(..take).collect();
            let results = join_all(batch.iter().map(|id| self.source.fetch_item(*id))).await;
            for (hn_id, result) in batch.iter().zip(results) {
                let comment = match result {
                    Ok(Some(item)) if item.is_live_comment() => item,
                    Ok(_) => {
                        report.skipped += 1;
                        continue;
                    }
                    Err(e) => {
                        warn!(story_id, hn_id, error = %e, "Comment fetch failed");
                        report.failed += 1;
                        continue;
                    }
                };
                if let Err(e) = self.items.upsert(&comment, Some(story_id)).await {
                    warn!(story_id, hn_id, error = %e, "Comment upsert failed");
                    report.failed += 1;
                    continue;
                }
                report.stored += 1;
                for kid in &comment.kids {
                    if seen.insert(*kid) {
                        queue.push_back(*kid);
                    }
                }
                if report.stored >= ceiling {
                    break 'crawl;
                }
            }
        }
        Ok(report)
    }
}
