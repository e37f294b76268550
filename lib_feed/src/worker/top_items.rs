//! Global top list refresh: fetch, upsert, replace the ranked list, re-prime.

use super::{Worker, WorkerError};
use crate::queue::SummaryJob;
use crate::store::TargetKind;
use chrono::Utc;
use futures_util::future::join_all;
use std::collections::HashSet;
use tracing::{debug, warn};

/// User id recorded on jobs the worker enqueues for itself.
pub const SYSTEM_USER: &str = "system";

#[derive(Debug, Default, Clone, PartialEq)]
pub struct TopRefresh {
    pub fetched: usize,
    pub created: usize,
    pub updated: usize,
    pub failed: usize,
}

impl Worker {
    pub async fn refresh_top_items(&self) -> Result<TopRefresh, WorkerError> {
        let limit = self.settings.top.limit;
        let mut seen = HashSet::new();
        let ids: Vec<i64> = self
            .source
            .fetch_top_ids()
            .await?
            .into_iter()
            .filter(|id| seen.insert(*id))
            .take(limit)
            .collect();
        let mut report = TopRefresh::default();
        if ids.is_empty() {
            debug!("Source returned no top ids");
            return Ok(report);
        }

        let fetched = join_all(ids.iter().map(|id| self.source.fetch_item(*id))).await;
        for (hn_id, result) in ids.iter().zip(fetched) {
            let item = match result {
                Ok(Some(item)) => item,
                Ok(None) => {
                    warn!(hn_id, "Top item missing at source");
                    report.failed += 1;
                    continue;
                }
                Err(e) => {
                    warn!(hn_id, error = %e, "Top item fetch failed");
                    report.failed += 1;
                    continue;
                }
            };
            report.fetched += 1;
            let upserted = match self.items.upsert(&item, None).await {
                Ok(upserted) => upserted,
                Err(e) => {
                    warn!(hn_id, error = %e, "Top item upsert failed");
                    report.failed += 1;
                    continue;
                }
            };
            if upserted.created {
                report.created += 1;
            }
            if upserted.updated {
                report.updated += 1;
            }
            if (upserted.created || upserted.updated) && self.settings.summary.enabled {
                self.enqueue_summary(*hn_id).await;
            }
        }

        self.backend.replace_top_items(&ids).await?;
        self.top_feed.refresh_feed().await?;
        Ok(report)
    }

    async fn enqueue_summary(&self, hn_id: i64) {
        let job = SummaryJob {
            hn_id,
            kind: TargetKind::Story,
            user_id: SYSTEM_USER.to_string(),
            requested_at: Utc::now(),
        };
        if let Err(e) = self.summary_jobs.push(&job).await {
            warn!(hn_id, error = %e, "Failed to queue summary");
        }
    }
}
