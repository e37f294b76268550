//! Interest shelf ingestion: the periodic full refresh and the reactive,
//! watermark-bounded refill.

use super::{Worker, WorkerError};
use crate::engine::{keyword_query, seed_catalog};
use crate::retrieve::SearchHit;
use crate::store::Interest;
use tracing::{debug, info, warn};

impl Worker {
    /// Searches every interest's keywords without a watermark and caps each
    /// shelf to its newest entries. Returns how many interests were refreshed.
    pub async fn refresh_all_interests(&self) -> Result<usize, WorkerError> {
        let interests = seed_catalog(self.backend.as_ref()).await?;
        let mut refreshed = 0;
        for interest in &interests {
            let Some(query) = keyword_query(interest, self.settings.search.max_keywords) else {
                continue;
            };
            let hits = match self
                .search
                .search(&query, self.settings.interest.backlog_limit, None)
                .await
            {
                Ok(hits) => hits,
                Err(e) => {
                    warn!(interest = %interest.name, error = %e, "Interest search failed");
                    continue;
                }
            };
            let newest = self.ingest_hits(interest, &hits).await?;
            self.shelves
                .rotate_by_recency(interest.id, self.settings.interest.shelf_max)
                .await?;
            if let Some(newest) = newest {
                self.shelves.advance_watermark(interest.id, newest).await?;
            }
            refreshed += 1;
        }
        Ok(refreshed)
    }

    /// Fetches only content newer than the interest's watermark, then keeps
    /// the best-ranked entries.
    pub async fn refill_interest(&self, interest_id: i64) -> Result<usize, WorkerError> {
        let Some(interest) = self.backend.get_interest(interest_id).await? else {
            warn!(interest_id, "Refill signal for unknown interest");
            return Ok(0);
        };
        let Some(query) = keyword_query(&interest, self.settings.search.max_keywords) else {
            return Ok(0);
        };
        let watermark = self.shelves.watermark(interest_id).await?;
        let hits = self
            .search
            .search(&query, self.settings.interest.backlog_limit, watermark)
            .await?;
        let newest = self.ingest_hits(&interest, &hits).await?;
        let evicted = self
            .shelves
            .evict_below_top_n(interest_id, self.settings.interest.shelf_max)
            .await?;
        if let Some(newest) = newest {
            self.shelves.advance_watermark(interest_id, newest).await?;
        }
        info!(
            interest = %interest.name,
            hits = hits.len(),
            evicted,
            ?watermark,
            "Interest refilled"
        );
        Ok(hits.len())
    }

    /// Stores each hit as a minimal story and places it on the shelf. Returns
    /// the newest creation time seen.
    async fn ingest_hits(&self, interest: &Interest, hits: &[SearchHit]) -> Result<Option<i64>, WorkerError> {
        let mut newest: Option<i64> = None;
        for hit in hits {
            let Some(source) = hit.to_source_item() else {
                debug!(object_id = %hit.object_id, "Skipping hit without numeric id");
                continue;
            };
            if let Err(e) = self.items.upsert(&source, None).await {
                warn!(hn_id = source.id, error = %e, "Failed to store interest hit");
                continue;
            }
            self.shelves
                .upsert_shelf_entry(interest.id, source.id, hit.points, hit.created_at_i)
                .await?;
            if let Some(created) = hit.created_at_i {
                newest = Some(newest.map_or(created, |n| n.max(created)));
            }
        }
        Ok(newest)
    }
}
