//! # PostgreSQL Content Backend
//!
//! `ContentBackend` over a `deadpool_postgres` pool. Every method checks out one
//! connection and runs a single statement (or one short transaction), so each
//! logical operation commits on its own.

use super::backend::{ContentBackend, StoreError};
use super::models::{
    Interest, Item, SavedThread, SearchRecord, ShelfEntry, StoredSummary, TargetKind, ThreadEntry,
    UserItemState,
};
use crate::ai::{Consensus, SummaryData};
use crate::retrieve::ItemKind;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use deadpool_postgres::Pool;
use serde_json::Value;
use std::collections::HashMap;
use tokio_postgres::Row;

const ITEM_COLUMNS: &str = "i.hn_id, i.kind, i.author, i.title, i.url, i.text, i.score, i.time, \
     i.parent_id, i.story_id, i.kids, i.descendants, i.dead, i.deleted, i.raw_payload, \
     i.content_hash, i.content_changed_at, i.last_fetched_at, i.created_at";

const INTEREST_COLUMNS: &str = "id, group_name, name, keywords, read_count, last_read_at";

const STATE_COLUMNS: &str = "user_id, hn_id, last_seen_at, last_read_at, read_count, dismissed_at";

fn item_from_row(row: &Row) -> Result<Item, StoreError> {
    let kind: String = row.get("kind");
    let kids: Value = row.get("kids");
    Ok(Item {
        hn_id: row.get("hn_id"),
        kind: ItemKind::parse(&kind),
        author: row.get("author"),
        title: row.get("title"),
        url: row.get("url"),
        text: row.get("text"),
        score: row.get("score"),
        time: row.get("time"),
        parent_id: row.get("parent_id"),
        story_id: row.get("story_id"),
        kids: serde_json::from_value(kids)?,
        descendants: row.get("descendants"),
        dead: row.get("dead"),
        deleted: row.get("deleted"),
        raw: row.get("raw_payload"),
        content_hash: row.get("content_hash"),
        content_changed_at: row.get("content_changed_at"),
        last_fetched_at: row.get("last_fetched_at"),
        created_at: row.get("created_at"),
    })
}

fn interest_from_row(row: &Row) -> Result<Interest, StoreError> {
    let keywords: Value = row.get("keywords");
    Ok(Interest {
        id: row.get("id"),
        group_name: row.get("group_name"),
        name: row.get("name"),
        keywords: serde_json::from_value(keywords)?,
        read_count: row.get("read_count"),
        last_read_at: row.get("last_read_at"),
    })
}

fn state_from_row(row: &Row) -> UserItemState {
    UserItemState {
        user_id: row.get("user_id"),
        hn_id: row.get("hn_id"),
        last_seen_at: row.get("last_seen_at"),
        last_read_at: row.get("last_read_at"),
        read_count: row.get("read_count"),
        dismissed_at: row.get("dismissed_at"),
    }
}

fn summary_data_from_row(row: &Row) -> Result<SummaryData, StoreError> {
    let key_points: Value = row.get("key_points");
    let consensus: String = row.get("consensus");
    Ok(SummaryData {
        tldr: row.get("tldr"),
        key_points: serde_json::from_value(key_points)?,
        consensus: Consensus::parse(&consensus),
    })
}

/// Postgres-backed content store.
#[derive(Clone)]
pub struct PgContentStore {
    pool: Pool,
}

impl PgContentStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ContentBackend for PgContentStore {
    async fn get_item(&self, hn_id: i64) -> Result<Option<Item>, StoreError> {
        let client = self.pool.get().await?;
        let sql = format!("SELECT {ITEM_COLUMNS} FROM items i WHERE i.hn_id = $1");
        let row = client.query_opt(&sql, &[&hn_id]).await?;
        row.as_ref().map(item_from_row).transpose()
    }

    async fn get_items(&self, ids: &[i64]) -> Result<Vec<Item>, StoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let client = self.pool.get().await?;
        let sql = format!("SELECT {ITEM_COLUMNS} FROM items i WHERE i.hn_id = ANY($1)");
        let rows = client.query(&sql, &[&ids]).await?;
        rows.iter().map(item_from_row).collect()
    }

    async fn insert_item(&self, item: &Item) -> Result<bool, StoreError> {
        let client = self.pool.get().await?;
        let kids = serde_json::to_value(&item.kids)?;
        let n = client
            .execute(
                "INSERT INTO items (hn_id, kind, author, title, url, text, score, time, parent_id, \
                 story_id, kids, descendants, dead, deleted, raw_payload, content_hash, \
                 content_changed_at, last_fetched_at, created_at) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19) \
                 ON CONFLICT (hn_id) DO NOTHING",
                &[
                    &item.hn_id,
                    &item.kind.as_str(),
                    &item.author,
                    &item.title,
                    &item.url,
                    &item.text,
                    &item.score,
                    &item.time,
                    &item.parent_id,
                    &item.story_id,
                    &kids,
                    &item.descendants,
                    &item.dead,
                    &item.deleted,
                    &item.raw,
                    &item.content_hash,
                    &item.content_changed_at,
                    &item.last_fetched_at,
                    &item.created_at,
                ],
            )
            .await?;
        Ok(n == 1)
    }

    async fn replace_item_content(&self, item: &Item) -> Result<(), StoreError> {
        let client = self.pool.get().await?;
        let kids = serde_json::to_value(&item.kids)?;
        let n = client
            .execute(
                "UPDATE items SET kind = $2, author = $3, title = $4, url = $5, text = $6, \
                 score = $7, time = $8, parent_id = $9, story_id = $10, kids = $11, \
                 descendants = $12, dead = $13, deleted = $14, raw_payload = $15, \
                 content_hash = $16, content_changed_at = $17, last_fetched_at = $18 \
                 WHERE hn_id = $1",
                &[
                    &item.hn_id,
                    &item.kind.as_str(),
                    &item.author,
                    &item.title,
                    &item.url,
                    &item.text,
                    &item.score,
                    &item.time,
                    &item.parent_id,
                    &item.story_id,
                    &kids,
                    &item.descendants,
                    &item.dead,
                    &item.deleted,
                    &item.raw,
                    &item.content_hash,
                    &item.content_changed_at,
                    &item.last_fetched_at,
                ],
            )
            .await?;
        if n == 0 {
            return Err(StoreError::NotFound {
                entity: "item",
                id: item.hn_id.to_string(),
            });
        }
        Ok(())
    }

    async fn touch_item(&self, hn_id: i64, fetched_at: DateTime<Utc>) -> Result<(), StoreError> {
        let client = self.pool.get().await?;
        client
            .execute(
                "UPDATE items SET last_fetched_at = GREATEST(last_fetched_at, $2) WHERE hn_id = $1",
                &[&hn_id, &fetched_at],
            )
            .await?;
        Ok(())
    }

    async fn list_comments(&self, story_id: i64, limit: usize) -> Result<Vec<Item>, StoreError> {
        let client = self.pool.get().await?;
        let sql = format!(
            "SELECT {ITEM_COLUMNS} FROM items i WHERE i.kind = 'comment' AND i.story_id = $1 \
             ORDER BY i.time NULLS FIRST, i.hn_id LIMIT $2"
        );
        let rows = client.query(&sql, &[&story_id, &(limit as i64)]).await?;
        rows.iter().map(item_from_row).collect()
    }

    async fn count_comments(&self, story_id: i64) -> Result<i64, StoreError> {
        let client = self.pool.get().await?;
        let row = client
            .query_one(
                "SELECT COUNT(*) FROM items WHERE kind = 'comment' AND story_id = $1",
                &[&story_id],
            )
            .await?;
        Ok(row.get(0))
    }

    async fn replace_top_items(&self, ids: &[i64]) -> Result<(), StoreError> {
        let mut client = self.pool.get().await?;
        let tx = client.transaction().await?;
        tx.execute("DELETE FROM top_items", &[]).await?;
        for (rank, hn_id) in ids.iter().enumerate() {
            tx.execute(
                "INSERT INTO top_items (rank, hn_id) VALUES ($1, $2)",
                &[&(rank as i32), hn_id],
            )
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn list_top_items(&self, limit: usize) -> Result<Vec<Item>, StoreError> {
        let client = self.pool.get().await?;
        let sql = format!(
            "SELECT {ITEM_COLUMNS} FROM top_items t JOIN items i ON i.hn_id = t.hn_id \
             ORDER BY t.rank LIMIT $1"
        );
        let rows = client.query(&sql, &[&(limit as i64)]).await?;
        rows.iter().map(item_from_row).collect()
    }

    async fn upsert_interest(
        &self,
        group_name: &str,
        name: &str,
        keywords: &[String],
    ) -> Result<Interest, StoreError> {
        let client = self.pool.get().await?;
        let keywords = serde_json::to_value(keywords)?;
        let sql = format!(
            "INSERT INTO interests (group_name, name, keywords) VALUES ($1, $2, $3) \
             ON CONFLICT (group_name, name) DO UPDATE SET keywords = EXCLUDED.keywords \
             RETURNING {INTEREST_COLUMNS}"
        );
        let row = client.query_one(&sql, &[&group_name, &name, &keywords]).await?;
        interest_from_row(&row)
    }

    async fn get_interest(&self, id: i64) -> Result<Option<Interest>, StoreError> {
        let client = self.pool.get().await?;
        let sql = format!("SELECT {INTEREST_COLUMNS} FROM interests WHERE id = $1");
        let row = client.query_opt(&sql, &[&id]).await?;
        row.as_ref().map(interest_from_row).transpose()
    }

    async fn list_interests(&self) -> Result<Vec<Interest>, StoreError> {
        let client = self.pool.get().await?;
        let sql = format!("SELECT {INTEREST_COLUMNS} FROM interests ORDER BY group_name, name");
        let rows = client.query(&sql, &[]).await?;
        rows.iter().map(interest_from_row).collect()
    }

    async fn set_user_interests(&self, user_id: &str, interest_ids: &[i64]) -> Result<(), StoreError> {
        let mut client = self.pool.get().await?;
        let tx = client.transaction().await?;
        tx.execute("DELETE FROM user_interests WHERE user_id = $1", &[&user_id])
            .await?;
        tx.execute(
            "INSERT INTO user_interests (user_id, interest_id) \
             SELECT $1, id FROM interests WHERE id = ANY($2)",
            &[&user_id, &interest_ids],
        )
        .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn get_user_interests(&self, user_id: &str) -> Result<Vec<Interest>, StoreError> {
        let client = self.pool.get().await?;
        let rows = client
            .query(
                "SELECT i.id, i.group_name, i.name, i.keywords, i.read_count, i.last_read_at \
                 FROM interests i JOIN user_interests u ON u.interest_id = i.id \
                 WHERE u.user_id = $1 ORDER BY i.id",
                &[&user_id],
            )
            .await?;
        rows.iter().map(interest_from_row).collect()
    }

    async fn increment_interest_reads(&self, hn_id: i64, at: DateTime<Utc>) -> Result<u64, StoreError> {
        let client = self.pool.get().await?;
        Ok(client
            .execute(
                "UPDATE interests SET read_count = read_count + 1, last_read_at = $2 \
                 WHERE id IN (SELECT interest_id FROM interest_items WHERE hn_id = $1)",
                &[&hn_id, &at],
            )
            .await?)
    }

    async fn upsert_shelf_entry(
        &self,
        interest_id: i64,
        hn_id: i64,
        points: Option<i64>,
        time: Option<i64>,
        seen_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let client = self.pool.get().await?;
        client
            .execute(
                "INSERT INTO interest_items (interest_id, hn_id, points, time, last_seen_at) \
                 VALUES ($1, $2, COALESCE($3::BIGINT, 0), $4::BIGINT, $5) \
                 ON CONFLICT (interest_id, hn_id) DO UPDATE SET \
                   points = COALESCE($3::BIGINT, interest_items.points), \
                   time = COALESCE($4::BIGINT, interest_items.time), \
                   last_seen_at = $5",
                &[&interest_id, &hn_id, &points, &time, &seen_at],
            )
            .await?;
        Ok(())
    }

    async fn list_shelf(&self, interest_id: i64) -> Result<Vec<ShelfEntry>, StoreError> {
        let client = self.pool.get().await?;
        let rows = client
            .query(
                "SELECT interest_id, hn_id, points, time, read_count, last_seen_at, seq \
                 FROM interest_items WHERE interest_id = $1 ORDER BY seq",
                &[&interest_id],
            )
            .await?;
        Ok(rows
            .iter()
            .map(|row| ShelfEntry {
                interest_id: row.get("interest_id"),
                hn_id: row.get("hn_id"),
                points: row.get("points"),
                time: row.get("time"),
                read_count: row.get("read_count"),
                last_seen_at: row.get("last_seen_at"),
                seq: row.get("seq"),
            })
            .collect())
    }

    async fn retain_shelf(&self, interest_id: i64, keep: &[i64]) -> Result<u64, StoreError> {
        let client = self.pool.get().await?;
        Ok(client
            .execute(
                "DELETE FROM interest_items WHERE interest_id = $1 AND NOT (hn_id = ANY($2))",
                &[&interest_id, &keep],
            )
            .await?)
    }

    async fn increment_shelf_reads(&self, hn_id: i64) -> Result<u64, StoreError> {
        let client = self.pool.get().await?;
        Ok(client
            .execute(
                "UPDATE interest_items SET read_count = read_count + 1 WHERE hn_id = $1",
                &[&hn_id],
            )
            .await?)
    }

    async fn max_shelf_time(&self, interest_id: i64) -> Result<Option<i64>, StoreError> {
        let client = self.pool.get().await?;
        let row = client
            .query_one(
                "SELECT MAX(time) FROM interest_items WHERE interest_id = $1",
                &[&interest_id],
            )
            .await?;
        Ok(row.get(0))
    }

    async fn get_user_states(
        &self,
        user_id: &str,
        ids: &[i64],
    ) -> Result<HashMap<i64, UserItemState>, StoreError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let client = self.pool.get().await?;
        let sql = format!(
            "SELECT {STATE_COLUMNS} FROM user_item_state WHERE user_id = $1 AND hn_id = ANY($2)"
        );
        let rows = client.query(&sql, &[&user_id, &ids]).await?;
        Ok(rows
            .iter()
            .map(state_from_row)
            .map(|s| (s.hn_id, s))
            .collect())
    }

    async fn mark_seen(&self, user_id: &str, hn_id: i64, at: DateTime<Utc>) -> Result<UserItemState, StoreError> {
        let client = self.pool.get().await?;
        let sql = format!(
            "INSERT INTO user_item_state (user_id, hn_id, last_seen_at) VALUES ($1, $2, $3) \
             ON CONFLICT (user_id, hn_id) DO UPDATE SET last_seen_at = EXCLUDED.last_seen_at \
             RETURNING {STATE_COLUMNS}"
        );
        let row = client.query_one(&sql, &[&user_id, &hn_id, &at]).await?;
        Ok(state_from_row(&row))
    }

    async fn mark_read(&self, user_id: &str, hn_id: i64, at: DateTime<Utc>) -> Result<UserItemState, StoreError> {
        let client = self.pool.get().await?;
        let sql = format!(
            "INSERT INTO user_item_state (user_id, hn_id, last_seen_at, last_read_at, read_count) \
             VALUES ($1, $2, $3, $3, 1) \
             ON CONFLICT (user_id, hn_id) DO UPDATE SET \
               read_count = user_item_state.read_count + 1, \
               last_read_at = EXCLUDED.last_read_at, \
               last_seen_at = EXCLUDED.last_seen_at \
             RETURNING {STATE_COLUMNS}"
        );
        let row = client.query_one(&sql, &[&user_id, &hn_id, &at]).await?;
        Ok(state_from_row(&row))
    }

    async fn mark_dismissed(&self, user_id: &str, hn_id: i64, at: DateTime<Utc>) -> Result<UserItemState, StoreError> {
        let client = self.pool.get().await?;
        let sql = format!(
            "INSERT INTO user_item_state (user_id, hn_id, dismissed_at) VALUES ($1, $2, $3) \
             ON CONFLICT (user_id, hn_id) DO UPDATE SET dismissed_at = EXCLUDED.dismissed_at \
             RETURNING {STATE_COLUMNS}"
        );
        let row = client.query_one(&sql, &[&user_id, &hn_id, &at]).await?;
        Ok(state_from_row(&row))
    }

    async fn get_summary(
        &self,
        kind: TargetKind,
        hn_id: i64,
        model_version: &str,
    ) -> Result<Option<StoredSummary>, StoreError> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                "SELECT tldr, key_points, consensus, content_hash, updated_at FROM summaries \
                 WHERE target_kind = $1 AND hn_id = $2 AND model_version = $3",
                &[&kind.as_str(), &hn_id, &model_version],
            )
            .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        Ok(Some(StoredSummary {
            target_kind: kind,
            hn_id,
            model_version: model_version.to_string(),
            data: summary_data_from_row(&row)?,
            content_hash: row.get("content_hash"),
            updated_at: row.get("updated_at"),
        }))
    }

    async fn put_summary(&self, summary: &StoredSummary) -> Result<bool, StoreError> {
        let client = self.pool.get().await?;
        let key_points = serde_json::to_value(&summary.data.key_points)?;
        let n = client
            .execute(
                "INSERT INTO summaries (target_kind, hn_id, model_version, tldr, key_points, \
                 consensus, content_hash, updated_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
                 ON CONFLICT (target_kind, hn_id, model_version) DO UPDATE SET \
                   tldr = EXCLUDED.tldr, key_points = EXCLUDED.key_points, \
                   consensus = EXCLUDED.consensus, content_hash = EXCLUDED.content_hash, \
                   updated_at = EXCLUDED.updated_at \
                 WHERE summaries.content_hash <> EXCLUDED.content_hash",
                &[
                    &summary.target_kind.as_str(),
                    &summary.hn_id,
                    &summary.model_version,
                    &summary.data.tldr,
                    &key_points,
                    &summary.data.consensus.as_str(),
                    &summary.content_hash,
                    &summary.updated_at,
                ],
            )
            .await?;
        Ok(n == 1)
    }

    async fn create_saved_thread(&self, user_id: &str, story_hn_id: i64) -> Result<SavedThread, StoreError> {
        let client = self.pool.get().await?;
        let row = client
            .query_one(
                "INSERT INTO saved_threads (user_id, story_hn_id) VALUES ($1, $2) \
                 RETURNING id, created_at",
                &[&user_id, &story_hn_id],
            )
            .await?;
        Ok(SavedThread {
            id: row.get("id"),
            user_id: user_id.to_string(),
            story_hn_id,
            created_at: row.get("created_at"),
        })
    }

    async fn list_saved_threads(&self, user_id: &str) -> Result<Vec<SavedThread>, StoreError> {
        let client = self.pool.get().await?;
        let rows = client
            .query(
                "SELECT id, story_hn_id, created_at FROM saved_threads WHERE user_id = $1 \
                 ORDER BY created_at DESC, id DESC",
                &[&user_id],
            )
            .await?;
        Ok(rows
            .iter()
            .map(|row| SavedThread {
                id: row.get("id"),
                user_id: user_id.to_string(),
                story_hn_id: row.get("story_hn_id"),
                created_at: row.get("created_at"),
            })
            .collect())
    }

    async fn add_thread_entry(&self, entry: &ThreadEntry) -> Result<(), StoreError> {
        let client = self.pool.get().await?;
        let key_points = serde_json::to_value(&entry.data.key_points)?;
        client
            .execute(
                "INSERT INTO saved_thread_items (thread_id, position, target_kind, hn_id, tldr, \
                 key_points, consensus) VALUES ($1, $2, $3, $4, $5, $6, $7) \
                 ON CONFLICT (thread_id, position) DO UPDATE SET \
                   target_kind = EXCLUDED.target_kind, hn_id = EXCLUDED.hn_id, \
                   tldr = EXCLUDED.tldr, key_points = EXCLUDED.key_points, \
                   consensus = EXCLUDED.consensus",
                &[
                    &entry.thread_id,
                    &entry.position,
                    &entry.target_kind.as_str(),
                    &entry.hn_id,
                    &entry.data.tldr,
                    &key_points,
                    &entry.data.consensus.as_str(),
                ],
            )
            .await?;
        Ok(())
    }

    async fn list_thread_entries(&self, thread_id: i64) -> Result<Vec<ThreadEntry>, StoreError> {
        let client = self.pool.get().await?;
        let rows = client
            .query(
                "SELECT thread_id, position, target_kind, hn_id, tldr, key_points, consensus \
                 FROM saved_thread_items WHERE thread_id = $1 ORDER BY position",
                &[&thread_id],
            )
            .await?;
        rows.iter()
            .map(|row| {
                let kind: String = row.get("target_kind");
                Ok(ThreadEntry {
                    thread_id: row.get("thread_id"),
                    position: row.get("position"),
                    target_kind: TargetKind::parse(&kind),
                    hn_id: row.get("hn_id"),
                    data: summary_data_from_row(row)?,
                })
            })
            .collect()
    }

    async fn get_search(&self, query: &str) -> Result<Option<SearchRecord>, StoreError> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                "SELECT query, result_ids, fetched_at FROM search_queries WHERE query = $1",
                &[&query],
            )
            .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        let ids: Value = row.get("result_ids");
        Ok(Some(SearchRecord {
            query: row.get("query"),
            result_ids: serde_json::from_value(ids)?,
            fetched_at: row.get("fetched_at"),
        }))
    }

    async fn put_search(&self, record: &SearchRecord) -> Result<(), StoreError> {
        let client = self.pool.get().await?;
        let ids = serde_json::to_value(&record.result_ids)?;
        client
            .execute(
                "INSERT INTO search_queries (query, result_ids, fetched_at) VALUES ($1, $2, $3) \
                 ON CONFLICT (query) DO UPDATE SET result_ids = EXCLUDED.result_ids, \
                 fetched_at = EXCLUDED.fetched_at",
                &[&record.query, &ids, &record.fetched_at],
            )
            .await?;
        Ok(())
    }

    async fn delete_searches_before(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError> {
        let client = self.pool.get().await?;
        Ok(client
            .execute("DELETE FROM search_queries WHERE fetched_at < $1", &[&cutoff])
            .await?)
    }

    async fn delete_unreferenced_items(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError> {
        let client = self.pool.get().await?;
        Ok(client
            .execute(
                "WITH doomed AS ( \
                     SELECT i.hn_id FROM items i WHERE i.kind <> 'comment' AND i.last_fetched_at < $1 \
                     AND NOT EXISTS (SELECT 1 FROM top_items t WHERE t.hn_id = i.hn_id) \
                     AND NOT EXISTS (SELECT 1 FROM interest_items s WHERE s.hn_id = i.hn_id) \
                     AND NOT EXISTS (SELECT 1 FROM saved_thread_items ti WHERE ti.hn_id = i.hn_id) \
                     AND NOT EXISTS (SELECT 1 FROM saved_threads st WHERE st.story_hn_id = i.hn_id) \
                     AND NOT EXISTS (SELECT 1 FROM summaries sm WHERE sm.hn_id = i.hn_id) \
                     AND NOT EXISTS (SELECT 1 FROM search_queries q \
                                     WHERE q.result_ids @> jsonb_build_array(i.hn_id)) \
                     AND NOT EXISTS (SELECT 1 FROM items c WHERE c.kind = 'comment' AND c.story_id = i.hn_id \
                                     AND (EXISTS (SELECT 1 FROM saved_thread_items ct WHERE ct.hn_id = c.hn_id) \
                                          OR EXISTS (SELECT 1 FROM summaries cs WHERE cs.hn_id = c.hn_id))) \
                 ) \
                 DELETE FROM items WHERE hn_id IN (SELECT hn_id FROM doomed) \
                 OR (kind = 'comment' AND story_id IN (SELECT hn_id FROM doomed))",
                &[&cutoff],
            )
            .await?)
    }
}
