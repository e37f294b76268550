//! # Content Backend
//!
//! Repository-style operations over the relational store. Each method is one
//! logical operation committed on its own; nothing here spans a network call,
//! so a partial failure cannot leave a cross-item change half-applied.

use super::models::{
    Interest, Item, SavedThread, SearchRecord, ShelfEntry, StoredSummary, TargetKind, ThreadEntry,
    UserItemState,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[cfg(feature = "connections")]
    #[error("Failed to acquire database connection: {0}")]
    Pool(#[from] deadpool_postgres::PoolError),
    #[cfg(feature = "connections")]
    #[error("Query execution failed: {0}")]
    Query(#[from] tokio_postgres::Error),
    #[error("Stored payload could not be (de)serialized: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },
    #[error("Content store unavailable: {0}")]
    Unavailable(String),
}

/// Every query the engine runs against the relational store.
#[async_trait]
pub trait ContentBackend: Send + Sync {
    // --- Items ---
    async fn get_item(&self, hn_id: i64) -> Result<Option<Item>, StoreError>;
    /// Rows for `ids` in no particular order; unknown ids are skipped.
    async fn get_items(&self, ids: &[i64]) -> Result<Vec<Item>, StoreError>;
    /// Inserts a new row; `false` if another writer inserted the id first.
    async fn insert_item(&self, item: &Item) -> Result<bool, StoreError>;
    /// Overwrites content fields and both timestamps of an existing row.
    async fn replace_item_content(&self, item: &Item) -> Result<(), StoreError>;
    /// Advances only `last_fetched_at`.
    async fn touch_item(&self, hn_id: i64, fetched_at: DateTime<Utc>) -> Result<(), StoreError>;
    /// Comments of a story ordered by time, oldest first.
    async fn list_comments(&self, story_id: i64, limit: usize) -> Result<Vec<Item>, StoreError>;
    async fn count_comments(&self, story_id: i64) -> Result<i64, StoreError>;

    // --- Top list ---
    async fn replace_top_items(&self, ids: &[i64]) -> Result<(), StoreError>;
    /// Stored stories of the top list in rank order.
    async fn list_top_items(&self, limit: usize) -> Result<Vec<Item>, StoreError>;

    // --- Interests ---
    /// Creates or updates by (group, name); read statistics are preserved.
    async fn upsert_interest(
        &self,
        group_name: &str,
        name: &str,
        keywords: &[String],
    ) -> Result<Interest, StoreError>;
    async fn get_interest(&self, id: i64) -> Result<Option<Interest>, StoreError>;
    /// All interests ordered by group, then name.
    async fn list_interests(&self) -> Result<Vec<Interest>, StoreError>;
    async fn set_user_interests(&self, user_id: &str, interest_ids: &[i64]) -> Result<(), StoreError>;
    /// The user's selection ordered by interest id.
    async fn get_user_interests(&self, user_id: &str) -> Result<Vec<Interest>, StoreError>;
    /// Increments read statistics of every interest whose shelf holds `hn_id`.
    async fn increment_interest_reads(&self, hn_id: i64, at: DateTime<Utc>) -> Result<u64, StoreError>;

    // --- Shelves ---
    /// Inserts or refreshes rank inputs; an existing row keeps its read count,
    /// its insertion order and, when `points` is `None`, its points.
    async fn upsert_shelf_entry(
        &self,
        interest_id: i64,
        hn_id: i64,
        points: Option<i64>,
        time: Option<i64>,
        seen_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;
    /// Rows of one shelf in insertion order.
    async fn list_shelf(&self, interest_id: i64) -> Result<Vec<ShelfEntry>, StoreError>;
    /// Deletes every row of the shelf whose item is not in `keep`.
    async fn retain_shelf(&self, interest_id: i64, keep: &[i64]) -> Result<u64, StoreError>;
    /// Increments `read_count` on every shelf row referencing `hn_id`.
    async fn increment_shelf_reads(&self, hn_id: i64) -> Result<u64, StoreError>;
    async fn max_shelf_time(&self, interest_id: i64) -> Result<Option<i64>, StoreError>;

    // --- Per-user state ---
    async fn get_user_states(
        &self,
        user_id: &str,
        ids: &[i64],
    ) -> Result<HashMap<i64, UserItemState>, StoreError>;
    async fn mark_seen(&self, user_id: &str, hn_id: i64, at: DateTime<Utc>) -> Result<UserItemState, StoreError>;
    async fn mark_read(&self, user_id: &str, hn_id: i64, at: DateTime<Utc>) -> Result<UserItemState, StoreError>;
    async fn mark_dismissed(&self, user_id: &str, hn_id: i64, at: DateTime<Utc>) -> Result<UserItemState, StoreError>;

    // --- Summaries ---
    async fn get_summary(
        &self,
        kind: TargetKind,
        hn_id: i64,
        model_version: &str,
    ) -> Result<Option<StoredSummary>, StoreError>;
    /// Writes unless a row with the same content hash exists; returns whether it wrote.
    async fn put_summary(&self, summary: &StoredSummary) -> Result<bool, StoreError>;

    // --- Saved threads ---
    async fn create_saved_thread(&self, user_id: &str, story_hn_id: i64) -> Result<SavedThread, StoreError>;
    async fn add_thread_entry(&self, entry: &ThreadEntry) -> Result<(), StoreError>;
    async fn list_thread_entries(&self, thread_id: i64) -> Result<Vec<ThreadEntry>, StoreError>;
    /// A user's saved threads, newest first.
    async fn list_saved_threads(&self, user_id: &str) -> Result<Vec<SavedThread>, StoreError>;

    // --- Search ---
    async fn get_search(&self, query: &str) -> Result<Option<SearchRecord>, StoreError>;
    async fn put_search(&self, record: &SearchRecord) -> Result<(), StoreError>;

    // --- Retention ---
    async fn delete_searches_before(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError>;
    /// Deletes stories last fetched before `cutoff` that nothing references:
    /// not on the top list, a shelf, a saved thread, a summary or a search
    /// result. A story also stays while one of its comments is in a saved
    /// thread or has a summary. Comments go with their story and are never
    /// deleted on their own. Returns stories and comments removed.
    async fn delete_unreferenced_items(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError>;
}
