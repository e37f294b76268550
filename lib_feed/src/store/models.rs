//! Durable records owned by the content store.

use crate::ai::SummaryData;
use crate::retrieve::{ItemKind, SourceItem};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A story or comment, keyed by its source id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub hn_id: i64,
    pub kind: ItemKind,
    pub author: Option<String>,
    pub title: Option<String>,
    pub url: Option<String>,
    pub text: Option<String>,
    pub score: Option<i64>,
    pub time: Option<i64>,
    pub parent_id: Option<i64>,
    /// Root story of a comment; equal to `hn_id` for stories.
    pub story_id: Option<i64>,
    pub kids: Vec<i64>,
    pub descendants: Option<i64>,
    pub dead: bool,
    pub deleted: bool,
    pub raw: Value,
    pub content_hash: String,
    /// Advances only when the fingerprint changes.
    pub content_changed_at: DateTime<Utc>,
    /// Advances on every fetch, changed or not.
    pub last_fetched_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Item {
    /// A brand-new row for a first fetch.
    pub fn from_source(
        source: &SourceItem,
        story_id: Option<i64>,
        content_hash: String,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            hn_id: source.id,
            kind: source.kind,
            author: source.by.clone(),
            title: source.title.clone(),
            url: source.url.clone(),
            text: source.text.clone(),
            score: source.score,
            time: source.time,
            parent_id: source.parent,
            story_id: story_id.or((source.kind != ItemKind::Comment).then_some(source.id)),
            kids: source.kids.clone(),
            descendants: source.descendants,
            dead: source.dead,
            deleted: source.deleted,
            raw: source.raw.clone(),
            content_hash,
            content_changed_at: now,
            last_fetched_at: now,
            created_at: now,
        }
    }

    /// Overwrites the content fields of an existing row, keeping its identity
    /// and creation time. A known `story_id` is never forgotten.
    pub fn with_new_content(
        &self,
        source: &SourceItem,
        story_id: Option<i64>,
        content_hash: String,
        changed_at: DateTime<Utc>,
    ) -> Self {
        let mut next = Item::from_source(source, story_id.or(self.story_id), content_hash, changed_at);
        next.created_at = self.created_at;
        next
    }

    pub fn is_comment(&self) -> bool {
        self.kind == ItemKind::Comment
    }
}

/// What a summary is about.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    #[default]
    Story,
    Comment,
}

impl TargetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetKind::Story => "story",
            TargetKind::Comment => "comment",
        }
    }

    pub fn parse(raw: &str) -> Self {
        if raw == "comment" {
            TargetKind::Comment
        } else {
            TargetKind::Story
        }
    }
}

/// A named topic with keywords, seeded from the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interest {
    pub id: i64,
    pub group_name: String,
    pub name: String,
    pub keywords: Vec<String>,
    pub read_count: i64,
    pub last_read_at: Option<DateTime<Utc>>,
}

/// One (interest, item) association with cached rank inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShelfEntry {
    pub interest_id: i64,
    pub hn_id: i64,
    pub points: i64,
    pub time: Option<i64>,
    pub read_count: i64,
    pub last_seen_at: DateTime<Utc>,
    /// Insertion order; breaks rank ties.
    pub seq: i64,
}

/// A user's interaction with one item. Created lazily, never deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserItemState {
    pub user_id: String,
    pub hn_id: i64,
    pub last_seen_at: Option<DateTime<Utc>>,
    pub last_read_at: Option<DateTime<Utc>>,
    pub read_count: i64,
    pub dismissed_at: Option<DateTime<Utc>>,
}

impl UserItemState {
    pub fn new(user_id: &str, hn_id: i64) -> Self {
        Self {
            user_id: user_id.to_string(),
            hn_id,
            last_seen_at: None,
            last_read_at: None,
            read_count: 0,
            dismissed_at: None,
        }
    }

    /// Read or dismissed items never reappear in a feed.
    pub fn is_excluded(&self) -> bool {
        self.read_count > 0 || self.dismissed_at.is_some()
    }
}

/// A persisted summary for one target and model version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredSummary {
    pub target_kind: TargetKind,
    pub hn_id: i64,
    pub model_version: String,
    pub data: SummaryData,
    /// Fingerprint of the payload the summary was computed from.
    pub content_hash: String,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedThread {
    pub id: i64,
    pub user_id: String,
    pub story_hn_id: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadEntry {
    pub thread_id: i64,
    pub position: i32,
    pub target_kind: TargetKind,
    pub hn_id: i64,
    pub data: SummaryData,
}

/// The ids a normalized search query resolved to, and when.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRecord {
    pub query: String,
    pub result_ids: Vec<i64>,
    pub fetched_at: DateTime<Utc>,
}
