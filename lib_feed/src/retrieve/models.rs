//! Wire shapes of the item API and the search API.

use super::ky_http::FetchError;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// The `type` field of a source item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Story,
    Comment,
    Job,
    Poll,
    Pollopt,
    #[serde(other)]
    Unknown,
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Story => "story",
            ItemKind::Comment => "comment",
            ItemKind::Job => "job",
            ItemKind::Poll => "poll",
            ItemKind::Pollopt => "pollopt",
            ItemKind::Unknown => "unknown",
        }
    }

    pub fn parse(raw: &str) -> Self {
        match raw {
            "story" => ItemKind::Story,
            "comment" => ItemKind::Comment,
            "job" => ItemKind::Job,
            "poll" => ItemKind::Poll,
            "pollopt" => ItemKind::Pollopt,
            _ => ItemKind::Unknown,
        }
    }
}

#[derive(Deserialize)]
struct WireItem {
    id: i64,
    #[serde(rename = "type")]
    kind: Option<ItemKind>,
    by: Option<String>,
    title: Option<String>,
    url: Option<String>,
    text: Option<String>,
    score: Option<i64>,
    time: Option<i64>,
    parent: Option<i64>,
    #[serde(default)]
    kids: Vec<i64>,
    descendants: Option<i64>,
    #[serde(default)]
    dead: bool,
    #[serde(default)]
    deleted: bool,
}

/// One item as fetched, with the untouched payload kept for fingerprinting.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceItem {
    pub id: i64,
    pub kind: ItemKind,
    pub by: Option<String>,
    pub title: Option<String>,
    pub url: Option<String>,
    pub text: Option<String>,
    pub score: Option<i64>,
    pub time: Option<i64>,
    pub parent: Option<i64>,
    pub kids: Vec<i64>,
    pub descendants: Option<i64>,
    pub dead: bool,
    pub deleted: bool,
    pub raw: Value,
}

impl SourceItem {
    /// Parses an item payload; an object without a numeric `id` is malformed.
    pub fn from_value(raw: Value) -> Result<Self, FetchError> {
        let wire: WireItem = serde_json::from_value(raw.clone())
            .map_err(|e| FetchError::Malformed(e.to_string()))?;
        Ok(Self {
            id: wire.id,
            kind: wire.kind.unwrap_or(ItemKind::Unknown),
            by: wire.by,
            title: wire.title,
            url: wire.url,
            text: wire.text,
            score: wire.score,
            time: wire.time,
            parent: wire.parent,
            kids: wire.kids,
            descendants: wire.descendants,
            dead: wire.dead,
            deleted: wire.deleted,
            raw,
        })
    }

    /// Whether this item can be shown as a live comment.
    pub fn is_live_comment(&self) -> bool {
        self.kind == ItemKind::Comment && !self.dead && !self.deleted
    }
}

/// One hit of the keyword search API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    #[serde(rename = "objectID")]
    pub object_id: String,
    pub title: Option<String>,
    pub url: Option<String>,
    pub author: Option<String>,
    pub points: Option<i64>,
    pub num_comments: Option<i64>,
    pub created_at_i: Option<i64>,
}

impl SearchHit {
    pub fn hn_id(&self) -> Option<i64> {
        self.object_id.parse().ok()
    }

    /// Rebuilds the minimal story payload a hit stands for.
    ///
    /// The shape mirrors the item API so the stored fingerprint stays stable
    /// across repeated searches returning the same hit.
    pub fn to_source_item(&self) -> Option<SourceItem> {
        let id = self.hn_id()?;
        let raw = json!({
            "id": id,
            "type": "story",
            "by": self.author,
            "title": self.title,
            "url": self.url,
            "score": self.points,
            "time": self.created_at_i,
            "descendants": self.num_comments,
        });
        SourceItem::from_value(raw).ok()
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct SearchResponse {
    #[serde(default)]
    pub hits: Vec<SearchHit>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_comment_with_defaults() {
        let raw = json!({ "id": 9, "type": "comment", "parent": 1, "time": 100 });
        let item = SourceItem::from_value(raw.clone()).unwrap();
        assert_eq!(item.kind, ItemKind::Comment);
        assert!(item.kids.is_empty());
        assert!(item.is_live_comment());
        assert_eq!(item.raw, raw);
    }

    #[test]
    fn test_unknown_type_and_missing_type() {
        let odd = SourceItem::from_value(json!({ "id": 1, "type": "ask" })).unwrap();
        assert_eq!(odd.kind, ItemKind::Unknown);
        let bare = SourceItem::from_value(json!({ "id": 2, "deleted": true })).unwrap();
        assert_eq!(bare.kind, ItemKind::Unknown);
        assert!(!bare.is_live_comment());
    }

    #[test]
    fn test_missing_id_is_malformed() {
        let err = SourceItem::from_value(json!({ "type": "story" })).unwrap_err();
        assert!(matches!(err, FetchError::Malformed(_)));
    }

    #[test]
    fn test_search_hit_becomes_story() {
        let hit: SearchHit = serde_json::from_value(json!({
            "objectID": "42", "title": "Rust", "points": 10, "created_at_i": 1000
        }))
        .unwrap();
        let item = hit.to_source_item().unwrap();
        assert_eq!(item.id, 42);
        assert_eq!(item.kind, ItemKind::Story);
        assert_eq!(item.score, Some(10));
    }
}
