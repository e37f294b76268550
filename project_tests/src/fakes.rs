use async_trait::async_trait;
use lib_feed::cache::{TopFeedSource, TopStory};
use lib_feed::retrieve::{FetchError, ItemSource, SearchHit, SearchSource, SourceItem};
use lib_feed::store::StoreError;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Item payload of a story.
pub fn story(id: i64, title: &str, score: i64, time: i64, kids: &[i64]) -> Value {
    json!({
        "id": id,
        "type": "story",
        "by": "alice",
        "title": title,
        "url": format!("https://example.com/{id}"),
        "score": score,
        "time": time,
        "kids": kids,
        "descendants": kids.len(),
    })
}

/// Item payload of a live comment.
pub fn comment(id: i64, parent: i64, kids: &[i64]) -> Value {
    json!({
        "id": id,
        "type": "comment",
        "by": "bob",
        "text": format!("comment {id}"),
        "parent": parent,
        "time": 1_700_000_000 + id,
        "kids": kids,
    })
}

/// Item payload of a comment removed by moderation.
pub fn dead_comment(id: i64, parent: i64) -> Value {
    json!({ "id": id, "type": "comment", "parent": parent, "dead": true })
}

/// One search hit as the search API returns it.
pub fn hit(id: i64, title: &str, points: i64, created_at_i: i64) -> SearchHit {
    serde_json::from_value(json!({
        "objectID": id.to_string(),
        "title": title,
        "url": format!("https://example.com/{id}"),
        "author": "carol",
        "points": points,
        "num_comments": 0,
        "created_at_i": created_at_i,
    }))
    .expect("Hit fixture must deserialize")
}

/// `ItemSource` answering from an in-memory map; unknown ids answer `null`.
#[derive(Default)]
pub struct ScriptedSource {
    top: Mutex<Vec<i64>>,
    items: Mutex<HashMap<i64, Value>>,
    fetches: AtomicUsize,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_top(&self, ids: Vec<i64>) {
        *self.top.lock().unwrap() = ids;
    }

    /// Adds or replaces the payload under its `id`.
    pub fn put(&self, item: Value) {
        let id = item["id"].as_i64().expect("Fixture item needs an id");
        self.items.lock().unwrap().insert(id, item);
    }

    /// How many item fetches were served.
    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ItemSource for ScriptedSource {
    async fn fetch_top_ids(&self) -> Result<Vec<i64>, FetchError> {
        Ok(self.top.lock().unwrap().clone())
    }

    async fn fetch_item(&self, id: i64) -> Result<Option<SourceItem>, FetchError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let payload = self.items.lock().unwrap().get(&id).cloned();
        payload.map(SourceItem::from_value).transpose()
    }
}

/// `SearchSource` returning fixed hits, filtered by `since` like the real API.
#[derive(Default)]
pub struct ScriptedSearch {
    hits: Mutex<Vec<SearchHit>>,
    calls: Mutex<Vec<(String, Option<i64>)>>,
}

impl ScriptedSearch {
    pub fn new(hits: Vec<SearchHit>) -> Self {
        Self {
            hits: Mutex::new(hits),
            calls: Mutex::default(),
        }
    }

    pub fn set_hits(&self, hits: Vec<SearchHit>) {
        *self.hits.lock().unwrap() = hits;
    }

    /// Every `(query, since)` received, oldest first.
    pub fn calls(&self) -> Vec<(String, Option<i64>)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl SearchSource for ScriptedSearch {
    async fn search(
        &self,
        query: &str,
        limit: usize,
        since: Option<i64>,
    ) -> Result<Vec<SearchHit>, FetchError> {
        self.calls.lock().unwrap().push((query.to_string(), since));
        let hits = self.hits.lock().unwrap();
        Ok(hits
            .iter()
            .filter(|h| match (since, h.created_at_i) {
                (Some(since), Some(created)) => created > since,
                _ => true,
            })
            .take(limit)
            .cloned()
            .collect())
    }
}

/// `TopFeedSource` that counts loads and takes `delay` per load.
pub struct CountingTopFeed {
    stories: Vec<TopStory>,
    delay: Duration,
    loads: AtomicUsize,
}

impl CountingTopFeed {
    pub fn new(count: i64, delay: Duration) -> Self {
        let stories = (1..=count)
            .map(|id| TopStory {
                hn_id: id,
                title: Some(format!("Story {id}")),
                url: None,
                score: Some(100 - id),
                time: Some(1_700_000_000),
            })
            .collect();
        Self {
            stories,
            delay,
            loads: AtomicUsize::new(0),
        }
    }

    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TopFeedSource for CountingTopFeed {
    async fn load_top(&self, limit: usize) -> Result<Vec<TopStory>, StoreError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        Ok(self.stories.iter().take(limit).cloned().collect())
    }
}
