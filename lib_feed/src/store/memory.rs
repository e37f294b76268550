//! # In-Memory Content Backend
//!
//! A `ContentBackend` over plain collections behind one mutex. It honors the
//! same contracts as the Postgres backend (ordering, conflict rules, retention
//! predicate) and backs the integration tests and `feed_reader --memory`.

use super::backend::{ContentBackend, StoreError};
use super::models::{
    Interest, Item, SavedThread, SearchRecord, ShelfEntry, StoredSummary, TargetKind, ThreadEntry,
    UserItemState,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

#[derive(Default)]
struct ContentState {
    items: HashMap<i64, Item>,
    top: Vec<i64>,
    interests: BTreeMap<i64, Interest>,
    user_interests: HashMap<String, BTreeSet<i64>>,
    shelves: HashMap<i64, Vec<ShelfEntry>>,
    next_seq: i64,
    states: HashMap<(String, i64), UserItemState>,
    summaries: HashMap<(TargetKind, i64, String), StoredSummary>,
    threads: Vec<SavedThread>,
    thread_entries: Vec<ThreadEntry>,
    searches: HashMap<String, SearchRecord>,
}

impl ContentState {
    fn state_mut(&mut self, user_id: &str, hn_id: i64) -> &mut UserItemState {
        self.states
            .entry((user_id.to_string(), hn_id))
            .or_insert_with(|| UserItemState::new(user_id, hn_id))
    }
}

/// Process-local `ContentBackend`.
#[derive(Default)]
pub struct MemoryContentStore {
    state: Mutex<ContentState>,
}

impl MemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> Result<MutexGuard<'_, ContentState>, StoreError> {
        self.state
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }

    /// Ids of every stored item, for assertions.
    pub fn item_ids(&self) -> Vec<i64> {
        let mut ids: Vec<i64> = self
            .state()
            .map(|s| s.items.keys().copied().collect())
            .unwrap_or_default();
        ids.sort_unstable();
        ids
    }

    /// Rewrites `last_fetched_at` of one item, for retention tests.
    pub fn backdate_item(&self, hn_id: i64, fetched_at: DateTime<Utc>) {
        if let Ok(mut state) = self.state() {
            if let Some(item) = state.items.get_mut(&hn_id) {
                item.last_fetched_at = fetched_at;
            }
        }
    }
}

#[async_trait]
impl ContentBackend for MemoryContentStore {
    async fn get_item(&self, hn_id: i64) -> Result<Option<Item>, StoreError> {
        Ok(self.state()?.items.get(&hn_id).cloned())
    }

    async fn get_items(&self, ids: &[i64]) -> Result<Vec<Item>, StoreError> {
        let state = self.state()?;
        Ok(ids.iter().filter_map(|id| state.items.get(id).cloned()).collect())
    }

    async fn insert_item(&self, item: &Item) -> Result<bool, StoreError> {
        let mut state = self.state()?;
        if state.items.contains_key(&item.hn_id) {
            return Ok(false);
        }
        state.items.insert(item.hn_id, item.clone());
        Ok(true)
    }

    async fn replace_item_content(&self, item: &Item) -> Result<(), StoreError> {
        let mut state = self.state()?;
        match state.items.get_mut(&item.hn_id) {
            Some(row) => {
                *row = item.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound {
                entity: "item",
                id: item.hn_id.to_string(),
            }),
        }
    }

    async fn touch_item(&self, hn_id: i64, fetched_at: DateTime<Utc>) -> Result<(), StoreError> {
        if let Some(row) = self.state()?.items.get_mut(&hn_id) {
            row.last_fetched_at = fetched_at;
        }
        Ok(())
    }

    async fn list_comments(&self, story_id: i64, limit: usize) -> Result<Vec<Item>, StoreError> {
        let state = self.state()?;
        let mut comments: Vec<Item> = state
            .items
            .values()
            .filter(|i| i.is_comment() && i.story_id == Some(story_id))
            .cloned()
            .collect();
        comments.sort_by_key(|c| (c.time.unwrap_or(0), c.hn_id));
        comments.truncate(limit);
        Ok(comments)
    }

    async fn count_comments(&self, story_id: i64) -> Result<i64, StoreError> {
        let state = self.state()?;
        Ok(state
            .items
            .values()
            .filter(|i| i.is_comment() && i.story_id == Some(story_id))
            .count() as i64)
    }

    async fn replace_top_items(&self, ids: &[i64]) -> Result<(), StoreError> {
        self.state()?.top = ids.to_vec();
        Ok(())
    }

    async fn list_top_items(&self, limit: usize) -> Result<Vec<Item>, StoreError> {
        let state = self.state()?;
        Ok(state
            .top
            .iter()
            .filter_map(|id| state.items.get(id).cloned())
            .take(limit)
            .collect())
    }

    async fn upsert_interest(
        &self,
        group_name: &str,
        name: &str,
        keywords: &[String],
    ) -> Result<Interest, StoreError> {
        let mut state = self.state()?;
        let existing = state
            .interests
            .values_mut()
            .find(|i| i.group_name == group_name && i.name == name);
        if let Some(interest) = existing {
            interest.keywords = keywords.to_vec();
            return Ok(interest.clone());
        }
        let id = state.interests.keys().next_back().copied().unwrap_or(0) + 1;
        let interest = Interest {
            id,
            group_name: group_name.to_string(),
            name: name.to_string(),
            keywords: keywords.to_vec(),
            read_count: 0,
            last_read_at: None,
        };
        state.interests.insert(id, interest.clone());
        Ok(interest)
    }

    async fn get_interest(&self, id: i64) -> Result<Option<Interest>, StoreError> {
        Ok(self.state()?.interests.get(&id).cloned())
    }

    async fn list_interests(&self) -> Result<Vec<Interest>, StoreError> {
        let mut all: Vec<Interest> = self.state()?.interests.values().cloned().collect();
        all.sort_by(|a, b| (&a.group_name, &a.name).cmp(&(&b.group_name, &b.name)));
        Ok(all)
    }

    async fn set_user_interests(&self, user_id: &str, interest_ids: &[i64]) -> Result<(), StoreError> {
        let mut state = self.state()?;
        let known: BTreeSet<i64> = interest_ids
            .iter()
            .copied()
            .filter(|id| state.interests.contains_key(id))
            .collect();
        state.user_interests.insert(user_id.to_string(), known);
        Ok(())
    }

    async fn get_user_interests(&self, user_id: &str) -> Result<Vec<Interest>, StoreError> {
        let state = self.state()?;
        Ok(state
            .user_interests
            .get(user_id)
            .map(|ids| ids.iter().filter_map(|id| state.interests.get(id).cloned()).collect())
            .unwrap_or_default())
    }

    async fn increment_interest_reads(&self, hn_id: i64, at: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut state = self.state()?;
        let owners: Vec<i64> = state
            .shelves
            .iter()
            .filter(|(_, rows)| rows.iter().any(|r| r.hn_id == hn_id))
            .map(|(id, _)| *id)
            .collect();
        let mut touched = 0;
        for id in owners {
            if let Some(interest) = state.interests.get_mut(&id) {
                interest.read_count += 1;
                interest.last_read_at = Some(at);
                touched += 1;
            }
        }
        Ok(touched)
    }

    async fn upsert_shelf_entry(
        &self,
        interest_id: i64,
        hn_id: i64,
        points: Option<i64>,
        time: Option<i64>,
        seen_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut state = self.state()?;
        state.next_seq += 1;
        let seq = state.next_seq;
        let shelf = state.shelves.entry(interest_id).or_default();
        match shelf.iter_mut().find(|r| r.hn_id == hn_id) {
            Some(row) => {
                if let Some(points) = points {
                    row.points = points;
                }
                if time.is_some() {
                    row.time = time;
                }
                row.last_seen_at = seen_at;
            }
            None => shelf.push(ShelfEntry {
                interest_id,
                hn_id,
                points: points.unwrap_or(0),
                time,
                read_count: 0,
                last_seen_at: seen_at,
                seq,
            }),
        }
        Ok(())
    }

    async fn list_shelf(&self, interest_id: i64) -> Result<Vec<ShelfEntry>, StoreError> {
        Ok(self
            .state()?
            .shelves
            .get(&interest_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn retain_shelf(&self, interest_id: i64, keep: &[i64]) -> Result<u64, StoreError> {
        let keep: HashSet<i64> = keep.iter().copied().collect();
        let mut state = self.state()?;
        let Some(shelf) = state.shelves.get_mut(&interest_id) else {
            return Ok(0);
        };
        let before = shelf.len();
        shelf.retain(|r| keep.contains(&r.hn_id));
        Ok((before - shelf.len()) as u64)
    }

    async fn increment_shelf_reads(&self, hn_id: i64) -> Result<u64, StoreError> {
        let mut state = self.state()?;
        let mut touched = 0;
        for row in state.shelves.values_mut().flatten().filter(|r| r.hn_id == hn_id) {
            row.read_count += 1;
            touched += 1;
        }
        Ok(touched)
    }

    async fn max_shelf_time(&self, interest_id: i64) -> Result<Option<i64>, StoreError> {
        Ok(self
            .state()?
            .shelves
            .get(&interest_id)
            .and_then(|rows| rows.iter().filter_map(|r| r.time).max()))
    }

    async fn get_user_states(
        &self,
        user_id: &str,
        ids: &[i64],
    ) -> Result<HashMap<i64, UserItemState>, StoreError> {
        let state = self.state()?;
        Ok(ids
            .iter()
            .filter_map(|id| {
                state
                    .states
                    .get(&(user_id.to_string(), *id))
                    .map(|s| (*id, s.clone()))
            })
            .collect())
    }

    async fn mark_seen(&self, user_id: &str, hn_id: i64, at: DateTime<Utc>) -> Result<UserItemState, StoreError> {
        let mut state = self.state()?;
        let row = state.state_mut(user_id, hn_id);
        row.last_seen_at = Some(at);
        Ok(row.clone())
    }

    async fn mark_read(&self, user_id: &str, hn_id: i64, at: DateTime<Utc>) -> Result<UserItemState, StoreError> {
        let mut state = self.state()?;
        let row = state.state_mut(user_id, hn_id);
        row.read_count += 1;
        row.last_read_at = Some(at);
        row.last_seen_at = Some(at);
        Ok(row.clone())
    }

    async fn mark_dismissed(&self, user_id: &str, hn_id: i64, at: DateTime<Utc>) -> Result<UserItemState, StoreError> {
        let mut state = self.state()?;
        let row = state.state_mut(user_id, hn_id);
        row.dismissed_at = Some(at);
        Ok(row.clone())
    }

    async fn get_summary(
        &self,
        kind: TargetKind,
        hn_id: i64,
        model_version: &str,
    ) -> Result<Option<StoredSummary>, StoreError> {
        Ok(self
            .state()?
            .summaries
            .get(&(kind, hn_id, model_version.to_string()))
            .cloned())
    }

    async fn put_summary(&self, summary: &StoredSummary) -> Result<bool, StoreError> {
        let mut state = self.state()?;
        let key = (summary.target_kind, summary.hn_id, summary.model_version.clone());
        if state
            .summaries
            .get(&key)
            .is_some_and(|s| s.content_hash == summary.content_hash)
        {
            return Ok(false);
        }
        state.summaries.insert(key, summary.clone());
        Ok(true)
    }

    async fn create_saved_thread(&self, user_id: &str, story_hn_id: i64) -> Result<SavedThread, StoreError> {
        let mut state = self.state()?;
        let thread = SavedThread {
            id: state.threads.len() as i64 + 1,
            user_id: user_id.to_string(),
            story_hn_id,
            created_at: Utc::now(),
        };
        state.threads.push(thread.clone());
        Ok(thread)
    }

    async fn add_thread_entry(&self, entry: &ThreadEntry) -> Result<(), StoreError> {
        let mut state = self.state()?;
        state
            .thread_entries
            .retain(|e| !(e.thread_id == entry.thread_id && e.position == entry.position));
        state.thread_entries.push(entry.clone());
        Ok(())
    }

    async fn list_thread_entries(&self, thread_id: i64) -> Result<Vec<ThreadEntry>, StoreError> {
        let mut entries: Vec<ThreadEntry> = self
            .state()?
            .thread_entries
            .iter()
            .filter(|e| e.thread_id == thread_id)
            .cloned()
            .collect();
        entries.sort_by_key(|e| e.position);
        Ok(entries)
    }

    async fn list_saved_threads(&self, user_id: &str) -> Result<Vec<SavedThread>, StoreError> {
        let mut threads: Vec<SavedThread> = self
            .state()?
            .threads
            .iter()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect();
        threads.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(threads)
    }

    async fn get_search(&self, query: &str) -> Result<Option<SearchRecord>, StoreError> {
        Ok(self.state()?.searches.get(query).cloned())
    }

    async fn put_search(&self, record: &SearchRecord) -> Result<(), StoreError> {
        self.state()?
            .searches
            .insert(record.query.clone(), record.clone());
        Ok(())
    }

    async fn delete_searches_before(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut state = self.state()?;
        let before = state.searches.len();
        state.searches.retain(|_, r| r.fetched_at >= cutoff);
        Ok((before - state.searches.len()) as u64)
    }

    async fn delete_unreferenced_items(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut state = self.state()?;

        let mut keep: HashSet<i64> = state.top.iter().copied().collect();
        keep.extend(state.shelves.values().flatten().map(|r| r.hn_id));
        keep.extend(state.thread_entries.iter().map(|e| e.hn_id));
        keep.extend(state.threads.iter().map(|t| t.story_hn_id));
        keep.extend(state.summaries.values().map(|s| s.hn_id));
        keep.extend(state.searches.values().flat_map(|r| r.result_ids.iter().copied()));
        let pinned_roots: Vec<i64> = state
            .items
            .values()
            .filter(|i| i.is_comment() && keep.contains(&i.hn_id))
            .filter_map(|i| i.story_id)
            .collect();
        keep.extend(pinned_roots);

        let doomed: HashSet<i64> = state
            .items
            .values()
            .filter(|i| !i.is_comment() && !keep.contains(&i.hn_id) && i.last_fetched_at < cutoff)
            .map(|i| i.hn_id)
            .collect();

        let before = state.items.len();
        state.items.retain(|id, item| {
            let root_gone = item.is_comment() && item.story_id.is_some_and(|s| doomed.contains(&s));
            !doomed.contains(id) && !root_gone
        });
        Ok((before - state.items.len()) as u64)
    }
}
