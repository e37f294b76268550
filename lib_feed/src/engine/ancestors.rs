//! Bounded parent walk from a comment to its root story.

use crate::retrieve::{FetchError, ItemKind, ItemSource, SourceItem};
use crate::store::{ContentBackend, StoreError};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum AncestorError {
    #[error("No story found within {depth} ancestors of item {start}")]
    DepthExceeded { start: i64, depth: usize },
    #[error("Ancestor {missing} of item {start} is unavailable")]
    Orphaned { start: i64, missing: i64 },
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// The root story id of `item`, walking at most `max_depth` parents.
///
/// Stored ancestors answer from their recorded story id without a fetch; the
/// rest are fetched from the source.
pub async fn resolve_story_id(
    source: &dyn ItemSource,
    backend: &dyn ContentBackend,
    item: &SourceItem,
    max_depth: usize,
) -> Result<i64, AncestorError> {
    if item.kind != ItemKind::Comment {
        return Ok(item.id);
    }
    let start = item.id;
    let mut next = item.parent;
    for depth in 0..max_depth {
        let Some(parent_id) = next else {
            return Err(AncestorError::Orphaned { start, missing: start });
        };
        if let Some(story_id) = backend.get_item(parent_id).await?.and_then(|p| p.story_id) {
            debug!(start, story_id, depth, "Story resolved from store");
            return Ok(story_id);
        }
        let parent = source
            .fetch_item(parent_id)
            .await?
            .ok_or(AncestorError::Orphaned { start, missing: parent_id })?;
        if parent.kind != ItemKind::Comment {
            debug!(start, story_id = parent.id, depth, "Story resolved from source");
            return Ok(parent.id);
        }
        next = parent.parent;
    }
    Err(AncestorError::DepthExceeded { start, depth: max_depth })
}
