//! # Source API Clients
//!
//! Thin endpoint wrappers over the shared [`ApiClient`]: the item API
//! (`topstories.json`, `item/{id}.json`) and the keyword search API. Both sit
//! behind traits so the worker and the tests can swap in fakes.

use super::ky_http::{ApiClient, FetchError};
use super::models::{SearchHit, SearchResponse, SourceItem};
use async_trait::async_trait;
use reqwest::Url;
use serde_json::Value;
use std::sync::Arc;

/// Read access to the tree-structured item graph.
#[async_trait]
pub trait ItemSource: Send + Sync {
    /// The current ranked top list.
    async fn fetch_top_ids(&self) -> Result<Vec<i64>, FetchError>;
    /// One item; `None` when the source answers `null` for the id.
    async fn fetch_item(&self, id: i64) -> Result<Option<SourceItem>, FetchError>;
}

/// Keyword search over stories.
#[async_trait]
pub trait SearchSource: Send + Sync {
    /// Stories matching `query`, newest first, created strictly after `since`.
    async fn search(
        &self,
        query: &str,
        limit: usize,
        since: Option<i64>,
    ) -> Result<Vec<SearchHit>, FetchError>;
}

/// Joins relative paths onto a base that always ends in `/`.
fn directory_url(raw: &str) -> Result<Url, FetchError> {
    if raw.ends_with('/') {
        Ok(Url::parse(raw)?)
    } else {
        Ok(Url::parse(&format!("{raw}/"))?)
    }
}

/// Client for the item API.
pub struct HnClient {
    api: Arc<ApiClient>,
    base: Url,
}

impl HnClient {
    pub fn new(api: Arc<ApiClient>, base_url: &str) -> Result<Self, FetchError> {
        Ok(Self {
            api,
            base: directory_url(base_url)?,
        })
    }
}

#[async_trait]
impl ItemSource for HnClient {
    async fn fetch_top_ids(&self) -> Result<Vec<i64>, FetchError> {
        let url = self.base.join("topstories.json")?;
        self.api.get_json(url).await
    }

    async fn fetch_item(&self, id: i64) -> Result<Option<SourceItem>, FetchError> {
        let url = self.base.join(&format!("item/{id}.json"))?;
        let body: Value = self.api.get_json(url).await?;
        if body.is_null() {
            return Ok(None);
        }
        SourceItem::from_value(body).map(Some)
    }
}

/// Client for the `search_by_date` endpoint.
pub struct SearchClient {
    api: Arc<ApiClient>,
    endpoint: Url,
}

impl SearchClient {
    pub fn new(api: Arc<ApiClient>, endpoint: &str) -> Result<Self, FetchError> {
        Ok(Self {
            api,
            endpoint: Url::parse(endpoint)?,
        })
    }

    fn request_url(&self, query: &str, limit: usize, since: Option<i64>) -> Url {
        let mut url = self.endpoint.clone();
        {
            let mut pairs = url.query_pairs_mut();
            pairs
                .append_pair("query", query)
                .append_pair("tags", "story")
                .append_pair("hitsPerPage", &limit.to_string());
            if let Some(since) = since {
                pairs.append_pair("numericFilters", &format!("created_at_i>{since}"));
            }
        }
        url
    }
}

#[async_trait]
impl SearchSource for SearchClient {
    async fn search(
        &self,
        query: &str,
        limit: usize,
        since: Option<i64>,
    ) -> Result<Vec<SearchHit>, FetchError> {
        let url = self.request_url(query, limit, since);
        let response: SearchResponse = self.api.get_json(url).await?;
        Ok(response.hits)
    }
}
