//! # Feed Settings
//!
//! Every tunable the engine recognizes, grouped by the component that consumes
//! it. Components receive the section they need when they are constructed; there
//! is no process-global settings object, so tests can build a component with
//! overrides without touching anything else.
//!
//! All sections deserialize from camelCase JSON and fall back to field defaults,
//! so a config file only has to name what it changes. [`FeedSettings::validate`]
//! rejects values no component can run with before anything is built.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error, PartialEq)]
pub enum SettingsError {
    #[error("Setting {field} must be {rule}")]
    OutOfRange { field: &'static str, rule: &'static str },
    #[error("Setting {field} is not a valid URL: {value}")]
    BadUrl { field: &'static str, value: String },
}

fn at_least_one(field: &'static str, value: usize) -> Result<(), SettingsError> {
    if value == 0 {
        return Err(SettingsError::OutOfRange { field, rule: "at least 1" });
    }
    Ok(())
}

fn non_negative(field: &'static str, value: f64) -> Result<(), SettingsError> {
    if !value.is_finite() || value < 0.0 {
        return Err(SettingsError::OutOfRange { field, rule: "a finite number >= 0" });
    }
    Ok(())
}

/// Default base URL of the item API.
pub const DEFAULT_HN_API_URL: &str = "https://hacker-news.firebaseio.com/v0/";
/// Default URL of the keyword search API.
pub const DEFAULT_SEARCH_API_URL: &str = "https://hn.algolia.com/api/v1/search_by_date";

/// The complete engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct FeedSettings {
    pub endpoints: EndpointSettings,
    pub fetch: FetchSettings,
    pub top: TopItemsSettings,
    pub interest: InterestSettings,
    pub feed: FeedLimits,
    pub cache: CacheSettings,
    pub search: SearchSettings,
    pub summary: SummarySettings,
    pub comments: CommentSettings,
    pub queue: QueueSettings,
    pub cleanup: CleanupSettings,
    pub worker: WorkerTimings,
}

impl FeedSettings {
    /// Checks every value a component would misbehave on.
    pub fn validate(&self) -> Result<(), SettingsError> {
        for (field, value) in [
            ("endpoints.hnApiUrl", &self.endpoints.hn_api_url),
            ("endpoints.searchApiUrl", &self.endpoints.search_api_url),
        ] {
            if Url::parse(value).is_err() {
                return Err(SettingsError::BadUrl {
                    field,
                    value: value.clone(),
                });
            }
        }
        non_negative("fetch.ratePerSec", self.fetch.rate_per_sec)?;
        non_negative("fetch.backoffSecs", self.fetch.backoff_secs)?;
        at_least_one("fetch.maxConcurrency", self.fetch.max_concurrency)?;
        at_least_one("fetch.maxRetries", self.fetch.max_retries as usize)?;
        at_least_one("top.limit", self.top.limit)?;
        at_least_one("interest.shelfMax", self.interest.shelf_max)?;
        at_least_one("feed.limit", self.feed.limit)?;
        at_least_one("search.limit", self.search.limit)?;
        at_least_one("search.maxKeywords", self.search.max_keywords)?;
        at_least_one("comments.fetchLimit", self.comments.fetch_limit)?;
        at_least_one("comments.crawlMultiplier", self.comments.crawl_multiplier)?;
        at_least_one("comments.batchSize", self.comments.batch_size)?;
        if self.summary.rate_per_hour < 0 {
            return Err(SettingsError::OutOfRange {
                field: "summary.ratePerHour",
                rule: ">= 0",
            });
        }
        if self.search.db_ttl_days < 0 || self.cleanup.retention_days < 0 {
            return Err(SettingsError::OutOfRange {
                field: "search.dbTtlDays/cleanup.retentionDays",
                rule: ">= 0",
            });
        }
        Ok(())
    }
}

/// Where the external source lives.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct EndpointSettings {
    pub hn_api_url: String,
    pub search_api_url: String,
}

impl Default for EndpointSettings {
    fn default() -> Self {
        Self {
            hn_api_url: DEFAULT_HN_API_URL.to_string(),
            search_api_url: DEFAULT_SEARCH_API_URL.to_string(),
        }
    }
}

/// Admission control and retry policy for outbound requests.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct FetchSettings {
    /// Token bucket capacity and refill rate, in requests per second.
    pub rate_per_sec: f64,
    /// Maximum simultaneous in-flight requests.
    pub max_concurrency: usize,
    pub timeout_secs: u64,
    /// Total attempts per request, the first included; the last error propagates once exhausted.
    pub max_retries: u32,
    /// Base of the exponential backoff, `backoff * 2^(attempt-1)`.
    pub backoff_secs: f64,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            rate_per_sec: 10.0,
            max_concurrency: 5,
            timeout_secs: 10,
            max_retries: 3,
            backoff_secs: 0.5,
        }
    }
}

impl FetchSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Delay before retry number `attempt` (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(16);
        Duration::from_secs_f64(self.backoff_secs.max(0.0) * f64::from(1u32 << exp))
    }
}

/// The global top list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct TopItemsSettings {
    pub limit: usize,
    pub refresh_secs: u64,
}

impl Default for TopItemsSettings {
    fn default() -> Self {
        Self { limit: 50, refresh_secs: 86_400 }
    }
}

/// Interest shelves.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct InterestSettings {
    /// Interval of the periodic full refresh over every interest.
    pub refresh_secs: u64,
    /// Hits requested per interest by the periodic full refresh.
    pub backlog_limit: usize,
    /// Shelf cap applied by both capping paths.
    pub shelf_max: usize,
    /// A shelf whose unseen pool drops below this triggers a refill signal.
    pub low_water: usize,
}

impl Default for InterestSettings {
    fn default() -> Self {
        Self {
            refresh_secs: 900,
            backlog_limit: 50,
            shelf_max: 50,
            low_water: 10,
        }
    }
}

/// Request-time feed sizing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct FeedLimits {
    /// Upper bound for any single feed request.
    pub limit: usize,
}

impl Default for FeedLimits {
    fn default() -> Self {
        Self { limit: 50 }
    }
}

/// Derived-view TTLs and the distributed lock.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct CacheSettings {
    pub feed_ttl_secs: u64,
    /// Auto-expiry of a held lock, so a crashed holder cannot block others.
    pub lock_ttl_secs: u64,
    /// How long a caller waits to acquire a lock before giving up.
    pub lock_wait_secs: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            feed_ttl_secs: 300,
            lock_ttl_secs: 10,
            lock_wait_secs: 5,
        }
    }
}

/// Keyword search.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchSettings {
    pub ttl_secs: u64,
    pub limit: usize,
    /// Keywords of one interest combined into a single query.
    pub max_keywords: usize,
    /// Age after which a persisted result row is stale and eligible for cleanup.
    pub db_ttl_days: i64,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            ttl_secs: 300,
            limit: 20,
            max_keywords: 5,
            db_ttl_days: 7,
        }
    }
}

/// Summaries.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct SummarySettings {
    /// Enqueue a summary job for every story the top refresh creates.
    pub enabled: bool,
    pub ttl_secs: u64,
    pub model_version: String,
    /// Per-user summary requests per clock hour.
    pub rate_per_hour: i64,
}

impl Default for SummarySettings {
    fn default() -> Self {
        Self {
            enabled: false,
            ttl_secs: 3_600,
            model_version: "mock-v1".to_string(),
            rate_per_hour: 30,
        }
    }
}

/// Comment previews and the reply-tree crawl.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct CommentSettings {
    pub preview_limit: usize,
    pub fetch_limit: usize,
    /// The crawl ceiling is `fetch_limit * crawl_multiplier`, flat per crawl.
    pub crawl_multiplier: usize,
    pub batch_size: usize,
    /// Ceiling for the parent walk that resolves a comment's story.
    pub max_ancestor_depth: usize,
}

impl Default for CommentSettings {
    fn default() -> Self {
        Self {
            preview_limit: 5,
            fetch_limit: 100,
            crawl_multiplier: 5,
            batch_size: 10,
            max_ancestor_depth: 10,
        }
    }
}

impl CommentSettings {
    pub fn crawl_ceiling(&self) -> usize {
        self.fetch_limit.saturating_mul(self.crawl_multiplier)
    }
}

/// Background job drains.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct QueueSettings {
    pub summary_max_per_tick: usize,
    pub saved_thread_max_per_tick: usize,
    /// Live search results persisted per tick.
    pub search_max_per_tick: usize,
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            summary_max_per_tick: 20,
            saved_thread_max_per_tick: 10,
            search_max_per_tick: 20,
        }
    }
}

/// Retention.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct CleanupSettings {
    pub interval_secs: u64,
    pub retention_days: i64,
}

impl Default for CleanupSettings {
    fn default() -> Self {
        Self {
            interval_secs: 86_400,
            retention_days: 7,
        }
    }
}

/// Loop pacing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkerTimings {
    /// Upper bound of each signal wait inside one tick.
    pub signal_wait_secs: u64,
    /// Pause after a failed step before the loop continues.
    pub error_sleep_secs: u64,
}

impl Default for WorkerTimings {
    fn default() -> Self {
        Self {
            signal_wait_secs: 1,
            error_sleep_secs: 5,
        }
    }
}

impl WorkerTimings {
    pub fn signal_wait(&self) -> Duration {
        Duration::from_secs(self.signal_wait_secs)
    }

    pub fn error_sleep(&self) -> Duration {
        Duration::from_secs(self.error_sleep_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_values() {
        let s = FeedSettings::default();
        assert_eq!(s.fetch.max_concurrency, 5);
        assert_eq!(s.fetch.max_retries, 3);
        assert_eq!(s.interest.shelf_max, 50);
        assert_eq!(s.comments.crawl_ceiling(), 500);
        assert_eq!(s.summary.model_version, "mock-v1");
        assert_eq!(s.endpoints.hn_api_url, DEFAULT_HN_API_URL);
    }

    #[test]
    fn test_partial_json_keeps_other_defaults() {
        let raw = r#"{ "fetch": { "ratePerSec": 2.5 }, "interest": { "shelfMax": 80 } }"#;
        let s: FeedSettings = serde_json::from_str(raw).unwrap();
        assert_eq!(s.fetch.rate_per_sec, 2.5);
        assert_eq!(s.fetch.max_retries, 3);
        assert_eq!(s.interest.shelf_max, 80);
        assert_eq!(s.interest.low_water, 10);
    }

    #[test]
    fn test_validate_rejects_unusable_values() {
        assert_eq!(FeedSettings::default().validate(), Ok(()));

        let mut s = FeedSettings::default();
        s.fetch.max_retries = 0;
        assert!(matches!(
            s.validate(),
            Err(SettingsError::OutOfRange { field: "fetch.maxRetries", .. })
        ));

        let mut s = FeedSettings::default();
        s.endpoints.search_api_url = "not a url".to_string();
        assert!(matches!(s.validate(), Err(SettingsError::BadUrl { .. })));

        let mut s = FeedSettings::default();
        s.fetch.rate_per_sec = f64::NAN;
        assert!(s.validate().is_err());
    }

    #[test]
    fn test_backoff_doubles_per_attempt() {
        let f = FetchSettings { backoff_secs: 0.5, ..Default::default() };
        assert_eq!(f.backoff(1), Duration::from_millis(500));
        assert_eq!(f.backoff(2), Duration::from_millis(1000));
        assert_eq!(f.backoff(3), Duration::from_millis(2000));
    }
}
