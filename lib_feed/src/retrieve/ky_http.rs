//! # HTTP Retrieval Utilities
//!
//! The shared transport under every source client. One `ApiClient` owns the
//! three pieces of admission and recovery policy, so all callers share them:
//!
//! ## Key Design Principles:
//! - **Token bucket per attempt**: every attempt, including retries, spends a
//!   token, so a retry storm cannot exceed the configured rate.
//! - **Bounded concurrency**: a semaphore permit is held for the whole retry
//!   loop of one logical request.
//! - **Retry policy**: 5xx and network failures back off `backoff * 2^(attempt-1)`;
//!   HTTP 429 honors `Retry-After` when present. `max_retries` caps the total
//!   number of attempts; the last error propagates. Other 4xx statuses fail
//!   immediately.

use super::rate_limiter::TokenBucket;
use crate::configs::FetchSettings;
use reqwest::header::RETRY_AFTER;
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

/// Failures surfaced by the source clients.
///
/// Callers treat any of these as "temporarily unavailable", never as "deleted";
/// a deleted item is a successful fetch of a `null` body.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Invalid request URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },
    #[error("Rate limited by {url} after {attempts} attempts")]
    RateLimited { url: String, attempts: u32 },
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        source: serde_json::Error,
    },
    #[error("Malformed item payload: {0}")]
    Malformed(String),
    #[error("Fetch client is shut down")]
    Closed,
}

impl FetchError {
    /// Whether a later retry of the same request could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Status { status, .. } => *status >= 500,
            FetchError::RateLimited { .. } | FetchError::Network(_) => true,
            _ => false,
        }
    }
}

/// Rate-limited, retrying JSON client.
pub struct ApiClient {
    inner: reqwest::Client,
    limiter: TokenBucket,
    permits: Semaphore,
    settings: FetchSettings,
}

impl ApiClient {
    /// Builds a client enforcing `settings`.
    pub fn new(settings: &FetchSettings) -> Result<Self, FetchError> {
        let inner = reqwest::Client::builder()
            .timeout(settings.timeout())
            .user_agent(concat!("lib_feed/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            inner,
            limiter: TokenBucket::new(settings.rate_per_sec),
            permits: Semaphore::new(settings.max_concurrency.max(1)),
            settings: settings.clone(),
        })
    }

    /// GETs `url` and decodes the JSON body.
    pub async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, FetchError> {
        let _permit = self.permits.acquire().await.map_err(|_| FetchError::Closed)?;

        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            self.limiter.acquire().await;

            let (error, delay) = match self.inner.get(url.clone()).send().await {
                Ok(resp) if resp.status().is_success() => {
                    let body = resp.bytes().await?;
                    return serde_json::from_slice(&body).map_err(|source| FetchError::Decode {
                        url: url.to_string(),
                        source,
                    });
                }
                Ok(resp) if resp.status() == StatusCode::TOO_MANY_REQUESTS => {
                    let delay = retry_after(&resp).unwrap_or_else(|| self.settings.backoff(attempt));
                    let error = FetchError::RateLimited {
                        url: url.to_string(),
                        attempts: attempt,
                    };
                    (error, delay)
                }
                Ok(resp) if resp.status().is_server_error() => {
                    let error = FetchError::Status {
                        status: resp.status().as_u16(),
                        url: url.to_string(),
                    };
                    (error, self.settings.backoff(attempt))
                }
                Ok(resp) => {
                    return Err(FetchError::Status {
                        status: resp.status().as_u16(),
                        url: url.to_string(),
                    });
                }
                Err(e) => (FetchError::Network(e), self.settings.backoff(attempt)),
            };

            if attempt >= self.settings.max_retries.max(1) {
                return Err(error);
            }
            warn!(
                url = %url,
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "Request failed, retrying"
            );
            tokio::time::sleep(delay).await;
        }
    }

    /// Waits for every in-flight request to finish, then refuses new ones.
    pub async fn shutdown(&self) {
        let total = self.settings.max_concurrency.max(1) as u32;
        if let Ok(all) = self.permits.acquire_many(total).await {
            all.forget();
        }
        self.permits.close();
        debug!("Fetch client drained and closed");
    }
}

/// Parses a delta-seconds `Retry-After` header.
fn retry_after(resp: &reqwest::Response) -> Option<Duration> {
    let raw = resp.headers().get(RETRY_AFTER)?.to_str().ok()?;
    let secs: f64 = raw.trim().parse().ok()?;
    (secs.is_finite() && secs >= 0.0).then(|| Duration::from_secs_f64(secs))
}
