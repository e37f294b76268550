//! # Data Retrieval Module
//!
//! This module owns every call to the external content source. Request
//! admission (token bucket), concurrency bounding (semaphore) and the retry
//! policy live in one shared `ApiClient`, so the endpoint clients on top of it
//! only build URLs and decode payloads.
//!
//! ## Contained Modules:
//!
//! - **`rate_limiter`**: the continuous-refill token bucket.
//! - **`ky_http`**: the retrying JSON client and `FetchError`.
//! - **`models`**: wire shapes of items and search hits.
//! - **`hn_client`**: the item API and search API clients behind the
//!   `ItemSource` / `SearchSource` traits.

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms, unused_qualifications)]

/// Continuous-refill token bucket shared by all requests.
pub mod rate_limiter;
/// Rate-limited HTTP client with retry and `Retry-After` support.
pub mod ky_http;
/// Source payload shapes.
pub mod models;
/// Endpoint clients and their traits.
pub mod hn_client;

pub use hn_client::{HnClient, ItemSource, SearchClient, SearchSource};
pub use ky_http::{ApiClient, FetchError};
pub use models::{ItemKind, SearchHit, SourceItem};
pub use rate_limiter::TokenBucket;
