//! # Derived-View Caches
//!
//! Read-through caches over the content store. Everything cached here can be
//! rebuilt from the store, so a missing or failing cache store only costs
//! latency.
//!
//! ## Key Design Principles:
//! - **Degrade, never fail**: cache errors are logged and treated as misses.
//! - **One recompute per key**: priming runs under a named lock and re-checks
//!   the key once the lock is held.
//! - **Strategy chosen once**: distributed or no-op locking is fixed when the
//!   [`SharedCache`] is built.

pub mod feed_cache;
pub mod shared;
pub mod summary_cache;

pub use feed_cache::{FeedCache, PrimeError, StoreTopFeed, TopFeedSource, TopStory, TOP_FEED_KEY};
pub use shared::{LockError, LockGuard, LockStrategy, SharedCache};
pub use summary_cache::{summary_key, SummaryCache, SummaryState};
