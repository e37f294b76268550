//! # lib_feed
//!
//! The ingestion, caching and feed-assembly engine behind the personalized
//! Hacker News reader. Request-time code (the `feed_reader` surface) reads
//! derived views through the caches and only ever *signals* the background
//! worker; the worker (`feed_worker`) owns every write against the source API.
//!
//! ## Module Map
//! - **`configs`**: the explicit `FeedSettings` struct handed to every component.
//! - **`loggers`**: `tracing` subscriber setup with a rolling file appender.
//! - **`connections`**: the shared cache store (Redis or in-memory) and the Postgres pool.
//! - **`retrieve`**: the rate-limited fetch client for the item API and the search API.
//! - **`store`**: the relational content store and the idempotent upsert protocol.
//! - **`cache`**: stampede-safe read-through caches over the content store.
//! - **`queue`**: de-duplicated worker signals and the background job queues.
//! - **`engine`**: interest shelves, the feed assembler and the request-time services.
//! - **`ai`**: the summarization contract and its deterministic mock.
//! - **`worker`**: the orchestration loop that keeps everything fresh.

#![forbid(unsafe_code)]

pub mod ai;
pub mod cache;
pub mod configs;
pub mod connections;
pub mod engine;
pub mod loggers;
pub mod queue;
pub mod retrieve;
pub mod store;
pub mod worker;

pub use configs::FeedSettings;
