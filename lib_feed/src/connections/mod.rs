//! # Connections Module
//!
//! This module handles persistent connections to external services
//! including databases and caching layers.

/// The shared cache store contract and its error type.
pub mod cache_store;

/// Process-local cache store for tests and single-process runs.
pub mod cache_memory;

/// Module for Redis cache operations and connection handling.
#[cfg(feature = "connections")]
pub mod cache_redis;

/// Module for PostgreSQL database connection pooling and management.
#[cfg(feature = "connections")]
pub mod db_postgres;

pub use cache_memory::MemoryCacheStore;
pub use cache_store::{CacheError, CacheStore};

#[cfg(feature = "connections")]
pub use cache_redis::RedisCacheStore;
