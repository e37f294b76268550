//! Startup plumbing shared by the binaries.

use lib_feed::cache::SharedCache;
use lib_feed::configs::CacheSettings;
use lib_feed::connections::RedisCacheStore;
use std::sync::Arc;
use tracing::{info, warn};

/// A cache over Redis when `redis_url` is set and reachable, otherwise the
/// disabled cache (no-op locks, pass-through reads, no queues).
pub async fn connect_cache(redis_url: Option<&str>, settings: &CacheSettings) -> SharedCache {
    let Some(url) = redis_url else {
        info!("No Redis URL configured, running without cache");
        return SharedCache::disabled();
    };
    match RedisCacheStore::connect(url).await {
        Ok(store) => SharedCache::connect(Arc::new(store), settings).await,
        Err(e) => {
            warn!(error = %e, "Redis connection failed, running without cache");
            SharedCache::disabled()
        }
    }
}
