//! # Redis Cache Store
//!
//! The production `CacheStore`, backed by a multiplexed, auto-reconnecting
//! `ConnectionManager`. The de-dup enqueue, the de-dup dequeue and the lock
//! release are Lua scripts so each runs as one atomic step on the server.
//!
//! Blocking pops are deliberately not used: a `BRPOP` would stall every other
//! command sharing the multiplexed connection. The dequeue instead polls the
//! atomic pop script until the caller's timeout.

use super::cache_store::{CacheError, CacheStore};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{Client, Script};
use std::time::Duration;
use tokio::time::Instant;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

const ENQUEUE_UNIQUE: &str = r#"
if redis.call('SADD', KEYS[2], ARGV[1]) == 1 then
    redis.call('LPUSH', KEYS[1], ARGV[1])
    return 1
end
return 0
"#;

const DEQUEUE_UNIQUE: &str = r#"
local v = redis.call('RPOP', KEYS[1])
if v then
    redis.call('SREM', KEYS[2], v)
end
return v
"#;

const UNLOCK: &str = r#"
if redis.call('GET', KEYS[1]) == ARGV[1] then
    return redis.call('DEL', KEYS[1])
end
return 0
"#;

/// `CacheStore` over a Redis server.
#[derive(Clone)]
pub struct RedisCacheStore {
    conn: ConnectionManager,
    enqueue: Script,
    dequeue: Script,
    unlock: Script,
}

impl RedisCacheStore {
    /// Opens a managed connection to the server at `url` (e.g. "redis://127.0.0.1/").
    pub async fn connect(url: &str) -> Result<Self, CacheError> {
        let client = Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self {
            conn,
            enqueue: Script::new(ENQUEUE_UNIQUE),
            dequeue: Script::new(DEQUEUE_UNIQUE),
            unlock: Script::new(UNLOCK),
        })
    }

    async fn pop_unique_once(&self, queue: &str, pending: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.conn.clone();
        let value: Option<String> = self
            .dequeue
            .key(queue)
            .key(pending)
            .invoke_async(&mut conn)
            .await?;
        Ok(value)
    }
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    async fn ping(&self) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.conn.clone();
        Ok(redis::cmd("GET").arg(key).query_async(&mut conn).await?)
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value);
        if let Some(ttl) = ttl {
            cmd.arg("PX").arg(ttl.as_millis().max(1) as u64);
        }
        let _: () = cmd.query_async(&mut conn).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let _: i64 = redis::cmd("DEL").arg(key).query_async(&mut conn).await?;
        Ok(())
    }

    async fn incr_with_expiry(&self, key: &str, ttl: Duration) -> Result<i64, CacheError> {
        let mut conn = self.conn.clone();
        let n: i64 = redis::cmd("INCR").arg(key).query_async(&mut conn).await?;
        if n == 1 {
            let _: i64 = redis::cmd("EXPIRE")
                .arg(key)
                .arg(ttl.as_secs().max(1))
                .query_async(&mut conn)
                .await?;
        }
        Ok(n)
    }

    async fn enqueue_unique(&self, queue: &str, pending: &str, member: &str) -> Result<bool, CacheError> {
        let mut conn = self.conn.clone();
        let n: i64 = self
            .enqueue
            .key(queue)
            .key(pending)
            .arg(member)
            .invoke_async(&mut conn)
            .await?;
        Ok(n == 1)
    }

    async fn dequeue_unique(
        &self,
        queue: &str,
        pending: &str,
        timeout: Duration,
    ) -> Result<Option<String>, CacheError> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(value) = self.pop_unique_once(queue, pending).await? {
                return Ok(Some(value));
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }
            tokio::time::sleep(POLL_INTERVAL.min(deadline - now)).await;
        }
    }

    async fn push(&self, queue: &str, value: &str) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let _: i64 = redis::cmd("LPUSH").arg(queue).arg(value).query_async(&mut conn).await?;
        Ok(())
    }

    async fn pop(&self, queue: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.conn.clone();
        Ok(redis::cmd("RPOP").arg(queue).query_async(&mut conn).await?)
    }

    async fn queue_len(&self, queue: &str) -> Result<u64, CacheError> {
        let mut conn = self.conn.clone();
        Ok(redis::cmd("LLEN").arg(queue).query_async(&mut conn).await?)
    }

    async fn hash_set(&self, key: &str, field: &str, value: &str) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let _: i64 = redis::cmd("HSET")
            .arg(key)
            .arg(field)
            .arg(value)
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn hash_get(&self, key: &str, field: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.conn.clone();
        Ok(redis::cmd("HGET").arg(key).arg(field).query_async(&mut conn).await?)
    }

    async fn zset_add(&self, key: &str, member: &str, score: f64) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let _: i64 = redis::cmd("ZADD")
            .arg(key)
            .arg(score)
            .arg(member)
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn try_lock(&self, name: &str, token: &str, ttl: Duration) -> Result<bool, CacheError> {
        let mut conn = self.conn.clone();
        let reply: Option<String> = redis::cmd("SET")
            .arg(name)
            .arg(token)
            .arg("NX")
            .arg("PX")
            .arg(ttl.as_millis().max(1) as u64)
            .query_async(&mut conn)
            .await?;
        Ok(reply.is_some())
    }

    async fn unlock(&self, name: &str, token: &str) -> Result<bool, CacheError> {
        let mut conn = self.conn.clone();
        let n: i64 = self
            .unlock
            .key(name)
            .arg(token)
            .invoke_async(&mut conn)
            .await?;
        Ok(n == 1)
    }
}
