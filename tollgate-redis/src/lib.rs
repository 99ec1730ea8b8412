//! Redis-backed window counter for `tollgate` (companion crate).
//! Bring your own `redis::aio::ConnectionManager`; each (policy, identifier)
//! window lives in a sorted set scored by event timestamp.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::Script;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tollgate::{Occupancy, WindowCounter};

/// Executed server-side so prune + count + conditional add + expire is one
/// atomic step for any number of concurrent clients.
///
/// ARGV: now (ms), window (ms), limit, member tag.
const TRY_RECORD: &str = r"
local key = KEYS[1]
local now = tonumber(ARGV[1])
local window = tonumber(ARGV[2])
local limit = tonumber(ARGV[3])
redis.call('ZREMRANGEBYSCORE', key, 0, now - window - 1)
local used = redis.call('ZCARD', key)
if used < limit then
  redis.call('ZADD', key, now, now .. '-' .. ARGV[4])
  redis.call('PEXPIRE', key, window)
  return {1, used + 1}
end
return {0, used}
";

/// Sliding-window counter over a Redis sorted set.
///
/// Clones share the connection manager. Every set carries a TTL of one
/// window, so idle identifiers expire on their own and the store needs no
/// explicit cleanup.
#[derive(Clone)]
pub struct RedisCounter {
    manager: ConnectionManager,
    script: Arc<Script>,
    // Disambiguates events landing on the same millisecond; combined with
    // the process id so members stay unique across instances.
    sequence: Arc<AtomicU64>,
    instance: u32,
}

impl std::fmt::Debug for RedisCounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisCounter")
            .field("manager", &"<redis::aio::ConnectionManager>")
            .field("instance", &self.instance)
            .finish()
    }
}

impl RedisCounter {
    /// Create a counter using an existing connection manager.
    pub fn new(manager: ConnectionManager) -> Self {
        Self {
            manager,
            script: Arc::new(Script::new(TRY_RECORD)),
            sequence: Arc::new(AtomicU64::new(0)),
            instance: std::process::id(),
        }
    }
}

#[async_trait]
impl WindowCounter for RedisCounter {
    type Error = redis::RedisError;

    async fn try_record(
        &self,
        key: &str,
        window: Duration,
        limit: u32,
        now_millis: u64,
    ) -> Result<Occupancy, Self::Error> {
        let window_millis = u64::try_from(window.as_millis()).unwrap_or(u64::MAX);
        let seq = self.sequence.fetch_add(1, Ordering::Relaxed);
        let tag = format!("{}-{}", self.instance, seq);
        let mut conn = self.manager.clone();

        let (admitted, used): (u8, u32) = self
            .script
            .key(key)
            .arg(now_millis)
            .arg(window_millis)
            .arg(limit)
            .arg(tag)
            .invoke_async(&mut conn)
            .await?;

        tracing::trace!(
            target: "tollgate::redis",
            key = %key,
            used,
            admitted = admitted == 1,
            "window recorded"
        );

        Ok(Occupancy { admitted: admitted == 1, used })
    }
}
