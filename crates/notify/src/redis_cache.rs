//! Redis-backed dedup cache.
//!
//! Claims keys with a single `SET key value NX EX ttl`, so two processes
//! reporting the same error at the same moment cannot both win.

use alerter_core::{CacheError, DedupCache};
use async_trait::async_trait;
use redis::aio::MultiplexedConnection;

/// [`DedupCache`] over a multiplexed Redis connection.
#[derive(Clone)]
pub struct RedisCache {
    conn: MultiplexedConnection,
}

impl std::fmt::Debug for RedisCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisCache").finish_non_exhaustive()
    }
}

impl RedisCache {
    /// Connect to `url` (e.g. `redis://127.0.0.1:6379/0`).
    pub async fn connect(url: &str) -> Result<Self, CacheError> {
        let client =
            redis::Client::open(url).map_err(|e| CacheError::Connection(e.to_string()))?;
        let conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| CacheError::Connection(e.to_string()))?;
        Ok(Self { conn })
    }

    /// Wrap an existing connection owned by the host.
    pub fn from_connection(conn: MultiplexedConnection) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl DedupCache for RedisCache {
    async fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl_secs: u64,
    ) -> Result<bool, CacheError> {
        let mut conn = self.conn.clone();
        let reply: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("NX")
            .arg("EX")
            .arg(ttl_secs)
            .query_async(&mut conn)
            .await
            .map_err(|e| CacheError::Command(e.to_string()))?;

        interpret_set_reply(reply)
    }
}

/// `OK` means the key was set; nil means it already existed.
fn interpret_set_reply(reply: Option<String>) -> Result<bool, CacheError> {
    match reply.as_deref() {
        Some("OK") => Ok(true),
        None => Ok(false),
        Some(other) => Err(CacheError::UnexpectedReply(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_reply_interpretation() {
        assert!(interpret_set_reply(Some("OK".into())).unwrap());
        assert!(!interpret_set_reply(None).unwrap());
        assert!(matches!(
            interpret_set_reply(Some("QUEUED".into())),
            Err(CacheError::UnexpectedReply(_))
        ));
    }

    #[tokio::test]
    async fn connect_rejects_malformed_url() {
        let err = RedisCache::connect("not-a-redis-url").await.unwrap_err();
        assert!(matches!(err, CacheError::Connection(_)));
    }
}
