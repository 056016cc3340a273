use std::time::Duration;

use async_trait::async_trait;
use redis::{Client, RedisError, aio::ConnectionManager};

use crate::{CacheBackend, CacheError};

const SCAN_COUNT: usize = 200;

/// [`CacheBackend`] on a Redis server.
///
/// Entries expire server-side (`SET .. PX`). Prefix deletes walk the keyspace
/// with `SCAN MATCH` and delete each page as it arrives. The connection manager
/// reconnects on its own; while the server is gone every call fails with
/// [`CacheError::Unavailable`].
#[derive(Clone)]
pub struct RedisCache {
    connection: ConnectionManager,
}

impl RedisCache {
    /// Opens a managed connection to `url`, e.g. `redis://127.0.0.1:6379/0`.
    pub async fn connect(url: &str) -> Result<Self, CacheError> {
        let client = Client::open(url).map_err(unavailable)?;
        let connection = ConnectionManager::new(client).await.map_err(unavailable)?;
        Ok(Self { connection })
    }
}

fn unavailable(err: RedisError) -> CacheError {
    CacheError::Unavailable(err.to_string())
}

/// `SET .. PX` rejects zero, so sub-millisecond TTLs round up.
fn ttl_millis(ttl: Duration) -> Result<u64, CacheError> {
    u64::try_from(ttl.as_millis())
        .map(|millis| millis.max(1))
        .map_err(|_| CacheError::InvalidTtl(ttl))
}

/// Glob matching every key that starts with `prefix`.
fn prefix_pattern(prefix: &str) -> String {
    let mut pattern = String::with_capacity(prefix.len() + 1);
    for c in prefix.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('*');
    pattern
}

#[async_trait]
impl CacheBackend for RedisCache {
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(level = "debug", fields(%key), skip_all)
    )]
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let mut connection = self.connection.clone();
        let value: Option<Vec<u8>> = redis::cmd("GET")
            .arg(key)
            .query_async(&mut connection)
            .await
            .map_err(unavailable)?;
        Ok(value)
    }

    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(level = "debug", fields(%key, ?ttl), skip_all)
    )]
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
        let millis = ttl_millis(ttl)?;
        let mut connection = self.connection.clone();
        let _: () = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("PX")
            .arg(millis)
            .query_async(&mut connection)
            .await
            .map_err(unavailable)?;
        Ok(())
    }

    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(level = "debug", fields(%key), skip_all)
    )]
    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut connection = self.connection.clone();
        let _: u64 = redis::cmd("DEL")
            .arg(key)
            .query_async(&mut connection)
            .await
            .map_err(unavailable)?;
        Ok(())
    }

    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(level = "debug", fields(%prefix), skip_all, ret)
    )]
    async fn delete_prefix(&self, prefix: &str) -> Result<u64, CacheError> {
        let pattern = prefix_pattern(prefix);
        let mut connection = self.connection.clone();
        let mut cursor = 0u64;
        let mut removed = 0u64;

        loop {
            let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_COUNT)
                .query_async(&mut connection)
                .await
                .map_err(unavailable)?;

            if !keys.is_empty() {
                let deleted: u64 = redis::cmd("DEL")
                    .arg(&keys)
                    .query_async(&mut connection)
                    .await
                    .map_err(unavailable)?;
                removed += deleted;
            }

            if next == 0 {
                return Ok(removed);
            }
            cursor = next;
        }
    }
}
