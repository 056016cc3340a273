pub mod consistency;
mod error;
mod fence;
mod invalidation;
mod policy;
mod retry;

pub use consistency::{Committed, Invalidated, Mutation, MutationState, Pending};
pub use error::Error;
pub use invalidation::{InvalidationFailed, InvalidationSet};
pub use policy::CachePolicy;

use std::{future::Future, sync::Arc};

use cache::{CacheBackend, CacheKey};
use serde::{Serialize, de::DeserializeOwned};
use sqlx::SqlitePool;
use tokio::time::Instant;

use crate::{fence::Fences, invalidation::bounded, retry::Retrier};

/// Store of record plus the cache in front of it.
///
/// Reads go through [`DataAccess::read`] (cache-aside) and mutations through
/// [`DataAccess::write`], which invalidates the affected keys once the
/// mutation has committed. Cloning is cheap; clones share the pool, the cache
/// and the background retries.
pub struct DataAccess {
    pool: SqlitePool,
    cache: Arc<dyn CacheBackend>,
    policy: CachePolicy,
    fences: Arc<Fences>,
    retrier: Retrier,
}

impl DataAccess {
    pub fn new(pool: SqlitePool, cache: Arc<dyn CacheBackend>, policy: CachePolicy) -> Self {
        Self {
            pool,
            retrier: Retrier::new(Arc::clone(&cache), policy.clone()),
            cache,
            policy,
            fences: Arc::new(Fences::default()),
        }
    }

    #[inline]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    #[inline]
    pub fn policy(&self) -> &CachePolicy {
        &self.policy
    }

    /// Invalidations still being retried in the background.
    pub fn pending_invalidations(&self) -> usize {
        self.retrier.pending()
    }

    /// Returns the value cached under `key`, or runs `query` against the store
    /// of record and caches its result with the TTL of the key's kind.
    ///
    /// Cache failures only cost the cache: the value is read from the store and
    /// not cached. `RowNotFound` becomes [`Error::NotFound`]; errors are never
    /// cached.
    #[tracing::instrument(level = "debug", fields(%key), skip_all)]
    pub async fn read<'conn, V, Fut>(
        &'conn self,
        key: CacheKey,
        query: impl FnOnce(&'conn SqlitePool) -> Fut,
    ) -> Result<V, Error>
    where
        V: Serialize + DeserializeOwned,
        Fut: Future<Output = Result<V, sqlx::Error>>,
    {
        match bounded(self.policy.backend_timeout, self.cache.get(key.as_str())).await {
            Ok(Some(bytes)) => match serde_json::from_slice::<V>(&bytes) {
                Ok(value) => {
                    tracing::debug!("hit");
                    return Ok(value);
                }
                Err(err) => {
                    tracing::warn!("discarding undecodable cache entry :: {}", err);
                    self.evict(&key).await;
                }
            },
            Ok(None) => tracing::debug!("miss"),
            Err(err) => {
                tracing::warn!("cache unavailable, reading from store without caching :: {}", err);
                return Ok(query(&self.pool).await?);
            }
        }

        let epoch = self.fences.epoch(key.resource());
        let value = query(&self.pool).await?;
        self.populate(&key, &value, epoch).await;
        Ok(value)
    }

    /// Runs the mutating `query`, then invalidates what `invalidation` derives
    /// from its result.
    ///
    /// The query must be durable when its future resolves. Multi-statement
    /// mutations commit their own transaction inside `query`. If invalidation
    /// fails the mutation is still reported as successful and the remaining keys
    /// are retried in the background until their TTL has passed.
    #[tracing::instrument(level = "debug", skip_all)]
    pub async fn write<'conn, V, Fut>(
        &'conn self,
        query: impl FnOnce(&'conn SqlitePool) -> Fut,
        invalidation: impl FnOnce(&V) -> InvalidationSet,
    ) -> Result<V, Error>
    where
        Fut: Future<Output = Result<V, sqlx::Error>>,
    {
        let mutation = Mutation::begin();
        let value = query(&self.pool).await?;
        let mutation = mutation.commit();

        let set = invalidation(&value);
        self.invalidate_committed(mutation, set).await;
        Ok(value)
    }

    async fn invalidate_committed(&self, mutation: Mutation<Committed>, set: InvalidationSet) {
        let committed_at = Instant::now();

        if set.is_empty() {
            mutation.invalidated();
            return;
        }

        for resource in set.resources() {
            self.fences.advance(resource);
        }

        let cache = Arc::clone(&self.cache);
        let retrier = self.retrier.clone();
        let timeout = self.policy.backend_timeout;

        // spawned so that a request dropped after its commit still invalidates
        let task = tokio::spawn(async move {
            match invalidation::apply(&*cache, &set, timeout).await {
                Ok(()) => {
                    let mutation = mutation.invalidated();
                    tracing::debug!(mutation = mutation.id(), keys = %set, "cache invalidated");
                }
                Err(failed) => retrier.enqueue(mutation, failed, committed_at),
            }
        });

        if let Err(err) = task.await {
            tracing::error!("invalidation task failed :: {}", err);
        }
    }

    async fn populate<V: Serialize>(&self, key: &CacheKey, value: &V, epoch: u64) {
        let resource = key.resource();
        if self.fences.epoch(resource) != epoch {
            tracing::debug!("{} changed during fetch, not caching", resource);
            return;
        }

        let bytes = match serde_json::to_vec(value) {
            Ok(bytes) => bytes,
            Err(err) => {
                tracing::warn!("unable to serialize value, not caching :: {}", err);
                return;
            }
        };

        let ttl = self.policy.ttl(key.kind());
        if let Err(err) = bounded(
            self.policy.backend_timeout,
            self.cache.set(key.as_str(), bytes, ttl),
        )
        .await
        {
            tracing::warn!("unable to populate cache :: {}", err);
            return;
        }

        // a writer may have invalidated between the check above and the set
        if self.fences.epoch(resource) != epoch {
            tracing::debug!("{} changed while caching, evicting", resource);
            self.evict(key).await;
            return;
        }

        tracing::debug!(?ttl, "populated");
    }

    async fn evict(&self, key: &CacheKey) {
        if let Err(err) = bounded(self.policy.backend_timeout, self.cache.delete(key.as_str())).await
        {
            tracing::warn!("unable to evict {} :: {}", key, err);
        }
    }
}

impl Clone for DataAccess {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            cache: Arc::clone(&self.cache),
            policy: self.policy.clone(),
            fences: Arc::clone(&self.fences),
            retrier: self.retrier.clone(),
        }
    }
}
