//! Test doubles for code that sits in front of a [`CacheBackend`].

use std::{
    sync::atomic::{AtomicBool, AtomicUsize, Ordering},
    time::Duration,
};

use async_trait::async_trait;

use crate::{CacheBackend, CacheError, MemoryCache};

/// A [`MemoryCache`] whose operations can be switched to fail or to never
/// answer, simulating an unreachable or stalled backend.
#[derive(Default)]
pub struct FaultyCache {
    inner: MemoryCache,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    fail_deletes: AtomicBool,
    hang: AtomicBool,
    sets: AtomicUsize,
}

impl FaultyCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inner(&self) -> &MemoryCache {
        &self.inner
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_all(&self, fail: bool) {
        self.fail_reads(fail);
        self.fail_writes(fail);
        self.fail_deletes(fail);
    }

    /// While set, every operation pends forever.
    pub fn hang(&self, hang: bool) {
        self.hang.store(hang, Ordering::SeqCst);
    }

    /// Number of successful `set` calls so far.
    pub fn sets(&self) -> usize {
        self.sets.load(Ordering::SeqCst)
    }

    async fn stall(&self) {
        if self.hang.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
    }

    fn check(flag: &AtomicBool) -> Result<(), CacheError> {
        match flag.load(Ordering::SeqCst) {
            true => Err(CacheError::Unavailable("simulated outage".to_string())),
            false => Ok(()),
        }
    }
}

#[async_trait]
impl CacheBackend for FaultyCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        self.stall().await;
        Self::check(&self.fail_reads)?;
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
        self.stall().await;
        Self::check(&self.fail_writes)?;
        self.inner.set(key, value, ttl).await?;
        self.sets.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.stall().await;
        Self::check(&self.fail_deletes)?;
        self.inner.delete(key).await
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<u64, CacheError> {
        self.stall().await;
        Self::check(&self.fail_deletes)?;
        self.inner.delete_prefix(prefix).await
    }
}
