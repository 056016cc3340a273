use std::time::Duration;

use cache::KeyKind;

/// Time-to-live and failure handling knobs of the cache layer.
#[derive(Debug, Clone)]
pub struct CachePolicy {
    /// TTL of single-entity snapshots.
    pub detail_ttl: Duration,
    /// TTL of list/filter result sets. Shorter than `detail_ttl` since lists are
    /// invalidated broadly.
    pub list_ttl: Duration,
    /// Upper bound on any single cache backend call.
    pub backend_timeout: Duration,
    /// First delay before re-attempting a failed invalidation.
    pub retry_backoff: Duration,
    pub retry_backoff_max: Duration,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            detail_ttl: Duration::from_secs(300),
            list_ttl: Duration::from_secs(60),
            backend_timeout: Duration::from_millis(250),
            retry_backoff: Duration::from_millis(100),
            retry_backoff_max: Duration::from_secs(5),
        }
    }
}

impl CachePolicy {
    pub fn ttl(&self, kind: KeyKind) -> Duration {
        match kind {
            KeyKind::Detail => self.detail_ttl,
            KeyKind::List => self.list_ttl,
        }
    }

    pub fn with_detail_ttl(mut self, ttl: Duration) -> Self {
        self.detail_ttl = ttl;
        self
    }

    pub fn with_list_ttl(mut self, ttl: Duration) -> Self {
        self.list_ttl = ttl;
        self
    }

    pub fn with_backend_timeout(mut self, timeout: Duration) -> Self {
        self.backend_timeout = timeout;
        self
    }

    pub fn with_retry_backoff(mut self, initial: Duration, max: Duration) -> Self {
        self.retry_backoff = initial;
        self.retry_backoff_max = max.max(initial);
        self
    }
}
