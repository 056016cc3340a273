use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use cache::CacheBackend;
use tokio::time::Instant;

use crate::{
    CachePolicy, InvalidationFailed, InvalidationSet,
    consistency::{Committed, Mutation},
    invalidation,
};

/// Re-attempts invalidations that failed after their mutation committed.
///
/// Each residual set gets its own task with exponential backoff. A task gives up
/// once the longest TTL of its keys has elapsed since the commit, because by
/// then every stale entry has expired.
#[derive(Clone)]
pub(crate) struct Retrier {
    cache: Arc<dyn CacheBackend>,
    policy: CachePolicy,
    pending: Arc<AtomicUsize>,
}

impl Retrier {
    pub(crate) fn new(cache: Arc<dyn CacheBackend>, policy: CachePolicy) -> Self {
        Self {
            cache,
            policy,
            pending: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub(crate) fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    pub(crate) fn enqueue(
        &self,
        mutation: Mutation<Committed>,
        failed: InvalidationFailed,
        committed_at: Instant,
    ) {
        let InvalidationFailed { residual, cause } = failed;
        // an unrepresentable horizon means nothing could have been cached with it
        let deadline = committed_at
            .checked_add(residual.horizon(&self.policy))
            .unwrap_or(committed_at);

        tracing::warn!(
            mutation = mutation.id(),
            keys = %residual,
            "invalidation failed after commit, retrying in background :: {}",
            cause
        );

        self.pending.fetch_add(1, Ordering::SeqCst);
        let retrier = self.clone();
        tokio::spawn(async move {
            retrier.run(mutation, residual, deadline).await;
            retrier.pending.fetch_sub(1, Ordering::SeqCst);
        });
    }

    async fn run(
        &self,
        mutation: Mutation<Committed>,
        mut residual: InvalidationSet,
        deadline: Instant,
    ) {
        let mut backoff = self.policy.retry_backoff.max(Duration::from_millis(1));
        let mut attempt = 0u32;

        loop {
            let now = Instant::now();
            if now >= deadline {
                tracing::error!(
                    mutation = mutation.id(),
                    keys = %residual,
                    attempts = attempt,
                    "giving up on invalidation, remaining entries expire by ttl"
                );
                return;
            }

            tokio::time::sleep(backoff.min(deadline - now)).await;
            attempt += 1;

            match invalidation::apply(&*self.cache, &residual, self.policy.backend_timeout).await {
                Ok(()) => {
                    let mutation = mutation.invalidated();
                    tracing::info!(
                        mutation = mutation.id(),
                        attempts = attempt,
                        "invalidation retry succeeded"
                    );
                    return;
                }
                Err(failed) => {
                    tracing::debug!(
                        mutation = mutation.id(),
                        attempt,
                        keys = %failed.residual,
                        "invalidation retry failed :: {}",
                        failed.cause
                    );
                    residual = failed.residual;
                    backoff = backoff.saturating_mul(2).min(self.policy.retry_backoff_max);
                }
            }
        }
    }
}
