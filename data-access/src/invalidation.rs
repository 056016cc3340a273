use std::{
    collections::BTreeSet,
    fmt::{self, Display},
    future::Future,
    time::Duration,
};

use cache::{CacheBackend, CacheError, CacheKey, KeyKind, Resource};

use crate::CachePolicy;

/// Cache keys affected by one mutation.
///
/// Detail keys are removed one by one. List results are removed by namespace,
/// since it is not known which filters would have matched the entity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvalidationSet {
    keys: BTreeSet<CacheKey>,
    lists: BTreeSet<Resource>,
}

/// Invalidation did not fully complete. `residual` holds what is left to remove.
#[derive(thiserror::Error, Debug)]
#[error("invalidation failed for {residual} :: {cause}")]
pub struct InvalidationFailed {
    pub residual: InvalidationSet,
    pub cause: CacheError,
}

impl InvalidationSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// The entity's detail key plus every list of its resource.
    pub fn entity(resource: Resource, id: impl Display) -> Self {
        Self::new().with_detail(resource, id).with_lists(resource)
    }

    pub fn with_detail(mut self, resource: Resource, id: impl Display) -> Self {
        self.keys.insert(resource.detail(id));
        self
    }

    pub fn with_lists(mut self, resource: Resource) -> Self {
        self.lists.insert(resource);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty() && self.lists.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &CacheKey> {
        self.keys.iter()
    }

    pub fn lists(&self) -> impl Iterator<Item = Resource> + '_ {
        self.lists.iter().copied()
    }

    /// Every resource with at least one affected key or list.
    pub fn resources(&self) -> BTreeSet<Resource> {
        self.keys
            .iter()
            .map(CacheKey::resource)
            .chain(self.lists.iter().copied())
            .collect()
    }

    /// Longest TTL among the affected entries. Once this much time has passed
    /// since the commit, anything stale has expired on its own.
    pub fn horizon(&self, policy: &CachePolicy) -> Duration {
        let detail = match self.keys.is_empty() {
            true => Duration::ZERO,
            false => policy.detail_ttl,
        };
        let list = match self.lists.is_empty() {
            true => Duration::ZERO,
            false => policy.list_ttl,
        };
        detail.max(list)
    }
}

impl Display for InvalidationSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries = self
            .keys
            .iter()
            .map(ToString::to_string)
            .chain(
                self.lists
                    .iter()
                    .map(|resource| format!("{}*", resource.namespace(KeyKind::List))),
            )
            .collect::<Vec<String>>();

        write!(f, "[{}]", entries.join(", "))
    }
}

/// Runs a backend call, turning a slow backend into [`CacheError::Timeout`].
pub(crate) async fn bounded<T>(
    limit: Duration,
    call: impl Future<Output = Result<T, CacheError>>,
) -> Result<T, CacheError> {
    tokio::time::timeout(limit, call)
        .await
        .unwrap_or_else(|_| Err(CacheError::Timeout(limit)))
}

/// Removes every entry of `set`. Each removal is attempted even if an earlier
/// one failed; the failed ones come back as the residual set.
pub(crate) async fn apply(
    cache: &dyn CacheBackend,
    set: &InvalidationSet,
    timeout: Duration,
) -> Result<(), InvalidationFailed> {
    let mut residual = InvalidationSet::new();
    let mut cause = None;

    for key in &set.keys {
        if let Err(err) = bounded(timeout, cache.delete(key.as_str())).await {
            residual.keys.insert(key.clone());
            cause.get_or_insert(err);
        }
    }

    for resource in &set.lists {
        let namespace = resource.namespace(KeyKind::List);
        match bounded(timeout, cache.delete_prefix(&namespace)).await {
            Ok(removed) => tracing::debug!(%namespace, removed, "list namespace cleared"),
            Err(err) => {
                residual.lists.insert(*resource);
                cause.get_or_insert(err);
            }
        }
    }

    match cause {
        None => Ok(()),
        Some(cause) => Err(InvalidationFailed { residual, cause }),
    }
}
