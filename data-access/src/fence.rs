use cache::Resource;
use dashmap::DashMap;

/// Per-resource mutation epochs.
///
/// Writers advance the epoch of every resource they touched once their commit is
/// durable. A reader that saw a different epoch before its fetch must not leave
/// its snapshot in the cache.
#[derive(Default)]
pub(crate) struct Fences {
    epochs: DashMap<Resource, u64>,
}

impl Fences {
    pub(crate) fn epoch(&self, resource: Resource) -> u64 {
        self.epochs.get(&resource).map_or(0, |epoch| *epoch)
    }

    pub(crate) fn advance(&self, resource: Resource) {
        *self.epochs.entry(resource).or_insert(0) += 1;
    }
}
